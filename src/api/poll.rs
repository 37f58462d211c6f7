use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stale-response suppression for interval polling.
///
/// Each poll takes a ticket; starting a new poll (or navigating away via
/// [`PollGate::invalidate`]) advances the generation, and a response carried
/// by an outdated ticket is discarded instead of being applied after the
/// fact. A write racing a poll is tolerated — the next poll simply observes
/// the newer snapshot.
#[derive(Debug, Clone, Default)]
pub struct PollGate {
    generation: Arc<AtomicU64>,
}

impl PollGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new poll, superseding any in-flight one.
    pub fn begin(&self) -> PollTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        PollTicket {
            generation,
            gate: self.clone(),
        }
    }

    /// Invalidate all outstanding tickets without starting a poll.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Handle for one poll; results are only applied while the ticket is current.
#[derive(Debug)]
pub struct PollTicket {
    generation: u64,
    gate: PollGate,
}

impl PollTicket {
    pub fn is_current(&self) -> bool {
        self.generation == self.gate.current()
    }

    /// Pass the result through if the ticket is still current, or drop it.
    pub fn accept<T>(&self, result: T) -> Option<T> {
        if self.is_current() { Some(result) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_ticket_passes_results_through() {
        let gate = PollGate::new();
        let ticket = gate.begin();
        assert!(ticket.is_current());
        assert_eq!(ticket.accept(42), Some(42));
    }

    #[test]
    fn newer_poll_supersedes_older_ticket() {
        let gate = PollGate::new();
        let stale = gate.begin();
        let fresh = gate.begin();

        assert!(!stale.is_current());
        assert_eq!(stale.accept("old snapshot"), None);
        assert_eq!(fresh.accept("new snapshot"), Some("new snapshot"));
    }

    #[test]
    fn invalidate_discards_in_flight_polls() {
        let gate = PollGate::new();
        let ticket = gate.begin();
        gate.invalidate();
        assert_eq!(ticket.accept(()), None);
    }

    #[test]
    fn gate_clones_share_generations() {
        let gate = PollGate::new();
        let ticket = gate.begin();
        gate.clone().begin();
        assert!(!ticket.is_current());
    }
}
