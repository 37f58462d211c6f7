use std::sync::{Arc, RwLock};

/// Bearer-token session shared between the client and its callers.
///
/// The token is replaced atomically on login/logout; there is no other
/// shared mutable state in the client. A 401 from any endpoint clears it,
/// after which callers must re-authenticate; the failed call is never
/// retried on their behalf.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session pre-seeded with a token, e.g. restored from disk.
    pub fn with_token(token: String) -> Self {
        let session = Self::new();
        session.store(token);
        session
    }

    pub fn store(&self, token: String) {
        *self.token.write().expect("session lock poisoned") = Some(token);
    }

    pub fn clear(&self) {
        *self.token.write().expect("session lock poisoned") = None;
    }

    pub fn bearer(&self) -> Option<String> {
        self.token.read().expect("session lock poisoned").clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().expect("session lock poisoned").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_lifecycle() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert_eq!(session.bearer(), None);

        session.store("tok-1".into());
        assert!(session.is_authenticated());
        assert_eq!(session.bearer().as_deref(), Some("tok-1"));

        session.store("tok-2".into());
        assert_eq!(session.bearer().as_deref(), Some("tok-2"));

        session.clear();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn clones_share_the_same_token() {
        let session = Session::new();
        let other = session.clone();

        session.store("shared".into());
        assert_eq!(other.bearer().as_deref(), Some("shared"));

        other.clear();
        assert!(!session.is_authenticated());
    }
}
