//! Dashboard client for a router-based parental control controller.
//!
//! The controller owns device configs and usage counters; this crate holds
//! the schedule/usage data model, the pure quota decision engine, and the
//! authenticated API contract a dashboard uses to read and mutate that
//! state. Mutations always round-trip through the controller.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod state;
pub mod usage;
