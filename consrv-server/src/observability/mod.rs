//! Observability subsystem for the console server
//!
//! Provides metrics and the trace events emitted at attach, detach and
//! handoff time.

pub mod metrics;
pub mod trace;

pub use metrics::{ApiCall, Metrics};
