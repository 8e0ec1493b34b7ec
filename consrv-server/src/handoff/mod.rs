//! Delegation of new sessions to an alternate console
//!
//! The gate decides whether a connection qualifies; the transaction carries
//! out one attempt and either never returns control to local hosting or
//! unwinds completely.

mod gate;
mod platform;
mod signal;
mod transaction;

pub use gate::{deserves_visible_window, Disqualified, HandoffGate};
pub use platform::{HostPlatform, UnixPlatform};
pub use signal::HostSignalInputThread;
pub use transaction::{
    ActivationContext, ClientProcess, HandoffActivator, HandoffHandler, HandoffOutcome,
    HandoffState, HandoffTransaction,
};
