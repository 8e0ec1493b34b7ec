//! Metrics collection for the console server
//!
//! Simple internal counters for attach/detach traffic, handoff attempts
//! and handle churn.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Client API calls counted on entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCall {
    AttachConsole,
    FreeConsole,
}

/// Global metrics collector
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total connect requests received
    pub attach_console_total: AtomicU64,
    /// Total disconnect requests received
    pub free_console_total: AtomicU64,

    /// Connections the handoff gate let through
    pub handoff_attempted_total: AtomicU64,
    /// Handoffs that delegated the session
    pub handoff_succeeded_total: AtomicU64,
    /// Handoffs that fell back to local hosting
    pub handoff_failed_total: AtomicU64,

    /// Handles created through the create dispatcher
    pub objects_created_total: AtomicU64,
    /// Handles closed through the close dispatcher
    pub objects_closed_total: AtomicU64,
}

impl Metrics {
    /// Get the global metrics instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<Metrics> = OnceLock::new();
        INSTANCE.get_or_init(Self::default)
    }

    /// Record a client API call
    pub fn record_api_call(&self, call: ApiCall) {
        let counter = match call {
            ApiCall::AttachConsole => &self.attach_console_total,
            ApiCall::FreeConsole => &self.free_console_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handoff_attempt(&self) {
        self.handoff_attempted_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of an attempted handoff
    pub fn record_handoff_result(&self, succeeded: bool) {
        if succeeded {
            self.handoff_succeeded_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.handoff_failed_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_object_created(&self) {
        self.objects_created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_object_closed(&self) {
        self.objects_closed_total.fetch_add(1, Ordering::Relaxed);
    }
}
