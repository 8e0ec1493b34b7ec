//! Input-ready signal

use std::sync::Arc;

use parking_lot::Mutex;

/// Manual-reset event raised when input is available to readers
///
/// Clones share the same underlying event.
#[derive(Debug, Clone, Default)]
pub struct InputEvent {
    signaled: Arc<Mutex<bool>>,
}

impl InputEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        *self.signaled.lock() = true;
    }

    pub fn is_set(&self) -> bool {
        *self.signaled.lock()
    }
}
