//! Shared console session state
//!
//! One [`Console`] exists per server process. Every dispatcher entry point
//! takes its lock for the duration of the request.

mod buffer;
mod event;
mod history;
mod object;
mod process;

pub use buffer::{InputBuffer, ScreenBuffer, DEFAULT_FILL_ATTRIBUTE, DEFAULT_SCREEN_BUFFER_SIZE};
pub use event::InputEvent;
pub use history::{CommandHistory, CommandHistoryList};
pub use object::{
    allocate_io_handle, ConsoleObject, HandleObject, HandleType, ObjectHeader, ShareCounts,
};
pub use process::{ProcessList, ProcessRecord};

use std::sync::Arc;

use consrv_protocol::ProcessKey;
use consrv_utils::{ConsoleError, Result};
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

/// Exclusive access to the console state
pub type ConsoleGuard<'a> = MutexGuard<'a, ConsoleState>;

/// The session-wide lock around [`ConsoleState`]
#[derive(Debug)]
pub struct Console {
    state: Mutex<ConsoleState>,
}

impl Console {
    pub fn new(state: ConsoleState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn lock(&self) -> ConsoleGuard<'_> {
        self.state.lock()
    }
}

/// State shared by every client of one console
#[derive(Debug)]
pub struct ConsoleState {
    initialized: bool,
    has_focus: bool,
    vt_io_mode: bool,
    input_buffer: Option<Arc<InputBuffer>>,
    screen_buffers: Vec<Arc<ScreenBuffer>>,
    active_screen_buffer: Option<Arc<ScreenBuffer>>,
    input_event: Option<InputEvent>,
    pub processes: ProcessList,
    pub histories: CommandHistoryList,
}

impl ConsoleState {
    /// Create an uninitialized console
    ///
    /// `vt_io_mode` is set when the console runs behind a pty-style
    /// pass-through.
    pub fn new(history_limit: usize, vt_io_mode: bool) -> Self {
        Self {
            initialized: false,
            has_focus: false,
            vt_io_mode,
            input_buffer: None,
            screen_buffers: Vec::new(),
            active_screen_buffer: None,
            input_event: Some(InputEvent::new()),
            processes: ProcessList::new(),
            histories: CommandHistoryList::new(history_limit),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Record that the session finished its first attach; never reverts
    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn set_focus(&mut self, focus: bool) {
        self.has_focus = focus;
    }

    pub fn is_in_vt_io_mode(&self) -> bool {
        self.vt_io_mode
    }

    pub fn input_buffer(&self) -> Result<Arc<InputBuffer>> {
        self.input_buffer
            .clone()
            .ok_or_else(|| ConsoleError::not_found("console has no input buffer"))
    }

    /// The main buffer of the active output buffer
    pub fn active_output_buffer(&self) -> Result<Arc<ScreenBuffer>> {
        self.active_screen_buffer
            .clone()
            .ok_or_else(|| ConsoleError::not_found("console has no active output buffer"))
    }

    /// Install the buffers created by session allocation
    pub fn install_buffers(&mut self, input: Arc<InputBuffer>, screen: Arc<ScreenBuffer>) {
        self.input_buffer = Some(input);
        self.screen_buffers.push(screen.clone());
        self.active_screen_buffer = Some(screen);
    }

    pub fn add_screen_buffer(&mut self, screen: Arc<ScreenBuffer>) {
        self.screen_buffers.push(screen);
    }

    pub fn screen_buffers(&self) -> &[Arc<ScreenBuffer>] {
        &self.screen_buffers
    }

    /// Drop inactive screen buffers that no handle refers to any more
    pub fn prune_screen_buffers(&mut self) {
        let active = self.active_screen_buffer.clone();
        let before = self.screen_buffers.len();
        self.screen_buffers.retain(|buffer| {
            let is_active = active
                .as_ref()
                .map(|a| Arc::ptr_eq(a, buffer))
                .unwrap_or(false);
            is_active || buffer.header().open_count() > 0
        });

        let removed = before - self.screen_buffers.len();
        if removed > 0 {
            debug!(removed, "Removed unreferenced screen buffers");
        }
    }

    pub fn input_event(&self) -> Option<&InputEvent> {
        self.input_event.as_ref()
    }

    /// Give up this process' reference to the input-ready signal
    pub fn take_input_event(&mut self) -> Option<InputEvent> {
        self.input_event.take()
    }

    /// Undo process accounting for `key`
    ///
    /// Releases the command history and the process record. Safe to call
    /// more than once for the same key; returns whether a record was freed.
    pub fn free_process(&mut self, key: ProcessKey) -> bool {
        self.histories.free(key);
        self.processes.free(key).is_some()
    }
}
