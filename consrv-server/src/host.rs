//! Collaborators the gateway is embedded in
//!
//! The transport, the console control channel, accessibility and session
//! lifecycle are all provided by the surrounding host. Each is a trait so
//! the gateway can be driven without a real device.

use std::os::fd::OwnedFd;
use std::sync::Arc;

use consrv_protocol::{ApiMessage, ConnectInfo, HandleId, IoCompletion, ProcessKey, StartupFlags};
use consrv_utils::{ConsoleError, Result};
use tracing::{debug, info};

use crate::console::{
    ConsoleState, HandleObject, InputBuffer, ScreenBuffer, DEFAULT_FILL_ATTRIBUTE,
    DEFAULT_SCREEN_BUFFER_SIZE,
};
use crate::handlers::HandlerResult;

/// The transport channel requests arrive on
pub trait DeviceComm: Send + Sync {
    /// Complete a pended message
    fn complete_io(&self, completion: IoCompletion) -> Result<()>;

    /// Move a handle into the transport's handle table
    ///
    /// On failure the handle is given back so the caller can release it.
    fn adopt_handle(
        &self,
        handle: HandleObject,
    ) -> std::result::Result<HandleId, (ConsoleError, HandleObject)>;

    /// Remove a handle from the transport's handle table
    fn take_handle(&self, id: HandleId) -> Option<HandleObject>;

    /// A duplicate of the server end of the transport
    fn server_handle(&self) -> Result<OwnedFd>;
}

/// Window-manager side notifications about console clients
pub trait ConsoleControl: Send + Sync {
    fn notify_console_application(&self, process_id: u32) -> Result<()>;

    fn set_foreground(&self, process_id: u32, foreground: bool) -> Result<()>;

    fn end_task(&self, process_id: u32, event_type: u32, ctrl_flags: u32) -> Result<()>;
}

/// Observer of application start and end, for assistive technology
pub trait AccessibilityNotifier: Send + Sync {
    fn notify_start_application(&self, process_id: u32);

    fn notify_end_application(&self, process_id: u32);
}

/// Session allocation and per-process removal
pub trait ConsoleLifecycle: Send + Sync {
    /// Create the session's buffers on first attach
    fn allocate(&self, state: &mut ConsoleState, info: &ConnectInfo) -> Result<()>;

    /// Tear down everything owned by a detaching process
    fn remove(&self, state: &mut ConsoleState, process: ProcessKey) -> Result<()>;
}

/// Routes API traffic from already connected clients
pub trait ApiRouter: Send + Sync {
    fn dispatch(&self, state: &mut ConsoleState, message: &ApiMessage) -> HandlerResult;
}

/// Lifecycle that builds one input buffer and one screen buffer
#[derive(Debug, Default)]
pub struct DefaultLifecycle;

impl ConsoleLifecycle for DefaultLifecycle {
    fn allocate(&self, state: &mut ConsoleState, info: &ConnectInfo) -> Result<()> {
        let startup = &info.startup;

        let size = if startup.flags.contains(StartupFlags::USE_SIZE)
            && startup.screen_buffer_size.0 > 0
            && startup.screen_buffer_size.1 > 0
        {
            startup.screen_buffer_size
        } else {
            DEFAULT_SCREEN_BUFFER_SIZE
        };
        let fill = if startup.flags.contains(StartupFlags::USE_FILL_ATTRIBUTE) {
            startup.fill_attribute
        } else {
            DEFAULT_FILL_ATTRIBUTE
        };

        debug!(
            pid = info.process_id,
            columns = size.0,
            rows = size.1,
            "Allocating console buffers"
        );
        state.install_buffers(
            Arc::new(InputBuffer::new()),
            Arc::new(ScreenBuffer::new(size, fill)),
        );
        Ok(())
    }

    fn remove(&self, state: &mut ConsoleState, process: ProcessKey) -> Result<()> {
        state.free_process(process);
        if state.processes.is_empty() {
            info!("Last client detached from console");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consrv_protocol::StartupInfo;

    fn info(startup: StartupInfo) -> ConnectInfo {
        ConnectInfo {
            process_id: 1,
            thread_id: 2,
            process_group_id: 0,
            console_app: true,
            window_visible: true,
            startup,
            title: String::new(),
            app_name: "sh".into(),
            current_directory: "/".into(),
        }
    }

    #[test]
    fn test_allocate_uses_defaults() {
        let mut state = ConsoleState::new(4, false);
        DefaultLifecycle
            .allocate(&mut state, &info(StartupInfo::default()))
            .unwrap();

        let screen = state.active_output_buffer().unwrap();
        assert_eq!(screen.size(), DEFAULT_SCREEN_BUFFER_SIZE);
        assert!(state.input_buffer().is_ok());
    }

    #[test]
    fn test_allocate_honours_startup_geometry() {
        let startup = StartupInfo {
            flags: StartupFlags::USE_SIZE | StartupFlags::USE_FILL_ATTRIBUTE,
            fill_attribute: 0x1E,
            screen_buffer_size: (80, 300),
            ..Default::default()
        };
        let mut state = ConsoleState::new(4, false);
        DefaultLifecycle.allocate(&mut state, &info(startup)).unwrap();

        let screen = state.active_output_buffer().unwrap();
        assert_eq!(screen.size(), (80, 300));
        assert_eq!(screen.fill_attribute(), 0x1E);
    }

    #[test]
    fn test_allocate_ignores_empty_size() {
        let startup = StartupInfo {
            flags: StartupFlags::USE_SIZE,
            screen_buffer_size: (0, 25),
            ..Default::default()
        };
        let mut state = ConsoleState::new(4, false);
        DefaultLifecycle.allocate(&mut state, &info(startup)).unwrap();
        assert_eq!(
            state.active_output_buffer().unwrap().size(),
            DEFAULT_SCREEN_BUFFER_SIZE
        );
    }

    #[test]
    fn test_remove_frees_process() {
        let mut state = ConsoleState::new(4, false);
        let key = state.processes.alloc(7, 7, 0).unwrap();
        DefaultLifecycle.remove(&mut state, key).unwrap();
        assert!(state.processes.is_empty());

        // Removing again is harmless
        DefaultLifecycle.remove(&mut state, key).unwrap();
    }
}
