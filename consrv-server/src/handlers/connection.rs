//! Connection-related message handlers
//!
//! Handles: Connect, Disconnect

use std::ops::{Deref, DerefMut};

use consrv_protocol::{
    Access, ApiMessage, ConnectInfo, Descriptor, ProcessKey, ShareMode, StatusCode,
    CONNECTION_INFORMATION_SIZE,
};
use consrv_utils::{ConsoleError, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ConsoleServer, HandlerResult};
use crate::console::{allocate_io_handle, ConsoleGuard, ConsoleState, HandleType, ProcessRecord};
use crate::handoff::{ActivationContext, HandoffActivator, HandoffOutcome, HandoffTransaction};
use crate::observability::{trace, ApiCall, Metrics};

/// Holds the console lock while a client attaches
///
/// Unless committed, dropping the guard frees the process record and
/// command history allocated so far, before the lock is released.
struct AttachGuard<'a> {
    console: ConsoleGuard<'a>,
    process: Option<ProcessKey>,
}

impl<'a> AttachGuard<'a> {
    fn new(console: ConsoleGuard<'a>) -> Self {
        Self {
            console,
            process: None,
        }
    }

    fn track(&mut self, key: ProcessKey) {
        self.process = Some(key);
    }

    /// The client received its handles; keep the process attached
    fn commit(&mut self) {
        self.process = None;
    }
}

impl Deref for AttachGuard<'_> {
    type Target = ConsoleState;

    fn deref(&self) -> &ConsoleState {
        &self.console
    }
}

impl DerefMut for AttachGuard<'_> {
    fn deref_mut(&mut self) -> &mut ConsoleState {
        &mut self.console
    }
}

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.process.take() {
            if self.console.free_process(key) {
                debug!(process = %key, "Released partially attached process");
            }
        }
    }
}

/// Stand-in used when no alternate console can be activated
struct NoActivator;

impl HandoffActivator for NoActivator {
    fn initialize(&self) -> Result<Box<dyn ActivationContext>> {
        Err(ConsoleError::handoff("no handoff activator is installed"))
    }
}

impl ConsoleServer {
    /// Handle Connect - attach a client process to the console
    ///
    /// Replies inline on failure. On success the reply goes out through the
    /// transport's completion call and [`HandlerResult::Pending`] is returned.
    pub fn handle_connect(&self, message: &ApiMessage, input: &[u8]) -> HandlerResult {
        Metrics::global().record_api_call(ApiCall::AttachConsole);

        let info = match ConnectInfo::decode(&message.descriptor, input) {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Malformed connect request");
                return Self::error(message, &ConsoleError::from(e));
            }
        };

        info!(
            pid = info.process_id,
            tid = info.thread_id,
            app = %info.app_name,
            console_app = info.console_app,
            "Client connecting"
        );

        let mut console = self.console.lock();
        match self.gate.evaluate(console.is_initialized(), &info) {
            Ok(target) => {
                console = match self.try_handoff(console, &message.descriptor, target) {
                    HandoffOutcome::Terminated => return HandlerResult::Terminated,
                    HandoffOutcome::Aborted(console) => console,
                };
            }
            Err(reason) => debug!(pid = info.process_id, ?reason, "Handoff not attempted"),
        }

        let mut attach = AttachGuard::new(console);
        match self.attach(&mut attach, message, &info) {
            Ok(()) => HandlerResult::Pending,
            Err(e) => {
                warn!(pid = info.process_id, error = %e, "Connect failed");
                Self::error(message, &e)
            }
        }
    }

    fn try_handoff<'g>(
        &self,
        console: ConsoleGuard<'g>,
        descriptor: &Descriptor,
        target: Uuid,
    ) -> HandoffOutcome<'g> {
        let activator: &dyn HandoffActivator = match &self.activator {
            Some(activator) => activator.as_ref(),
            None => &NoActivator,
        };

        HandoffTransaction::new(
            activator,
            self.platform.as_ref(),
            self.comm.as_ref(),
            self.control.clone(),
            target,
        )
        .run(console, descriptor)
    }

    /// Local attach; every early return leaves cleanup to the guard
    ///
    /// Errors are failures before the transport took over the message. Once
    /// the completion has been handed to the transport nothing is replied
    /// inline, even if the hand-over itself failed.
    fn attach(
        &self,
        attach: &mut AttachGuard<'_>,
        message: &ApiMessage,
        info: &ConnectInfo,
    ) -> Result<()> {
        let pid = info.process_id;

        let key = attach
            .processes
            .alloc(pid, info.thread_id, info.process_group_id)?;
        attach.track(key);

        let root = !attach.is_initialized();
        if let Some(record) = attach.processes.get_mut(key) {
            record.set_root(root);
        }

        if info.console_app {
            if let Err(e) = self.control.notify_console_application(pid) {
                warn!(pid, error = %e, "Console application notification failed");
            }
        }

        if let Some(accessibility) = &self.accessibility {
            accessibility.notify_start_application(pid);
        }

        if !attach.is_initialized() {
            self.lifecycle.allocate(&mut **attach, info)?;
            attach.mark_initialized();
            info!(pid, "Console session initialized");
        }

        if let Err(e) = attach.histories.allocate(&info.app_name, key) {
            warn!(pid, app = %info.app_name, error = %e, "No command history for process");
        }

        let grant = attach.is_in_vt_io_mode() || attach.has_focus();
        for focus_pid in attach.processes.modify_console_process_focus(grant) {
            if let Err(e) = self.control.set_foreground(focus_pid, grant) {
                debug!(pid = focus_pid, error = %e, "Foreground change failed");
            }
        }

        let input = allocate_io_handle(
            attach.input_buffer()?,
            HandleType::Input,
            Access::read_write(),
            ShareMode::all(),
        )?;
        let output = allocate_io_handle(
            attach.active_output_buffer()?,
            HandleType::Output,
            Access::read_write(),
            ShareMode::all(),
        )?;

        let record = attach
            .processes
            .get_mut(key)
            .ok_or_else(|| ConsoleError::internal(format!("{key} vanished during attach")))?;
        record.set_input_handle(input);
        record.set_output_handle(output);
        let connection = record.connection_information();

        let mut completion =
            message.completion(StatusCode::Success, CONNECTION_INFORMATION_SIZE as u64);
        completion.write = Some(connection.encode());
        if let Err(e) = self.comm.complete_io(completion) {
            // The uncommitted guard frees the process on return
            warn!(pid, process = %key, error = %e, "Connect completion failed");
            trace::console_attach_failed(pid, e.status());
            return Ok(());
        }
        attach.commit();

        debug!(
            pid,
            process = %key,
            input = %connection.input,
            output = %connection.output,
            root,
            "Client attached"
        );
        trace::console_attach(pid, key, root);
        Ok(())
    }

    /// Handle Disconnect - detach a client process from the console
    pub fn handle_disconnect(&self, message: &ApiMessage, process: ProcessKey) -> HandlerResult {
        Metrics::global().record_api_call(ApiCall::FreeConsole);

        let mut console = self.console.lock();
        match console.processes.get(process).map(ProcessRecord::process_id) {
            Some(pid) => {
                if let Some(accessibility) = &self.accessibility {
                    accessibility.notify_end_application(pid);
                }
                trace::console_detach(pid);

                if let Err(e) = self.lifecycle.remove(&mut console, process) {
                    warn!(pid, error = %e, "Console removal failed");
                }
                info!(pid, "Client detached");
            }
            None => debug!(process = %process, "Disconnect for unknown process"),
        }

        HandlerResult::Reply(message.reply(StatusCode::Success, 0))
    }
}
