//! One-shot delegation of a new session to an alternate console

use std::os::fd::{AsFd, BorrowedFd};
use std::sync::Arc;

use consrv_protocol::{Descriptor, PortableAttachMessage};
use consrv_utils::{ConsoleError, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::platform::HostPlatform;
use super::signal::HostSignalInputThread;
use crate::console::{ConsoleGuard, ConsoleState, InputEvent};
use crate::host::{ConsoleControl, DeviceComm};
use crate::observability::{trace, Metrics};

/// The client process now running under the alternate console
pub trait ClientProcess: Send {
    /// Block until the process exits
    fn wait(&mut self) -> Result<()>;
}

/// An alternate console's entry point
pub trait HandoffHandler {
    /// Give the connection to the alternate console
    ///
    /// The handler duplicates whatever it keeps; every handle passed in is
    /// closed by the caller afterwards.
    fn establish_handoff(
        &self,
        server: BorrowedFd<'_>,
        input_event: &InputEvent,
        attach: &PortableAttachMessage,
        signal_pipe: BorrowedFd<'_>,
        owner_process: BorrowedFd<'_>,
    ) -> Result<Box<dyn ClientProcess>>;
}

/// Per-attempt activation scope; torn down when dropped
pub trait ActivationContext {
    /// Locate and start the handler registered under `target`
    fn create_handler(&self, target: Uuid) -> Result<Box<dyn HandoffHandler>>;
}

/// Source of activation contexts
pub trait HandoffActivator: Send + Sync {
    fn initialize(&self) -> Result<Box<dyn ActivationContext>>;
}

/// Progress of a handoff attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffState {
    Evaluating,
    Activating,
    Transferring,
    AwaitingExit,
    Terminated,
    Aborted,
}

/// What became of the connection
pub enum HandoffOutcome<'a> {
    /// The alternate console served the client until it exited
    Terminated,
    /// Nothing was delegated; the caller hosts the client with the lock
    Aborted(ConsoleGuard<'a>),
}

/// A single, non-retried handoff attempt
pub struct HandoffTransaction<'a> {
    activator: &'a dyn HandoffActivator,
    platform: &'a dyn HostPlatform,
    comm: &'a dyn DeviceComm,
    control: Arc<dyn ConsoleControl>,
    target: Uuid,
    state: HandoffState,
}

impl<'a> HandoffTransaction<'a> {
    pub fn new(
        activator: &'a dyn HandoffActivator,
        platform: &'a dyn HostPlatform,
        comm: &'a dyn DeviceComm,
        control: Arc<dyn ConsoleControl>,
        target: Uuid,
    ) -> Self {
        Self {
            activator,
            platform,
            comm,
            control,
            target,
            state: HandoffState::Evaluating,
        }
    }

    /// Attempt the handoff for the connect message described by `descriptor`
    ///
    /// On success the lock is released while waiting for the client to exit
    /// and the process then terminates. On failure every resource of the
    /// attempt is released and the lock is handed back.
    pub fn run<'g>(
        mut self,
        mut console: ConsoleGuard<'g>,
        descriptor: &Descriptor,
    ) -> HandoffOutcome<'g> {
        Metrics::global().record_handoff_attempt();
        self.transition(HandoffState::Activating);

        match self.attempt(&mut console, descriptor) {
            Ok((mut client, relay)) => {
                info!(handoff_target = %self.target, "Console handed off");
                trace::console_handoff_succeeded(self.target);
                Metrics::global().record_handoff_result(true);

                self.transition(HandoffState::AwaitingExit);
                drop(console);

                if let Err(e) = client.wait() {
                    warn!(error = %e, "Waiting for delegated client failed");
                }
                debug!(relay_running = relay.is_running(), "Delegated client exited");

                self.transition(HandoffState::Terminated);
                self.platform.exit_process(0);
                HandoffOutcome::Terminated
            }
            Err(e) => {
                warn!(
                    handoff_target = %self.target,
                    status = %e.status(),
                    error = %e,
                    "Handoff failed, hosting console locally"
                );
                trace::console_handoff_failed(Some(self.target), e.status());
                Metrics::global().record_handoff_result(false);

                self.transition(HandoffState::Aborted);
                HandoffOutcome::Aborted(console)
            }
        }
    }

    fn attempt(
        &mut self,
        console: &mut ConsoleState,
        descriptor: &Descriptor,
    ) -> Result<(Box<dyn ClientProcess>, HostSignalInputThread)> {
        let context = self.activator.initialize()?;
        let handler = context.create_handler(self.target)?;
        let attach = PortableAttachMessage::from(descriptor);

        self.transition(HandoffState::Transferring);
        let server = self.comm.server_handle()?;
        let owner = self.platform.duplicate_current_process()?;
        let (ours, theirs) = self.platform.create_signal_channel()?;
        let input_event = console
            .input_event()
            .cloned()
            .ok_or_else(|| ConsoleError::handoff("input event was already given away"))?;

        let client = handler.establish_handoff(
            server.as_fd(),
            &input_event,
            &attach,
            theirs.as_fd(),
            owner.as_fd(),
        )?;

        drop(server);
        drop(owner);
        drop(theirs);

        let relay = HostSignalInputThread::start(ours, self.control.clone(), Some(input_event))?;
        console.take_input_event();

        Ok((client, relay))
    }

    fn transition(&mut self, next: HandoffState) {
        debug!(from = ?self.state, to = ?next, "Handoff state");
        self.state = next;
    }
}
