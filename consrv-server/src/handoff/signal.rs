//! Relay of host signals from a delegated console
//!
//! The alternate console owns the session after a handoff but some
//! operations still have to be carried out by this process. It writes them
//! as packets on the signal channel; this thread reads and performs them.

use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::BytesMut;
use consrv_protocol::{HostSignal, HostSignalCodec};
use consrv_utils::{ConsoleError, Result};
use tokio_util::codec::Decoder;
use tracing::{debug, info, warn};

use crate::console::InputEvent;
use crate::host::ConsoleControl;

const THREAD_NAME: &str = "host-signal-input";
const READ_CHUNK: usize = 512;

/// Background reader of the retained end of the signal channel
pub struct HostSignalInputThread {
    handle: JoinHandle<()>,
}

impl HostSignalInputThread {
    /// Start relaying packets from `reader` to `control`
    ///
    /// `input_event`, when present, is raised after every relayed packet.
    pub fn start<R>(
        reader: R,
        control: Arc<dyn ConsoleControl>,
        input_event: Option<InputEvent>,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(reader, control.as_ref(), input_event.as_ref()))
            .map_err(|e| ConsoleError::internal(format!("failed to spawn {THREAD_NAME}: {e}")))?;

        Ok(Self { handle })
    }

    /// False once the channel has closed
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Wait for the channel to close
    #[cfg(test)]
    fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| ConsoleError::internal(format!("{THREAD_NAME} panicked")))
    }
}

fn run<R: Read>(mut reader: R, control: &dyn ConsoleControl, input_event: Option<&InputEvent>) {
    let mut codec = HostSignalCodec::new();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => {
                info!("Host signal channel closed");
                return;
            }
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "Host signal channel read failed");
                return;
            }
        };
        buf.extend_from_slice(&chunk[..read]);

        loop {
            match codec.decode(&mut buf) {
                Ok(Some(signal)) => {
                    relay(signal, control);
                    if let Some(event) = input_event {
                        event.set();
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Malformed host signal, stopping relay");
                    return;
                }
            }
        }
    }
}

fn relay(signal: HostSignal, control: &dyn ConsoleControl) {
    debug!(?signal, "Relaying host signal");
    let result = match signal {
        HostSignal::NotifyApp { process_id } => control.notify_console_application(process_id),
        HostSignal::SetForeground {
            process_id,
            foreground,
        } => control.set_foreground(process_id, foreground),
        HostSignal::EndTask {
            process_id,
            event_type,
            ctrl_flags,
        } => control.end_task(process_id, event_type, ctrl_flags),
    };

    if let Err(e) = result {
        warn!(?signal, error = %e, "Host signal could not be carried out");
    }
}
