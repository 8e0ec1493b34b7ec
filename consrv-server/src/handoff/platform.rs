//! Operating system services used by the handoff

use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;

use consrv_utils::Result;
#[cfg(not(target_os = "linux"))]
use consrv_utils::ConsoleError;
use tracing::debug;

/// Process-level primitives the handoff needs from the host OS
pub trait HostPlatform: Send + Sync {
    /// False for service sessions and sessions without a display surface
    fn is_interactive_session(&self) -> bool;

    /// A handle to this process that a peer can wait on
    fn duplicate_current_process(&self) -> Result<OwnedFd>;

    /// A private bidirectional channel: (our end, their end)
    fn create_signal_channel(&self) -> Result<(UnixStream, UnixStream)>;

    /// Terminate this process
    ///
    /// Real implementations never return.
    fn exit_process(&self, code: i32);
}

/// [`HostPlatform`] for Unix hosts
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixPlatform;

impl HostPlatform for UnixPlatform {
    fn is_interactive_session(&self) -> bool {
        let has_display = ["DISPLAY", "WAYLAND_DISPLAY"]
            .iter()
            .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()));

        // SAFETY: isatty only inspects the descriptor
        let stdin_is_tty = unsafe { libc::isatty(libc::STDIN_FILENO) } == 1;

        has_display || stdin_is_tty
    }

    #[cfg(target_os = "linux")]
    fn duplicate_current_process(&self) -> Result<OwnedFd> {
        use std::os::fd::FromRawFd;

        // SAFETY: pidfd_open has no memory arguments; the result is checked
        // before it is wrapped.
        let fd = unsafe { libc::syscall(libc::SYS_pidfd_open, libc::getpid(), 0) };
        if fd < 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        debug!(fd, "Opened pidfd for current process");
        // SAFETY: fd is a freshly opened descriptor we exclusively own
        Ok(unsafe { OwnedFd::from_raw_fd(fd as std::os::fd::RawFd) })
    }

    #[cfg(not(target_os = "linux"))]
    fn duplicate_current_process(&self) -> Result<OwnedFd> {
        Err(ConsoleError::handoff(
            "process handles are not available on this platform",
        ))
    }

    fn create_signal_channel(&self) -> Result<(UnixStream, UnixStream)> {
        let (ours, theirs) = UnixStream::pair()?;
        debug!("Created host signal channel");
        Ok((ours, theirs))
    }

    fn exit_process(&self, code: i32) {
        std::process::exit(code)
    }
}
