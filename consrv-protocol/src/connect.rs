//! Connect payload decoding and validation

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::messages::Descriptor;

/// Maximum title length, in UTF-16 code units
pub const MAX_TITLE_LENGTH: usize = 4096;
/// Maximum application name length, in UTF-16 code units
pub const MAX_APP_NAME_LENGTH: usize = 128;
/// Maximum current directory length, in UTF-16 code units
pub const MAX_CURRENT_DIRECTORY_LENGTH: usize = 260;

/// Errors raised while decoding a connect body
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Declared input size {declared} does not match body of {actual} bytes")]
    InputSizeMismatch { declared: usize, actual: usize },

    #[error("Malformed connect payload: {0}")]
    Malformed(#[from] bincode::Error),

    #[error("{field} is {length} units long (max {max})")]
    FieldTooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },

    #[error("{field} {value} does not fit in 32 bits")]
    IdOutOfRange { field: &'static str, value: u64 },
}

bitflags! {
    /// Startup flags the client was launched with
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct StartupFlags: u32 {
        const USE_SHOW_WINDOW = 0x0000_0001;
        const USE_SIZE = 0x0000_0002;
        const USE_POSITION = 0x0000_0004;
        const USE_FILL_ATTRIBUTE = 0x0000_0010;
    }
}

/// Requested initial show state of the console window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowWindow {
    Hide,
    ShowNormal,
    ShowMinimized,
    Maximize,
    ShowNoActivate,
    Show,
    Minimize,
    ShowMinNoActive,
    ShowNa,
    Restore,
    ShowDefault,
    ForceMinimize,
}

impl ShowWindow {
    pub fn from_raw(value: u16) -> Option<Self> {
        Some(match value {
            0 => Self::Hide,
            1 => Self::ShowNormal,
            2 => Self::ShowMinimized,
            3 => Self::Maximize,
            4 => Self::ShowNoActivate,
            5 => Self::Show,
            6 => Self::Minimize,
            7 => Self::ShowMinNoActive,
            8 => Self::ShowNa,
            9 => Self::Restore,
            10 => Self::ShowDefault,
            11 => Self::ForceMinimize,
            _ => return None,
        })
    }

    pub fn raw(self) -> u16 {
        match self {
            Self::Hide => 0,
            Self::ShowNormal => 1,
            Self::ShowMinimized => 2,
            Self::Maximize => 3,
            Self::ShowNoActivate => 4,
            Self::Show => 5,
            Self::Minimize => 6,
            Self::ShowMinNoActive => 7,
            Self::ShowNa => 8,
            Self::Restore => 9,
            Self::ShowDefault => 10,
            Self::ForceMinimize => 11,
        }
    }

    /// True for every hide or minimize variant
    pub fn is_hidden_or_minimized(self) -> bool {
        matches!(
            self,
            Self::Hide
                | Self::ShowMinimized
                | Self::Minimize
                | Self::ShowMinNoActive
                | Self::ForceMinimize
        )
    }
}

/// Display preferences the client inherited at launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupInfo {
    pub flags: StartupFlags,
    pub show_window: u16,
    pub fill_attribute: u16,
    /// Screen buffer size in cells (columns, rows)
    pub screen_buffer_size: (u16, u16),
    /// Window size in cells (columns, rows)
    pub window_size: (u16, u16),
}

impl StartupInfo {
    /// The requested show state, when the client explicitly set one
    pub fn requested_show_window(&self) -> Option<ShowWindow> {
        if self.flags.contains(StartupFlags::USE_SHOW_WINDOW) {
            ShowWindow::from_raw(self.show_window)
        } else {
            None
        }
    }

    pub fn with_show_window(mut self, show: ShowWindow) -> Self {
        self.flags |= StartupFlags::USE_SHOW_WINDOW;
        self.show_window = show.raw();
        self
    }
}

/// Wire body of a connect message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectPayload {
    pub process_group_id: u32,
    /// False for attach-only callers
    pub console_app: bool,
    /// False when the client was created without a window
    pub window_visible: bool,
    pub startup: StartupInfo,
    pub title: String,
    pub app_name: String,
    pub current_directory: String,
}

impl ConnectPayload {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(bincode::serialize(self)?)
    }
}

/// A validated connection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectInfo {
    pub process_id: u32,
    pub thread_id: u32,
    pub process_group_id: u32,
    pub console_app: bool,
    pub window_visible: bool,
    pub startup: StartupInfo,
    pub title: String,
    pub app_name: String,
    pub current_directory: String,
}

impl ConnectInfo {
    /// Decode and validate the body of a connect message
    pub fn decode(descriptor: &Descriptor, input: &[u8]) -> Result<Self, ProtocolError> {
        let declared = descriptor.input_size as usize;
        if declared != input.len() {
            return Err(ProtocolError::InputSizeMismatch {
                declared,
                actual: input.len(),
            });
        }

        let payload: ConnectPayload = bincode::deserialize(input)?;

        check_length("title", &payload.title, MAX_TITLE_LENGTH)?;
        check_length("app_name", &payload.app_name, MAX_APP_NAME_LENGTH)?;
        check_length(
            "current_directory",
            &payload.current_directory,
            MAX_CURRENT_DIRECTORY_LENGTH,
        )?;

        Ok(Self {
            process_id: narrow_id("process id", descriptor.process)?,
            thread_id: narrow_id("thread id", descriptor.object)?,
            process_group_id: payload.process_group_id,
            console_app: payload.console_app,
            window_visible: payload.window_visible,
            startup: payload.startup,
            title: payload.title,
            app_name: payload.app_name,
            current_directory: payload.current_directory,
        })
    }
}

fn narrow_id(field: &'static str, value: u64) -> Result<u32, ProtocolError> {
    u32::try_from(value).map_err(|_| ProtocolError::IdOutOfRange { field, value })
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ProtocolError> {
    let length = value.encode_utf16().count();
    if length > max {
        return Err(ProtocolError::FieldTooLong { field, length, max });
    }
    Ok(())
}
