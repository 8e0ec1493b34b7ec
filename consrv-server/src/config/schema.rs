//! Configuration schema structs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub launch: LaunchConfig,
    pub handoff: HandoffConfig,
    pub history: HistoryConfig,
}

/// How this server process was launched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Never delegate sessions to an alternate console
    pub force_no_handoff: bool,
    /// Running behind a pty-style pass-through with no window of our own
    pub headless: bool,
    /// Explicitly asked to create and host our own window
    pub create_server_handle: bool,
    /// Started by another console as the target of a handoff
    pub handoff_target: bool,
}

/// Alternate console registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Identifier of the registered alternate console, if any
    pub target: Option<Uuid>,
}

/// Command history limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of command histories kept across client processes
    pub buffer_count: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { buffer_count: 4 }
    }
}
