//! consrv-utils: Common utilities shared across consrv crates
//!
//! This crate provides:
//! - Unified error type ([`ConsoleError`], [`Result`]) with status mapping
//! - Logging infrastructure ([`init_logging`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{ConsoleError, Result};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogOutput};
pub use paths::{config_dir, config_file, log_dir, state_dir};
