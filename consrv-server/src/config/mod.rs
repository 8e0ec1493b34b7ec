//! Configuration management for the console server
//!
//! Launch policy, the registered handoff target and command history limits
//! are read once at startup.

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;
