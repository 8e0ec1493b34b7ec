//! consrv server
//!
//! The connection and object-lifecycle gateway of a console server: the
//! entry points a transport invokes when a client process opens, closes,
//! attaches to or detaches from the console.

pub mod config;
pub mod console;
pub mod handlers;
pub mod handoff;
pub mod host;
pub mod observability;

pub use config::{AppConfig, ConfigLoader};
pub use handlers::{ConsoleServer, ConsoleServerBuilder, HandlerResult};
