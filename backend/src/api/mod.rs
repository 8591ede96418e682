//! HTTP API module.
//!
//! The server, its response types, and the progress log shared with the CLI.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server, AppState};
pub use types::*;
pub use logs::*;
