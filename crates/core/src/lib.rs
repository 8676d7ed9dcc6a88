//! Session management for a desktop media player driven over its remote
//! debug endpoint.
//!
//! The player is controlled indirectly: a debug/automation endpoint exposes
//! the running page, and every command is an expression evaluated in that
//! page's execution context. This crate owns the single live connection to
//! that endpoint, reconnects when it drops, caches read-mostly queries, and
//! translates abstract commands into expression evaluations.

pub mod cache;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod script;
pub mod session;
pub mod status;
pub mod transport;

pub use command::{Command, CommandOutcome};
pub use config::ControllerConfig;
pub use controller::Controller;
pub use error::{Error, Result};
pub use session::{ConnectionState, SessionLifecycle, SessionStatus};
pub use status::{PlayerStatus, TrackInfo, TrackTime, VolumeInfo, now_millis};
