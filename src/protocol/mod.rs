//! FTP Protocol implementation
//!
//! Handles command parsing, the reply table and command dispatch.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{Command, Verb};
pub use responses::{Reply, ReplyKind};
