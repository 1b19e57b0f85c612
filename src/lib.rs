//! Bubble FTP server
//!
//! A single-user, active-mode FTP server supporting login, directory
//! navigation and directory listings.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod navigate;
pub mod protocol;
pub mod server;
pub mod transfer;

pub use crate::config::ServerConfig;
pub use crate::server::Server;
