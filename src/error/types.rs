//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.

use std::io;
use std::net::SocketAddrV4;
use thiserror::Error;

/// Directory navigation errors
#[derive(Debug, Error)]
pub enum NavigateError {
    #[error("Unknown directory {0}")]
    NotFound(String),

    #[error("Not a directory {0}")]
    NotADirectory(String),

    #[error("Directory {0} is outside the server root")]
    OutsideRoot(String),

    #[error("Error retrieving current directory: {0}")]
    Io(#[from] io::Error),
}

/// Data channel errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Unknown address format: {0}")]
    MalformedAddress(String),

    #[error("Data connection params not set")]
    NotConfigured,

    #[error("Data connection is not open")]
    NotConnected,

    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    #[error("Timeout connecting to {0}")]
    ConnectTimeout(SocketAddrV4),

    #[error("Data connection cancelled by shutdown")]
    Cancelled,

    #[error("Data transfer failed: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while processing a single command.
///
/// Parameter errors are recoverable and answered with one reply; a control
/// channel fault ends the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} is missing parameters")]
    MissingParameter(String),

    #[error("{0} expects exactly one parameter")]
    TooManyParameters(String),

    #[error("Control connection failed: {0}")]
    Control(#[from] io::Error),
}

impl SessionError {
    /// Returns true when the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Control(_))
    }
}
