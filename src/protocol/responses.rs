//! FTP Response handling
//!
//! Every reply the server can send is one of the kinds below. The table in
//! `ReplyKind` fixes each kind's numeric code and message template; `{}` in a
//! template is filled with request-specific detail.

use std::fmt;

/// Reply kinds, each with a fixed code and message template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    DataConnectionOpen,
    PortOk,
    SystemType,
    ServiceReady,
    Goodbye,
    TransferComplete,
    LoggedIn,
    DirectoryChanged,
    WorkingDirectory,
    PasswordRequired,

    // 502 rejections
    UnknownCommand,
    MissingParameters,
    TooManyParameters,
    CommandTooLong,
    UsernameFirst,
    LoginFailed,
    LoginRequired,
    UnknownDirectory,
    NotADirectory,
    OutsideRoot,
    DirectoryUnavailable,
    ListingFailed,
    MalformedAddress,
    DataNotConfigured,
    DataConnectionFailed,
    FatalError,
}

impl ReplyKind {
    /// Three-digit wire code
    pub const fn code(self) -> u16 {
        match self {
            ReplyKind::DataConnectionOpen => 150,
            ReplyKind::PortOk => 200,
            ReplyKind::SystemType => 215,
            ReplyKind::ServiceReady => 220,
            ReplyKind::Goodbye => 221,
            ReplyKind::TransferComplete => 226,
            ReplyKind::LoggedIn => 230,
            ReplyKind::DirectoryChanged => 250,
            ReplyKind::WorkingDirectory => 257,
            ReplyKind::PasswordRequired => 331,
            ReplyKind::UnknownCommand
            | ReplyKind::MissingParameters
            | ReplyKind::TooManyParameters
            | ReplyKind::CommandTooLong
            | ReplyKind::UsernameFirst
            | ReplyKind::LoginFailed
            | ReplyKind::LoginRequired
            | ReplyKind::UnknownDirectory
            | ReplyKind::NotADirectory
            | ReplyKind::OutsideRoot
            | ReplyKind::DirectoryUnavailable
            | ReplyKind::ListingFailed
            | ReplyKind::MalformedAddress
            | ReplyKind::DataNotConfigured
            | ReplyKind::DataConnectionFailed
            | ReplyKind::FatalError => 502,
        }
    }

    /// Message template; `{}` marks where detail goes
    pub const fn template(self) -> &'static str {
        match self {
            ReplyKind::DataConnectionOpen => "BINARY data connection established.",
            ReplyKind::PortOk => "PORT {}",
            ReplyKind::SystemType => "UNIX Type: L8",
            ReplyKind::ServiceReady => "Bubble FTP 0.1 ready.",
            ReplyKind::Goodbye => "See ya!",
            ReplyKind::TransferComplete => "Directory list has been submitted.",
            ReplyKind::LoggedIn => "Authentication successful",
            ReplyKind::DirectoryChanged => "OK. New directory is {}",
            ReplyKind::WorkingDirectory => "{} is the current working directory.",
            ReplyKind::PasswordRequired => "Password please for {}",
            ReplyKind::UnknownCommand => "Unknown command: {}",
            ReplyKind::MissingParameters => "Command missing parameters",
            ReplyKind::TooManyParameters => "{} expects exactly one parameter",
            ReplyKind::CommandTooLong => "Command too long",
            ReplyKind::UsernameFirst => "Please enter the username first",
            ReplyKind::LoginFailed => "Cannot authenticate user {}",
            ReplyKind::LoginRequired => "Please login with USER and PASS",
            ReplyKind::UnknownDirectory => "Unknown directory {}",
            ReplyKind::NotADirectory => "Not a directory {}",
            ReplyKind::OutsideRoot => "Directory {} is outside the server root",
            ReplyKind::DirectoryUnavailable => "Error retrieving current directory",
            ReplyKind::ListingFailed => "Error listing directory",
            ReplyKind::MalformedAddress => "Unknown address format: {}",
            ReplyKind::DataNotConfigured => "Data connection params not set",
            ReplyKind::DataConnectionFailed => "Error creating data connection with client DTP",
            ReplyKind::FatalError => "Fatal error, aborting connection",
        }
    }
}

/// A single status-coded reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub message: String,
}

impl Reply {
    /// Reply with the kind's template as-is
    pub fn of(kind: ReplyKind) -> Self {
        Self {
            kind,
            message: kind.template().to_string(),
        }
    }

    /// Reply with `detail` substituted into the kind's template
    pub fn with(kind: ReplyKind, detail: impl fmt::Display) -> Self {
        Self {
            kind,
            message: kind.template().replacen("{}", &detail.to_string(), 1),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.code(), self.message)
    }
}
