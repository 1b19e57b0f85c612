//! Error handlers
//!
//! Converts errors into the single reply the client receives for them.

use crate::error::types::{NavigateError, SessionError, TransferError};
use crate::protocol::responses::{Reply, ReplyKind};

/// Reply for an error raised while processing a command
pub fn session_error_reply(err: &SessionError) -> Reply {
    match err {
        SessionError::MissingParameter(_) => Reply::of(ReplyKind::MissingParameters),
        SessionError::TooManyParameters(verb) => Reply::with(ReplyKind::TooManyParameters, verb),
        SessionError::Control(_) => Reply::of(ReplyKind::FatalError),
    }
}

/// Reply for a failed CWD or PWD
pub fn navigate_error_reply(err: &NavigateError) -> Reply {
    match err {
        NavigateError::NotFound(target) => Reply::with(ReplyKind::UnknownDirectory, target),
        NavigateError::NotADirectory(target) => Reply::with(ReplyKind::NotADirectory, target),
        NavigateError::OutsideRoot(target) => Reply::with(ReplyKind::OutsideRoot, target),
        NavigateError::Io(_) => Reply::of(ReplyKind::DirectoryUnavailable),
    }
}

/// Reply for a failed PORT or data transfer
pub fn transfer_error_reply(err: &TransferError) -> Reply {
    match err {
        TransferError::MalformedAddress(spec) => Reply::with(ReplyKind::MalformedAddress, spec),
        TransferError::NotConfigured => Reply::of(ReplyKind::DataNotConfigured),
        TransferError::NotConnected
        | TransferError::ConnectFailed { .. }
        | TransferError::ConnectTimeout(_)
        | TransferError::Cancelled
        | TransferError::Io(_) => Reply::of(ReplyKind::DataConnectionFailed),
    }
}
