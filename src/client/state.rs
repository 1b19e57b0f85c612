//! Module `state`
//!
//! Per-connection session state. A session exclusively owns its control
//! channel, data channel, authenticator and directory store.

use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthState, Authenticator};
use crate::client::control_channel::ControlChannel;
use crate::navigate::DirectoryStore;
use crate::transfer::{DataChannel, DataEndpoint};

/// Whether the command loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session<R, W> {
    pub(crate) id: u64,
    pub(crate) peer: Option<SocketAddr>,
    pub(crate) control: ControlChannel<R, W>,
    pub(crate) data: DataChannel,
    pub(crate) auth: Authenticator,
    pub(crate) store: Box<dyn DirectoryStore>,
    pub(crate) require_login: bool,
    pub(crate) shutdown: CancellationToken,
}

impl<R, W> Session<R, W> {
    pub fn new(
        id: u64,
        control: ControlChannel<R, W>,
        data: DataChannel,
        auth: Authenticator,
        store: Box<dyn DirectoryStore>,
    ) -> Self {
        Self {
            id,
            peer: None,
            control,
            data,
            auth,
            store,
            require_login: false,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Gate navigation and listing commands behind a successful login.
    pub fn with_login_required(mut self, require_login: bool) -> Self {
        self.require_login = require_login;
        self
    }

    /// Token observed by the command loop and the data connect.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn auth_state(&self) -> &AuthState {
        self.auth.state()
    }

    pub fn pending_endpoint(&self) -> Option<DataEndpoint> {
        self.data.endpoint()
    }

    /// Label used in log lines
    pub(crate) fn label(&self) -> String {
        match self.peer {
            Some(peer) => format!("#{} ({})", self.id, peer),
            None => format!("#{}", self.id),
        }
    }
}
