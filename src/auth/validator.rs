//! Authentication state machine
//!
//! `Unauthenticated -> UsernameGiven -> Authenticated`. Once authenticated
//! the state never changes for the rest of the session.

use super::credentials::CredentialStore;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    UsernameGiven(String),
    Authenticated(String),
}

/// Per-session authenticator backed by a shared credential source.
pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    state: AuthState,
}

impl Authenticator {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            state: AuthState::Unauthenticated,
        }
    }

    /// Records the candidate username. Does not grant access.
    pub fn identify(&mut self, username: &str) {
        if self.is_authenticated() {
            return;
        }
        self.state = AuthState::UsernameGiven(username.to_string());
    }

    /// Checks `password` against the username on file.
    ///
    /// Fails closed when no username was given. A wrong password leaves the
    /// state untouched so the client may retry PASS.
    pub fn verify(&mut self, password: &str) -> bool {
        match &self.state {
            AuthState::Unauthenticated => false,
            AuthState::UsernameGiven(user) => {
                if self.credentials.check(user, password) {
                    self.state = AuthState::Authenticated(user.clone());
                    true
                } else {
                    false
                }
            }
            AuthState::Authenticated(user) => self.credentials.check(user, password),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The username on file, granted or not
    pub fn username(&self) -> Option<&str> {
        match &self.state {
            AuthState::Unauthenticated => None,
            AuthState::UsernameGiven(user) | AuthState::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }
}
