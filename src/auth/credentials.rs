//! Credential storage
//!
//! Validates username/password pairs against a credential source.

use crate::config::ServerConfig;

/// A source of valid username/password pairs.
///
/// Implementations are shared by every session and must not keep
/// per-session state.
pub trait CredentialStore: Send + Sync {
    /// Returns true when `password` is correct for `username`.
    fn check(&self, username: &str, password: &str) -> bool;
}

/// A single configured credential pair. Matching is exact and case-sensitive.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

impl CredentialStore for StaticCredentials {
    fn check(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}
