//! Authentication system
//!
//! Credential sources are pluggable through [`CredentialStore`]; each session
//! owns its own [`Authenticator`] tracking how far the USER/PASS exchange got.

pub mod credentials;
pub mod validator;

pub use credentials::{CredentialStore, StaticCredentials};
pub use validator::{AuthState, Authenticator};
