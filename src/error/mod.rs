//! Error handling
//!
//! Defines error types for each module and maps them onto protocol replies.

pub mod handlers;
pub mod types;

pub use types::*;
