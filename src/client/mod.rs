//! Client session management
//!
//! Handles the control connection, per-session state and the command loop.

pub mod control_channel;
pub mod handler;
pub mod state;

pub use control_channel::{ControlChannel, ControlEvent};
pub use state::{Flow, Session};
