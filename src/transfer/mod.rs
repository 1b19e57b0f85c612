//! Transfer module for FTP server
//!
//! Manages the active-mode data connection: the client advertises an address
//! with PORT and the server connects out to it for each transfer.

pub mod data_channel;

pub use data_channel::{DataChannel, DataEndpoint};
