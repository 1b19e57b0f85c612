//! Server core functionality
//!
//! Accepts control connections and runs one session per connection, bounded
//! by a worker limit, with a graceful shutdown.

pub mod core;

pub use self::core::Server;
