//! Navigate module
//!
//! Handles directory navigation for FTP sessions: resolving CWD targets,
//! reporting the current directory and listing its entries.

mod operations;
pub mod store;

pub use operations::resolve_directory;
pub use store::{DirectoryStore, LocalDirectoryStore};
