//! Directory stores
//!
//! A store tracks one session's working directory. Stores are created per
//! session and never shared.

use super::operations::resolve_directory;
use crate::error::NavigateError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait DirectoryStore: Send {
    /// Canonical absolute path of the current directory.
    fn pwd(&self) -> io::Result<String>;

    /// Changes the current directory and returns its canonical path.
    ///
    /// On error the current directory is unchanged.
    fn cwd(&mut self, target: &str) -> Result<String, NavigateError>;

    /// Bare entry names of the current directory, in storage order.
    fn list(&self) -> io::Result<Vec<String>>;
}

/// Directory store over the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalDirectoryStore {
    current: PathBuf,
    root: Option<PathBuf>,
}

impl LocalDirectoryStore {
    /// Opens a store rooted at `start`. With `confine` set, CWD may not leave
    /// `start`.
    pub fn open(start: &Path, confine: bool) -> io::Result<Self> {
        let current = start.canonicalize()?;
        if !current.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", current.display()),
            ));
        }
        let root = confine.then(|| current.clone());
        Ok(Self { current, root })
    }
}

impl DirectoryStore for LocalDirectoryStore {
    fn pwd(&self) -> io::Result<String> {
        let canonical = self.current.canonicalize()?;
        Ok(canonical.to_string_lossy().into_owned())
    }

    fn cwd(&mut self, target: &str) -> Result<String, NavigateError> {
        let resolved = resolve_directory(&self.current, target, self.root.as_deref())?;
        let display = resolved.to_string_lossy().into_owned();
        self.current = resolved;
        Ok(display)
    }

    fn list(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.current)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}
