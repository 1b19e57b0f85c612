//! Navigation operations implementation

use crate::error::NavigateError;
use std::path::{Path, PathBuf};

/// Resolves `target` against `current` into a canonical directory path.
///
/// Absolute targets replace `current`, relative ones are joined onto it.
/// When `root` is given the result must stay inside it.
pub fn resolve_directory(
    current: &Path,
    target: &str,
    root: Option<&Path>,
) -> Result<PathBuf, NavigateError> {
    if target.is_empty() {
        return Err(NavigateError::NotFound(target.to_string()));
    }

    let candidate = if Path::new(target).is_absolute() {
        PathBuf::from(target)
    } else {
        current.join(target)
    };

    let canonical = match candidate.canonicalize() {
        Ok(path) => path,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(NavigateError::NotFound(target.to_string()));
        }
        Err(e) => return Err(NavigateError::Io(e)),
    };

    if !canonical.is_dir() {
        return Err(NavigateError::NotADirectory(target.to_string()));
    }

    if let Some(root) = root {
        if !canonical.starts_with(root) {
            return Err(NavigateError::OutsideRoot(target.to_string()));
        }
    }

    Ok(canonical)
}
