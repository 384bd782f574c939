//! Path expansion for configured file names.

use std::path::{Path, PathBuf};

/// Expand `~` and make the path absolute.
///
/// `~` and `~/...` resolve against the home directory; relative paths are
/// joined to the current directory. If either lookup fails the path is
/// returned as far as it could be expanded.
pub fn expand_path(path: &Path) -> PathBuf {
    let expanded = match path.to_str() {
        Some("~") => dirs::home_dir().unwrap_or_else(|| path.to_path_buf()),
        Some(s) => match (s.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => path.to_path_buf(),
        },
        None => path.to_path_buf(),
    };

    if expanded.is_absolute() {
        return expanded;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(expanded),
        Err(_) => expanded,
    }
}
