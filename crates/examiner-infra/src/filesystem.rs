//! Data directory resolution.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "EXAMINER_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `EXAMINER_DATA_DIR` environment variable
/// 2. `~/.examiner`
/// 3. `./.examiner` when no home directory is known
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".examiner");
    }

    PathBuf::from(".examiner")
}

/// Resolve a configured path against the data directory. Absolute paths
/// are returned unchanged.
pub fn resolve_in_data_dir(data_dir: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}
