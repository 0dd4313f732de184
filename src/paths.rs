//! Centralized path resolution
//!
//! ## Directory Structure
//!
//! ```text
//! <base>/
//! ├── data/
//! │   ├── config.toml
//! │   ├── votes.db
//! │   └── cache.db
//! └── logs/
//!     └── coinvote_<date>.log
//! ```
//!
//! `<base>` is `$COINVOTE_HOME` when set, otherwise the platform data directory
//! (`~/.local/share/coinvote` on Linux).

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "coinvote";
const HOME_ENV: &str = "COINVOTE_HOME";

static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(resolve_base_directory);

fn resolve_base_directory() -> PathBuf {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .or_else(dirs::home_dir)
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(APP_DIR))
}

pub fn get_base_directory() -> &'static Path {
    &BASE_DIRECTORY
}

pub fn get_data_dir() -> PathBuf {
    BASE_DIRECTORY.join("data")
}

pub fn get_logs_dir() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

pub fn get_votes_db_path() -> PathBuf {
    get_data_dir().join("votes.db")
}

pub fn get_cache_db_path() -> PathBuf {
    get_data_dir().join("cache.db")
}

/// Resolve a configured path; empty means "use the default under the data directory"
pub fn resolve_or_default(configured: &str, default: PathBuf) -> PathBuf {
    if configured.trim().is_empty() {
        default
    } else {
        PathBuf::from(configured)
    }
}

/// Create the data and logs directories if missing
pub fn ensure_all_directories() -> Result<(), String> {
    for dir in [get_data_dir(), get_logs_dir()] {
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_or_default() {
        let default = PathBuf::from("/tmp/default.db");
        assert_eq!(resolve_or_default("  ", default.clone()), default);
        assert_eq!(resolve_or_default("/x/votes.db", default), PathBuf::from("/x/votes.db"));
    }
}
