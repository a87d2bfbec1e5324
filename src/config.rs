//! # Configuration Module
//!
//! Data directory and file locations for Animuse.
//!
//! ## Data Storage
//!
//! The snapshot database and the default catalog dump live in the
//! platform-standard data directory:
//! - Linux: `~/.local/share/animuse/`
//! - macOS: `~/Library/Application Support/animuse/`
//! - Windows: `%APPDATA%\animuse\`
//!
//! Both paths can be overridden on the command line (`--db`, `--catalog`) or
//! through `ANIMUSE_DB` / `ANIMUSE_CATALOG`.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "animuse";
const DB_FILE: &str = "animuse.db";
const CATALOG_FILE: &str = "catalog.json";

/// Returns the Animuse data directory, creating it if needed.
///
/// # Errors
///
/// Fails when the platform data directory cannot be determined or the
/// `animuse` subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create Animuse data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Default location of the snapshot database.
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Default location of the catalog dump.
pub fn get_catalog_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(CATALOG_FILE))
}

/// File locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub db_path: PathBuf,
    pub catalog_path: PathBuf,
}

impl RuntimeConfig {
    /// Uses the given paths, falling back to the data directory for missing ones.
    pub fn resolve(db_path: Option<PathBuf>, catalog_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => get_db_path()?,
        };
        let catalog_path = match catalog_path {
            Some(path) => path,
            None => get_catalog_path()?,
        };
        Ok(Self {
            db_path,
            catalog_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths_win() -> Result<()> {
        let config = RuntimeConfig::resolve(
            Some(PathBuf::from("/tmp/a.db")),
            Some(PathBuf::from("/tmp/c.json")),
        )?;
        assert_eq!(config.db_path, PathBuf::from("/tmp/a.db"));
        assert_eq!(config.catalog_path, PathBuf::from("/tmp/c.json"));
        Ok(())
    }

    #[test]
    fn test_default_paths_share_data_dir() {
        // Skipped on hosts without a data directory.
        let (Ok(db), Ok(catalog)) = (get_db_path(), get_catalog_path()) else {
            return;
        };
        assert_eq!(db.file_name().unwrap(), DB_FILE);
        assert_eq!(catalog.file_name().unwrap(), CATALOG_FILE);
        assert_eq!(db.parent(), catalog.parent());
        assert_eq!(db.parent().unwrap().file_name().unwrap(), APP_DIR);
    }
}
