use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::indexer::ResolveOptions;

/// Overrides the editor's user-data directory (the one holding `User/`)
pub const USER_DATA_DIR_ENV: &str = "CURSOR_USER_DATA_DIR";

const APP_DIR_NAME: &str = "Cursor";

/// Locations and options the extraction engine runs against
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub user_data_dir: PathBuf,
    /// One subdirectory per workspace
    pub storage_root: PathBuf,
    /// The single global `state.vscdb`
    pub global_store: PathBuf,
    pub options: ResolveOptions,
}

impl ExtractorConfig {
    /// Derive the storage layout from a user-data directory
    pub fn from_user_data_dir(user_data_dir: impl Into<PathBuf>) -> Self {
        let user_data_dir = user_data_dir.into();
        let user_dir = user_data_dir.join("User");
        Self {
            storage_root: user_dir.join("workspaceStorage"),
            global_store: user_dir.join("globalStorage").join("state.vscdb"),
            user_data_dir,
            options: ResolveOptions::default(),
        }
    }

    /// Resolve from an explicit directory, then the environment, then the platform default
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let dir = match explicit {
            Some(dir) => dir.to_path_buf(),
            None => get_user_data_dir()?,
        };
        Ok(Self::from_user_data_dir(dir))
    }

    pub fn with_options(self, options: ResolveOptions) -> Self {
        Self { options, ..self }
    }
}

/// Get the editor's user-data directory
///
/// `CURSOR_USER_DATA_DIR` wins when set and non-empty; otherwise the platform
/// config directory (`~/.config`, `~/Library/Application Support`, `%APPDATA%`)
/// joined with `Cursor`.
pub fn get_user_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var(USER_DATA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    let config_dir = dirs::config_dir().context("Could not determine the platform config directory")?;
    Ok(config_dir.join(APP_DIR_NAME))
}
