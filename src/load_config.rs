//! Config file discovery and loading.
//!
//! `portal-sync.json` is looked up in two places: the home folder (the
//! `PORTAL_SYNC_HOME` environment variable when set, else the OS home directory)
//! and the content root. A missing file yields an empty config; an unreadable or
//! malformed file is a [`ConfigError`] so the failure surfaces immediately instead
//! of silently dropping a layer.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};

/// Well-known config file name, searched in the home folder and the content root.
pub const CONFIG_FILE: &str = "portal-sync.json";

/// Environment variable overriding the home folder.
pub const HOME_ENV: &str = "PORTAL_SYNC_HOME";

/// The folder holding the global config file.
pub fn home_folder() -> Option<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Load `portal-sync.json` from `folder`. A missing file is an empty config.
pub fn load_config_file(folder: &Path) -> Result<Config, ConfigError> {
    let path = folder.join(CONFIG_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "No config file present");
        return Ok(Config::new());
    }

    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let object: serde_json::Map<String, Value> =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

    info!(path = %path.display(), keys = object.len(), "Loaded config file");
    Ok(Config::from_object(object))
}

/// Merge the three config sources in increasing priority: home folder file,
/// content-root file, command-line overlay.
pub fn resolve(content_root: &Path, cli_overlay: Config) -> Result<Config, ConfigError> {
    let mut merged = Config::new();

    if let Some(home) = home_folder() {
        merged.merge(load_config_file(&home)?);
    }
    merged.merge(load_config_file(content_root)?);
    merged.merge(cli_overlay);

    Ok(merged)
}
