//! Configuration discovery and loading.
//!
//! The configuration file is JSON, read once at process start. Its location is
//! `$PROSPECT_CONFIG_PATH` when set, otherwise `<config_dir>/prospect/config.json`
//! (`~/.config/prospect/config.json` on most Linux systems). A missing file
//! yields defaults; an unreadable or invalid file is an error.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use dirs_next::config_dir;
use prospect_types::{ConfigError, ProspectConfig};
use tracing::debug;

use crate::expand_tilde;

/// Environment variable allowing callers to override the configuration path.
pub const CONFIG_PATH_ENV: &str = "PROSPECT_CONFIG_PATH";

/// Default filename for the JSON payload.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Get the default path for the configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prospect")
        .join(CONFIG_FILE_NAME)
}

/// Load configuration from the default location.
pub fn load_config() -> Result<ProspectConfig, ConfigError> {
    load_config_from(&default_config_path())
}

/// Load and validate configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<ProspectConfig, ConfigError> {
    let config = match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str::<ProspectConfig>(&content)?,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "configuration file not found; using defaults");
            ProspectConfig::default()
        }
        Err(error) => return Err(ConfigError::Io(error)),
    };
    config.validate()?;
    Ok(config)
}
