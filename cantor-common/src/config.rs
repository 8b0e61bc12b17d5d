//! Configuration file resolution and loading
//!
//! Config file lookup order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config directory (`~/.config/cantor/config.toml` on Linux)
//! 4. System config (`/etc/cantor/config.toml`, unix only)
//!
//! A missing file is not an error: callers get compiled defaults and a warning.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name under the platform config dir
pub const APP_DIR: &str = "cantor";

/// Config file name
pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the config file path, returning `None` when no candidate exists.
///
/// An explicit path (CLI or env) is returned even if it does not exist, so the
/// caller can report it.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_candidates().into_iter().find(|p| p.exists())
}

/// Platform default locations, most specific first
fn default_config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join(CONFIG_FILE));
    }
    if cfg!(unix) {
        candidates.push(PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE));
    }
    candidates
}

/// Parse a TOML document into a config struct
pub fn parse_config<T: DeserializeOwned>(toml_content: &str) -> Result<T> {
    Ok(toml::from_str(toml_content)?)
}

/// Load a config file, falling back to `T::default()` when `path` is `None`
/// or the file does not exist.
///
/// A file that exists but cannot be read or parsed is an error.
pub fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        warn!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using compiled defaults", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}
