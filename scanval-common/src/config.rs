//! Configuration file resolution and credential lookup
//!
//! Config file priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config directory (`<config dir>/scanval/config.toml`)
//! 4. None (caller falls back to compiled defaults)
//!
//! Credential priority order: environment variable, then TOML value.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SCANVAL_CONFIG";

/// Resolve the configuration file path
///
/// Returns `None` when no explicit path was given and no user config file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    default_config_path().filter(|p| p.exists())
}

/// Default per-user config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scanval").join("config.toml"))
}

/// Read and deserialize a TOML config file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Validate a credential (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Environment variable consulted for an adapter's credential
///
/// `upcitemdb` → `SCANVAL_UPCITEMDB_API_KEY`, `open-ai` → `SCANVAL_OPEN_AI_API_KEY`
pub fn credential_env_var(adapter_name: &str) -> String {
    let upper: String = adapter_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("SCANVAL_{}_API_KEY", upper)
}

/// Resolve an adapter credential from environment and TOML
///
/// **Priority:** ENV → TOML. Invalid (blank) values are ignored.
pub fn resolve_credential(adapter_name: &str, toml_value: Option<&str>) -> Option<String> {
    let env_name = credential_env_var(adapter_name);
    let env_key = std::env::var(&env_name).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            adapter = adapter_name,
            "Credential found in both {} and TOML config. Using environment (highest priority).",
            env_name
        );
    }

    if let Some(key) = env_key {
        info!(adapter = adapter_name, "Credential loaded from environment variable");
        return Some(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!(adapter = adapter_name, "Credential loaded from TOML config");
        return Some(key.trim().to_string());
    }

    None
}
