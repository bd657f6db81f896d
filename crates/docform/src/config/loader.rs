use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config::schema::{Config, WORKSPACE_ENV};
use crate::error::ConfigError;

/// Names a JSON config file to load instead of the defaults.
pub const CONFIG_PATH_ENV: &str = "DOCFORM_CONFIG";
/// Overrides `bind_address`.
pub const BIND_ADDR_ENV: &str = "DOCFORM_BIND_ADDR";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Resolves the runtime configuration from the process environment.
pub fn load_from_env() -> Result<Config, ConfigError> {
    resolve(|key| std::env::var(key).ok())
}

/// Loads the file named by `DOCFORM_CONFIG` (or defaults), then applies the
/// environment overrides. `lookup` reads environment variables.
pub fn resolve<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            load_config(path)?
        }
        None => Config::default(),
    };

    if let Some(bind) = lookup(BIND_ADDR_ENV).filter(|v| !v.trim().is_empty()) {
        config.bind_address = bind.trim().to_string();
    }
    if let Some(workspace) = lookup(WORKSPACE_ENV).filter(|v| !v.trim().is_empty()) {
        config.base_dir = PathBuf::from(workspace);
    }

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.upload_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "upload_dir must not be empty".to_string(),
        });
    }

    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "output_dir must not be empty".to_string(),
        });
    }

    if config.upload_root() == config.output_root() {
        return Err(ConfigError::Validation {
            message: "upload_dir and output_dir must be different directories".to_string(),
        });
    }

    if config.bind_address.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Validation {
            message: format!("Invalid bind_address: {}", config.bind_address),
        });
    }

    if config.max_upload_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "max_upload_bytes must be greater than zero".to_string(),
        });
    }

    Ok(())
}
