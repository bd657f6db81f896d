use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable naming the workspace root on hosted deployments.
pub const WORKSPACE_ENV: &str = "RENDER_WORKSPACE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Job directories older than this are removed at startup. 0 disables.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_base_dir() -> PathBuf {
    std::env::var_os(WORKSPACE_ENV)
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_retention_hours() -> u64 {
    24
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            bind_address: default_bind_address(),
            retention_hours: default_retention_hours(),
            max_upload_bytes: default_max_upload_bytes(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Directory holding `{job_id}/` folders of uploaded originals.
    pub fn upload_root(&self) -> PathBuf {
        self.base_dir.join(&self.upload_dir)
    }

    /// Directory holding `{job_id}/` folders of formatted outputs.
    pub fn output_root(&self) -> PathBuf {
        self.base_dir.join(&self.output_dir)
    }

    /// Huge hour counts saturate rather than overflow.
    pub fn retention(&self) -> Option<Duration> {
        (self.retention_hours > 0)
            .then(|| Duration::from_secs(self.retention_hours.saturating_mul(3600)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_are_relative_to_base() {
        let config = Config {
            base_dir: PathBuf::from("/srv/work"),
            ..Default::default()
        };
        assert_eq!(config.upload_root(), PathBuf::from("/srv/work/uploads"));
        assert_eq!(config.output_root(), PathBuf::from("/srv/work/outputs"));
    }

    #[test]
    fn test_absolute_dirs_win_over_base() {
        let config = Config {
            base_dir: PathBuf::from("/srv/work"),
            upload_dir: PathBuf::from("/data/in"),
            ..Default::default()
        };
        assert_eq!(config.upload_root(), PathBuf::from("/data/in"));
    }

    #[test]
    fn test_retention() {
        let mut config = Config::default();
        assert_eq!(config.retention(), Some(Duration::from_secs(24 * 3600)));
        config.retention_hours = 0;
        assert_eq!(config.retention(), None);
    }

    #[test]
    fn test_retention_saturates() {
        let config = Config {
            retention_hours: u64::MAX,
            ..Default::default()
        };
        assert_eq!(config.retention(), Some(Duration::from_secs(u64::MAX)));
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(serde_json::to_string(&LogFormat::Pretty).unwrap(), "\"pretty\"");
    }
}
