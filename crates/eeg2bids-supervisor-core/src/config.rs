use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Launch mode for helper services
///
/// In development mode the persistent conversion server is started through a
/// platform-specific interpreter script instead of the packaged binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    #[default]
    Production,
    Development,
}

/// Main supervisor configuration
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into, strip_option))]
#[serde(rename_all = "camelCase")]
pub struct SupervisorConfig {
    /// Application resource root; packaged service binaries live under
    /// `dist/` below this directory, development scripts directly in it.
    pub resource_root: PathBuf,

    #[builder(default)]
    #[serde(default)]
    pub mode: LaunchMode,

    /// Well-known local port of the persistent conversion server, freed
    /// best-effort before every restart.
    #[builder(default = "default_server_port()")]
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Substring expected in PATH as a proxy for the numeric runtime being
    /// installed (required for MFF conversion on non-Windows platforms).
    #[builder(default = "default_runtime_marker()")]
    #[serde(default = "default_runtime_marker")]
    pub runtime_marker: String,

    /// Upper bound on a single on-demand conversion job
    #[builder(default = "default_job_timeout_secs()")]
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Directory for per-service rotated log files; None disables file
    /// logging (tracing output only)
    #[builder(default)]
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Size threshold at which a service log file is archived
    #[builder(default = "default_log_max_bytes()")]
    #[serde(default = "default_log_max_bytes")]
    pub log_max_bytes: u64,
}

impl SupervisorConfig {
    pub fn builder() -> SupervisorConfigBuilder {
        SupervisorConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runtime_marker.is_empty() {
            return Err(anyhow::anyhow!("runtime_marker must not be empty"));
        }

        if self.server_port == 0 {
            return Err(anyhow::anyhow!("server_port must not be 0"));
        }

        if self.job_timeout_secs == 0 {
            return Err(anyhow::anyhow!("job_timeout_secs must not be 0"));
        }

        if self.log_max_bytes < 1024 {
            return Err(anyhow::anyhow!("log_max_bytes should be at least 1 KiB"));
        }

        Ok(())
    }

    /// Get the job timeout as Duration
    pub fn job_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.job_timeout_secs)
    }

    /// Check whether the given PATH value carries the numeric runtime marker
    pub fn marker_in_path(&self, path_value: &str) -> bool {
        path_value.contains(&self.runtime_marker)
    }

    /// Check the current process environment for the runtime marker
    pub fn runtime_marker_present(&self) -> bool {
        std::env::var("PATH")
            .map(|path| self.marker_in_path(&path))
            .unwrap_or(false)
    }
}

// Default value functions for serde and derive_builder
fn default_server_port() -> u16 {
    7301
}
fn default_runtime_marker() -> String {
    "v93".to_string()
}
fn default_job_timeout_secs() -> u64 {
    1800
}
fn default_log_max_bytes() -> u64 {
    5 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SupervisorConfig {
        SupervisorConfig::builder()
            .resource_root("/opt/eeg2bids")
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = base_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode, LaunchMode::Production);
        assert_eq!(config.server_port, 7301);
        assert_eq!(config.runtime_marker, "v93");
    }

    #[test]
    fn test_invalid_config() {
        let mut config = base_config();
        config.runtime_marker = String::new();
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.server_port = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.job_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.log_max_bytes = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_marker_in_path() {
        let config = base_config();
        assert!(config.marker_in_path("/usr/bin:/opt/matlab/v93/runtime:/bin"));
        assert!(!config.marker_in_path("/usr/bin:/bin"));
        // Refusal is a pure function of the PATH value: same input, same answer
        assert!(!config.marker_in_path("/usr/bin:/bin"));
    }

    #[test]
    fn test_serialization() {
        let config = base_config();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SupervisorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_serde_defaults() {
        let config: SupervisorConfig =
            serde_json::from_str(r#"{"resourceRoot": "/opt/eeg2bids"}"#).unwrap();
        assert_eq!(config.server_port, 7301);
        assert_eq!(config.mode, LaunchMode::Production);
        assert_eq!(config.job_timeout_secs, 1800);
        assert!(config.log_dir.is_none());
    }
}
