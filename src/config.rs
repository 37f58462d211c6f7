use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Dashboard client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Controller connection settings
    pub controller: ControllerSettings,

    /// HTTP client tuning
    #[serde(default)]
    pub http: HttpSettings,
}

/// Where the controller lives and how to authenticate against it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerSettings {
    /// Base URL of the controller, e.g. "http://192.168.1.1:8765"
    pub url: String,

    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Refresh interval for the usage watch view, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http.timeout_secs)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http.poll_interval_secs)
    }
}

/// Get the platform-specific config file path.
pub fn get_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "zeitwache")
        .context("Could not determine a config directory for this platform")?;
    Ok(dirs.config_dir().join("config.yaml"))
}

/// Load configuration from YAML file.
pub fn load_config(path: &Path) -> Result<ClientConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: ClientConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Save configuration to YAML file.
pub fn save_config(path: &Path, config: &ClientConfig) -> Result<()> {
    validate_config(config)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let content = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}

/// Validate configuration.
pub fn validate_config(config: &ClientConfig) -> Result<()> {
    let url = Url::parse(&config.controller.url)
        .with_context(|| format!("Invalid controller URL: {}", config.controller.url))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("Controller URL must be http or https (got: {})", url.scheme());
    }

    if config.controller.username.is_empty() {
        anyhow::bail!("Controller username cannot be empty");
    }

    if config.http.timeout_secs == 0 {
        anyhow::bail!("HTTP timeout must be at least one second");
    }

    if config.http.poll_interval_secs == 0 {
        anyhow::bail!("Poll interval must be at least one second");
    }

    Ok(())
}

/// Example configuration file content.
pub const EXAMPLE_CONFIG: &str = r#"# Zeitwache dashboard configuration

controller:
  url: "http://192.168.1.1:8765"
  username: "admin"
  password: "changeme"

http:
  timeout_secs: 10
  poll_interval_secs: 10
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_config() -> ClientConfig {
        ClientConfig {
            controller: ControllerSettings {
                url: "http://192.168.1.1:8765".to_string(),
                username: "admin".to_string(),
                password: "changeme".to_string(),
            },
            http: HttpSettings::default(),
        }
    }

    #[test]
    fn example_config_parses_and_validates() {
        let config: ClientConfig = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.http.timeout_secs, 10);
    }

    #[test]
    fn defaults_apply_when_http_section_is_absent() {
        let yaml = r#"
controller:
  url: "http://router.local:8765"
  username: "admin"
  password: "s3cret"
"#;
        let config: ClientConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.http.poll_interval_secs, 10);
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = make_test_config();
        config.controller.url = "not a url".to_string();
        assert!(validate_config(&config).is_err());

        config.controller.url = "ftp://router".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn validate_rejects_empty_username() {
        let mut config = make_test_config();
        config.controller.username.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut config = make_test_config();
        config.http.timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = make_test_config();
        config.http.poll_interval_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = make_test_config();
        save_config(&path, &config).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.controller.url, config.controller.url);
        assert_eq!(loaded.controller.username, config.controller.username);
    }

    #[test]
    fn save_refuses_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = make_test_config();
        config.controller.url = "nope".to_string();
        assert!(save_config(&path, &config).is_err());
        assert!(!path.exists());
    }
}
