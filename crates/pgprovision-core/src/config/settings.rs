//! Provisioning settings
//!
//! Settings come from an optional TOML file, with environment variable
//! expansion, and are then adjusted by environment overrides and CLI flags.
//! Every field has a default so an absent or empty file is valid.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ConfigError, Result};

/// Overrides the identity endpoint (sovereign clouds, local mocks)
pub const AUTHORITY_HOST_VAR: &str = "AZURE_AUTHORITY_HOST";
/// Overrides the management endpoint
pub const RESOURCE_MANAGER_URL_VAR: &str = "AZURE_RESOURCE_MANAGER_URL";

/// Smallest accepted `[polling] interval_ms`
pub const MIN_POLL_INTERVAL_MS: u64 = 1;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_RESOURCE_MANAGER: &str = "https://management.azure.com";

/// Top-level provisioning configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Name of the resource group to create
    #[serde(default = "default_resource_group")]
    pub resource_group: String,
    /// Region for both the group and the server
    #[serde(default = "default_location")]
    pub location: String,
    /// Skip the deferred resource group deletion
    #[serde(default)]
    pub keep_resource_group: bool,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub endpoints: Endpoints,
}

/// PostgreSQL server parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_admin_login")]
    pub administrator_login: String,
    #[serde(default = "default_admin_password")]
    pub administrator_login_password: String,
    #[serde(default = "default_storage_mb")]
    pub storage_mb: i64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            administrator_login: default_admin_login(),
            administrator_login_password: default_admin_password(),
            storage_mb: default_storage_mb(),
        }
    }
}

/// Long-running operation polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Delay between polls when the service sends no Retry-After header
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Identity and management endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
    #[serde(default = "default_resource_manager")]
    pub resource_manager: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authority_host: default_authority_host(),
            resource_manager: default_resource_manager(),
        }
    }
}

impl Endpoints {
    /// Apply `AZURE_AUTHORITY_HOST` / `AZURE_RESOURCE_MANAGER_URL` if set
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(AUTHORITY_HOST_VAR).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Authority host overridden by {}", AUTHORITY_HOST_VAR);
            self.authority_host = host.trim().to_string();
        }
        if let Some(arm) = lookup(RESOURCE_MANAGER_URL_VAR).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Resource manager overridden by {}", RESOURCE_MANAGER_URL_VAR);
            self.resource_manager = arm.trim().to_string();
        }
    }

    /// Parse the management endpoint
    pub fn resource_manager_url(&self) -> Result<url::Url> {
        parse_endpoint(&self.resource_manager)
    }

    /// Parse the identity endpoint
    pub fn authority_url(&self) -> Result<url::Url> {
        parse_endpoint(&self.authority_host)
    }
}

fn parse_endpoint(raw: &str) -> Result<url::Url> {
    let trimmed = raw.trim_end_matches('/');
    url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidEndpoint {
        url: raw.to_string(),
        message: e.to_string(),
    })
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            resource_group: default_resource_group(),
            location: default_location(),
            keep_resource_group: false,
            server: ServerSettings::default(),
            polling: PollingSettings::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl ProvisionConfig {
    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// A path that does not exist yields the defaults.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);
        let config: ProvisionConfig = toml::from_str(&expanded_content)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the run cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::InvalidSetting {
                key: "polling.interval_ms",
                message: format!("must be at least {}", MIN_POLL_INTERVAL_MS),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "pgprovision", "pgprovision")
            .ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand `${VAR}` and `${VAR:-default}` references
    ///
    /// Unknown variables are left as-is.
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

fn default_resource_group() -> String {
    "postgresql-sample".to_string()
}

fn default_location() -> String {
    "westus".to_string()
}

fn default_server_name() -> String {
    "rustrocks".to_string()
}

fn default_admin_login() -> String {
    "notadmin".to_string()
}

fn default_admin_password() -> String {
    "Pa$$w0rd1975".to_string()
}

fn default_storage_mb() -> i64 {
    51200
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

fn default_resource_manager() -> String {
    DEFAULT_RESOURCE_MANAGER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_sample_values() {
        let config = ProvisionConfig::default();
        assert_eq!(config.resource_group, "postgresql-sample");
        assert_eq!(config.location, "westus");
        assert!(!config.keep_resource_group);
        assert_eq!(config.server.administrator_login, "notadmin");
        assert_eq!(config.server.storage_mb, 51200);
        assert_eq!(config.polling.interval(), Duration::from_secs(10));
        assert_eq!(config.endpoints.authority_host, DEFAULT_AUTHORITY_HOST);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let content = r#"
resource_group = "my-group"

[server]
name = "my-server"
storage_mb = 102400
"#;
        let config: ProvisionConfig = toml::from_str(content).unwrap();
        assert_eq!(config.resource_group, "my-group");
        assert_eq!(config.location, "westus");
        assert_eq!(config.server.name, "my-server");
        assert_eq!(config.server.storage_mb, 102400);
        assert_eq!(config.server.administrator_login, "notadmin");
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_endpoint_overrides() {
        let env = HashMap::from([
            (AUTHORITY_HOST_VAR, "http://127.0.0.1:9000/".to_string()),
            (RESOURCE_MANAGER_URL_VAR, "  ".to_string()),
        ]);
        let mut endpoints = Endpoints::default();
        endpoints.apply_overrides(|k| env.get(k).cloned());

        assert_eq!(endpoints.authority_host, "http://127.0.0.1:9000/");
        assert_eq!(endpoints.resource_manager, DEFAULT_RESOURCE_MANAGER);
        assert_eq!(
            endpoints.authority_url().unwrap().as_str(),
            "http://127.0.0.1:9000/"
        );
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let mut config = ProvisionConfig::default();
        assert!(config.validate().is_ok());

        config.polling.interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid setting polling.interval_ms: must be at least 1"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let endpoints = Endpoints {
            authority_host: "not a url".to_string(),
            resource_manager: DEFAULT_RESOURCE_MANAGER.to_string(),
        };
        let err = endpoints.authority_url().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion_with_defaults() {
        unsafe {
            std::env::set_var("PGPROVISION_TEST_GROUP", "expanded-group");
        }

        let content = r#"
resource_group = "${PGPROVISION_TEST_GROUP}"
location = "${PGPROVISION_TEST_UNSET_LOCATION:-eastus}"
"#;
        let expanded = ProvisionConfig::expand_env_vars(content);
        let config: ProvisionConfig = toml::from_str(&expanded).unwrap();
        assert_eq!(config.resource_group, "expanded-group");
        assert_eq!(config.location, "eastus");

        unsafe {
            std::env::remove_var("PGPROVISION_TEST_GROUP");
        }
    }
}
