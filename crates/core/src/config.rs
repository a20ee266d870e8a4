//! Server Configuration
//!
//! Settings for the build-server endpoint and for the local task
//! pipeline, stored as TOML.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

/// Archives at or above this size are refused before upload (5 MiB)
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 5 * 1024 * 1024;

/// Build server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildServerConfig {
    /// host[:port] of the build server
    pub host: String,
    /// host[:port] the build server should call back in production
    pub appengine_host: String,
    /// host[:port] used for callbacks outside production
    pub local_host: String,
    /// Whether this instance runs in production
    pub production: bool,
    /// Send the build-tool version string with each request
    pub send_git_version: bool,
    /// Version string sent as `gitBuildVersion`
    pub git_build_version: String,
    /// Key used to sign callback tokens
    pub callback_secret: String,
    /// Upload ceiling for project source archives
    pub max_archive_bytes: u64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BuildServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost:9990".to_string(),
            appengine_host: String::new(),
            local_host: "localhost:8888".to_string(),
            production: false,
            send_git_version: true,
            git_build_version: crate::VERSION.to_string(),
            callback_secret: "change-me".to_string(),
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            timeout_secs: 60,
        }
    }
}

impl BuildServerConfig {
    /// Host the build server should use to reach us
    pub fn callback_host(&self) -> &str {
        if self.production && !self.appengine_host.is_empty() {
            &self.appengine_host
        } else {
            &self.local_host
        }
    }
}

/// Local pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// targetSdkVersion written to every manifest
    pub target_sdk: u32,
    /// Lowest minSdkVersion ever emitted
    pub default_min_sdk: u32,
    /// Component metadata JSON; the built-in catalog is used when unset
    pub component_info: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_sdk: 34,
            default_min_sdk: 7,
            component_info: None,
        }
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub build_server: BuildServerConfig,
    pub pipeline: PipelineConfig,
}

impl ServerConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "aibuild", "aibuild").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| CoreError::Config("Cannot determine config path".into()))?;
        Self::load_from(&config_file).await
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {:?}", path);
            let contents = tokio::fs::read_to_string(path).await?;
            Self::from_toml_str(&contents)
        } else {
            info!("Config file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        debug!("Config saved to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.build_server.host.trim().is_empty() {
            return Err(CoreError::Config("build_server.host must not be empty".into()));
        }
        if self.build_server.max_archive_bytes == 0 {
            return Err(CoreError::Config("build_server.max_archive_bytes must be positive".into()));
        }
        if self.pipeline.default_min_sdk > self.pipeline.target_sdk {
            return Err(CoreError::Config(format!(
                "pipeline.default_min_sdk ({}) exceeds pipeline.target_sdk ({})",
                self.pipeline.default_min_sdk, self.pipeline.target_sdk
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.build_server.host, "localhost:9990");
        assert_eq!(config.build_server.max_archive_bytes, 5 * 1024 * 1024);
        assert_eq!(config.pipeline.target_sdk, 34);
        assert!(config.build_server.send_git_version);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml_str(
            "[build_server]\nhost = \"build.example.org:9990\"\n",
        )
        .unwrap();
        assert_eq!(config.build_server.host, "build.example.org:9990");
        assert_eq!(config.build_server.local_host, "localhost:8888");
        assert_eq!(config.pipeline.default_min_sdk, 7);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = ServerConfig::from_toml_str("[pipeline]\ndefault_min_sdk = 40\ntarget_sdk = 34\n")
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));

        assert!(ServerConfig::from_toml_str("[build_server]\nhost = 3\n").is_err());
    }

    #[test]
    fn test_callback_host() {
        let mut server = BuildServerConfig::default();
        assert_eq!(server.callback_host(), "localhost:8888");

        server.production = true;
        assert_eq!(server.callback_host(), "localhost:8888");

        server.appengine_host = "ai.example.org".into();
        assert_eq!(server.callback_host(), "ai.example.org");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ServerConfig::default();
        config.build_server.send_git_version = false;
        config.save_to(&path).await.unwrap();

        let loaded = ServerConfig::load_from(&path).await.unwrap();
        assert!(!loaded.build_server.send_git_version);

        let missing = ServerConfig::load_from(&dir.path().join("absent.toml")).await.unwrap();
        assert!(missing.build_server.send_git_version);
    }
}
