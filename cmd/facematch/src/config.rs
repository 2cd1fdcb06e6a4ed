//! CLI configuration.
//!
//! Stored in ~/.facematch/config.yaml. Service settings sit at the top
//! level next to the CLI-only keys:
//!
//! ```yaml
//! encoder_url: http://127.0.0.1:8500/encode
//! store_path: /var/lib/facematch/faces.redb
//! dimension: 128
//! threshold: 0.6
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use facematch_service::ServiceConfig;
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".facematch";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Default gallery filename.
pub const DEFAULT_STORE_FILE: &str = "faces.redb";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub service: ServiceConfig,

    /// Gallery database (default: ~/.facematch/faces.redb).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// Face encoder endpoint.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encoder_url: String,

    /// Encoder request timeout in seconds (0 = no timeout).
    #[serde(default)]
    pub timeout: u64,
}

impl CliConfig {
    /// Gets the default config directory.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR))
    }

    /// Loads the config from `path`, or from the default location.
    ///
    /// A missing default file yields the default config; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_dir() {
                Some(dir) => (dir.join(DEFAULT_CONFIG_FILE), false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                bail!("config file not found: {}", path.display());
            }
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&data).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(data)?;
        cfg.service.validate()?;
        Ok(cfg)
    }

    /// Resolves the gallery path.
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(p) => Ok(p.clone()),
            None => Self::default_dir()
                .map(|dir| dir.join(DEFAULT_STORE_FILE))
                .context("cannot determine home directory; set store_path"),
        }
    }
}
