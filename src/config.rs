//! TOML configuration.
//!
//! Every field has a default, so an empty document (or no file at all) is a valid
//! configuration.
//!
//! ```toml
//! [overlay]
//! channel_buffer = 32
//! evict_on_completion = true
//!
//! [persistence]
//! checkpoint_steps = true
//!
//! [store]
//! backend = "file"
//! path = "./data/orders"
//!
//! [analytics]
//! cache_ttl_secs = 60
//! bottleneck_limit = 5
//! ```

use crate::model::{CatalogError, OrderTypeSteps, StepCatalog};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Environment variable naming the config file read by [`TrackerConfig::from_env`].
pub const CONFIG_ENV: &str = "SUPPLY_TRACKER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Mailbox capacity of each batch tracker.
    pub channel_buffer: usize,
    /// Drop a batch from the overlay once its completion is durable.
    pub evict_on_completion: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 32,
            evict_on_completion: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Write the step log after every intermediate step, not only on completion.
    pub checkpoint_steps: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            checkpoint_steps: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory for the file backend.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Lifetime of a cached supplier snapshot; `0` disables caching.
    pub cache_ttl_secs: u64,
    pub bottleneck_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            bottleneck_limit: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub order_types: Vec<OrderTypeSteps>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub overlay: OverlayConfig,
    pub persistence: PersistenceConfig,
    pub store: StoreConfig,
    pub analytics: AnalyticsConfig,
    /// Replaces the built-in catalog when present.
    pub catalog: Option<CatalogConfig>,
}

impl TrackerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Loads the file named by `SUPPLY_TRACKER_CONFIG`, or returns defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.overlay.channel_buffer == 0 {
            return Err(ConfigError::Validation(
                "overlay.channel_buffer must be at least 1".into(),
            ));
        }
        if self.analytics.bottleneck_limit == 0 {
            return Err(ConfigError::Validation(
                "analytics.bottleneck_limit must be at least 1".into(),
            ));
        }
        if self.store.backend == StoreBackend::File && self.store.path.is_none() {
            return Err(ConfigError::Validation(
                "store.path is required for the file backend".into(),
            ));
        }
        self.step_catalog()?;
        Ok(())
    }

    /// The configured catalog, or the built-in one.
    pub fn step_catalog(&self) -> Result<StepCatalog, ConfigError> {
        match &self.catalog {
            Some(catalog) => Ok(StepCatalog::new(catalog.order_types.clone())?),
            None => Ok(StepCatalog::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = TrackerConfig::from_toml_str("").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.overlay.channel_buffer, 32);
        assert!(config.persistence.checkpoint_steps);
        assert_eq!(config.analytics.cache_ttl_secs, 60);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_custom_catalog() {
        let config = TrackerConfig::from_toml_str(
            r#"
            [analytics]
            bottleneck_limit = 3

            [[catalog.order_types]]
            name = "tea"

            [[catalog.order_types.steps]]
            name = "Picking"
            nominal_hours = 6.0
            tier = 2

            [[catalog.order_types.steps]]
            name = "Packing"
            nominal_hours = 2.5
            "#,
        )
        .unwrap();

        assert_eq!(config.analytics.bottleneck_limit, 3);
        let catalog = config.step_catalog().unwrap();
        let steps = catalog.steps("tea").unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].tier, 2);
        assert_eq!(steps[1].tier, 1);
        assert!(catalog.steps("coffee").is_none());
    }

    #[test]
    fn test_file_backend_requires_path() {
        let err = TrackerConfig::from_toml_str("[store]\nbackend = \"file\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_catalog_is_rejected() {
        let err = TrackerConfig::from_toml_str(
            "[[catalog.order_types]]\nname = \"tea\"\nsteps = []\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Catalog(CatalogError::NoSteps(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[overlay]\nchannel_buffer = 4\nevict_on_completion = false").unwrap();

        let config = TrackerConfig::load(file.path()).unwrap();
        assert_eq!(config.overlay.channel_buffer, 4);
        assert!(!config.overlay.evict_on_completion);
    }
}
