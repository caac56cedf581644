use crate::domain::{DiscoveryConfig, NodeRecord};
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - In-code config for tests and embedding
// ============================================================================

/// Static configuration provider.
///
/// Useful for tests and for hosts that build their config in code. For
/// config files, use `TomlConfigProvider`.
#[derive(Debug, Clone)]
pub struct StaticConfigProvider {
    bootstrap_nodes: Vec<NodeRecord>,
    config: DiscoveryConfig,
}

impl StaticConfigProvider {
    /// Create with default config and no bootstrap nodes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bootstrap_nodes: Vec::new(),
            config: DiscoveryConfig::default(),
        }
    }

    /// Use these bootstrap records.
    #[must_use]
    pub fn with_bootstrap_nodes(mut self, nodes: Vec<NodeRecord>) -> Self {
        self.bootstrap_nodes = nodes;
        self
    }

    /// Use this discovery config.
    #[must_use]
    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for StaticConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn get_bootstrap_nodes(&self) -> Vec<NodeRecord> {
        self.bootstrap_nodes.clone()
    }

    fn get_discovery_config(&self) -> DiscoveryConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - Config file loading (requires "network" feature)
// ============================================================================

#[cfg(feature = "network")]
mod toml_config {
    use super::*;
    use crate::domain::DiscoveryError;
    use serde::Deserialize;
    use std::fs;
    use std::path::Path;
    use thiserror::Error;

    /// Configuration file structure.
    #[derive(Debug, Deserialize)]
    struct ConfigFile {
        #[serde(default)]
        bootstrap: BootstrapConfig,
        #[serde(default)]
        discovery: DiscoveryConfig,
    }

    #[derive(Debug, Deserialize, Default)]
    struct BootstrapConfig {
        #[serde(default)]
        records: Vec<String>,
    }

    /// TOML-based configuration provider.
    ///
    /// # Config File Format
    ///
    /// Bootstrap records are hex-encoded signed node records. Missing
    /// discovery keys take their defaults.
    ///
    /// ```toml
    /// [bootstrap]
    /// records = ["0000000000000001021b84c5..."]
    ///
    /// [discovery]
    /// bucket_size = 16
    /// max_concurrent_queries = 3
    /// lookup_query_budget = 16
    /// session_timeout_secs = 86400
    /// request_timeout_millis = 1000
    /// ```
    #[derive(Debug)]
    pub struct TomlConfigProvider {
        bootstrap_nodes: Vec<NodeRecord>,
        config: DiscoveryConfig,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if the file cannot be read or parsed, a bootstrap
        /// record is invalid, or the config fails validation.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

            let bootstrap_nodes = file
                .bootstrap
                .records
                .iter()
                .enumerate()
                .map(|(index, encoded)| Self::parse_record(index, encoded))
                .collect::<Result<Vec<_>, _>>()?;

            file.discovery.validate()?;

            Ok(Self {
                bootstrap_nodes,
                config: file.discovery,
            })
        }

        fn parse_record(index: usize, encoded: &str) -> Result<NodeRecord, ConfigError> {
            let invalid = |reason: String| ConfigError::InvalidRecord { index, reason };
            let bytes = hex::decode(encoded.trim()).map_err(|e| invalid(e.to_string()))?;
            NodeRecord::decode(&bytes).map_err(|e| invalid(e.to_string()))
        }
    }

    impl ConfigProvider for TomlConfigProvider {
        fn get_bootstrap_nodes(&self) -> Vec<NodeRecord> {
            self.bootstrap_nodes.clone()
        }

        fn get_discovery_config(&self) -> DiscoveryConfig {
            self.config.clone()
        }
    }

    /// Errors that can occur during config loading.
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum ConfigError {
        /// File I/O error.
        #[error("failed to read {path}: {error}")]
        Io {
            /// Path of the file that failed to load.
            path: String,
            /// Error message from the I/O operation.
            error: String,
        },
        /// TOML parsing error.
        #[error("failed to parse config: {0}")]
        Parse(String),
        /// A bootstrap record did not decode or verify.
        #[error("bootstrap record {index} is invalid: {reason}")]
        InvalidRecord {
            /// Position in the `records` list.
            index: usize,
            /// Why it was rejected.
            reason: String,
        },
        /// Parsed values are out of range.
        #[error(transparent)]
        Invalid(#[from] DiscoveryError),
    }
}

#[cfg(feature = "network")]
pub use toml_config::{ConfigError, TomlConfigProvider};
