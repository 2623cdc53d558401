//! Studio configuration
//!
//! Loaded from TOML. Every section and field has a default, so an empty file
//! is a valid configuration.
//!
//! ```toml
//! [retry]
//! max_attempts = 5
//! timeout_ms = 90000
//!
//! [diagnostics]
//! store_dir = "/var/lib/studio"
//!
//! [webhooks]
//! treatment_url = "https://n8n.example.com/webhook/treatment"
//!
//! [logging]
//! level = "debug"
//! json = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use studio_chroma::{ChromaConfig, ChromaError, ChromaKeyParams};
use studio_diagnostics::DiagnosticsConfig;
use studio_retry::RetryConfig;
use studio_webhook::{WebhookError, WebhooksConfig};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid `[retry]` section
    #[error("[retry] {0}")]
    Retry(#[from] studio_retry::ConfigError),

    /// Invalid `[diagnostics]` section
    #[error("[diagnostics] {0}")]
    Diagnostics(String),

    /// Invalid `[chroma]` section
    #[error("[chroma] {0}")]
    Chroma(#[from] ChromaError),

    /// Invalid `[webhooks]` section
    #[error("[webhooks] {0}")]
    Webhooks(#[from] WebhookError),
}

/// `[diagnostics]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsSection {
    /// Directory for the durable error log; in-memory when absent
    pub store_dir: Option<PathBuf>,
    #[serde(flatten)]
    pub settings: DiagnosticsConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Full studio configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub retry: RetryConfig,
    pub diagnostics: DiagnosticsSection,
    pub chroma: ChromaConfig,
    pub webhooks: WebhooksConfig,
    pub logging: LoggingConfig,
}

impl StudioConfig {
    /// Load and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` for malformed TOML
    /// - any validation error from [`validate`](Self::validate)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Same as [`load`](Self::load), minus `Io`
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section
    ///
    /// # Errors
    /// The first invalid section, as a `ConfigError`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;

        let diagnostics = &self.diagnostics.settings;
        if diagnostics.ring_capacity == 0 {
            return Err(ConfigError::Diagnostics(
                "ring_capacity must be at least 1".to_string(),
            ));
        }
        if diagnostics.retention_hours <= 0 {
            return Err(ConfigError::Diagnostics(
                "retention_hours must be positive".to_string(),
            ));
        }

        ChromaKeyParams::new(self.chroma.key_color, self.chroma.tolerance)?;
        self.webhooks.validate()?;
        Ok(())
    }
}
