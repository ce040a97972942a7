use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CleanerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gmail: GmailConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub labels: LabelConfig,
}

/// OAuth client settings; empty id/secret means "use the credentials file"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl GmailConfig {
    pub fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_advertisement_label")]
    pub advertisement: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            advertisement: default_advertisement_label(),
        }
    }
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/oauth2callback".to_string()
}

fn default_max_concurrent() -> usize {
    10
}

fn default_batch_size() -> u32 {
    50
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_model_name() -> String {
    "gemma3".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_advertisement_label() -> String {
    "Advertisement".to_string()
}

impl Config {
    /// Load from a TOML file (defaults when missing), then apply environment overrides
    pub async fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| CleanerError::ConfigError(format!("Failed to read config file: {}", e)))?;

            let config: Self = toml::from_str(&content)
                .map_err(|e| CleanerError::ConfigError(format!("Failed to parse config file: {}", e)))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override file values with environment variables
    ///
    /// Recognised: `CLIENT_ID`, `CLIENT_SECRET`, `REDIRECT_URI`, `BATCH_SIZE`,
    /// `CONFIDENCE_THRESHOLD`, `MODEL_NAME`, `OLLAMA_URL`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CLIENT_ID") {
            self.gmail.client_id = v;
        }
        if let Some(v) = lookup("CLIENT_SECRET") {
            self.gmail.client_secret = v;
        }
        if let Some(v) = lookup("REDIRECT_URI") {
            self.gmail.redirect_uri = v;
        }
        if let Some(v) = lookup("BATCH_SIZE") {
            self.processing.batch_size = v.trim().parse().map_err(|_| {
                CleanerError::ConfigError(format!("BATCH_SIZE must be an integer, got '{}'", v))
            })?;
        }
        if let Some(v) = lookup("CONFIDENCE_THRESHOLD") {
            self.processing.confidence_threshold = v.trim().parse().map_err(|_| {
                CleanerError::ConfigError(format!(
                    "CONFIDENCE_THRESHOLD must be a number, got '{}'",
                    v
                ))
            })?;
        }
        if let Some(v) = lookup("MODEL_NAME") {
            self.model.name = v;
        }
        if let Some(v) = lookup("OLLAMA_URL") {
            self.model.endpoint = v;
        }
        Ok(())
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CleanerError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CleanerError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| CleanerError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.processing.batch_size == 0 {
            return Err(CleanerError::ConfigError(
                "processing.batch_size must be at least 1".to_string(),
            ));
        }
        // Gmail's messages.list page size cap
        if self.processing.batch_size > 500 {
            return Err(CleanerError::ConfigError(
                "processing.batch_size cannot exceed 500".to_string(),
            ));
        }

        let threshold = self.processing.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CleanerError::ConfigError(format!(
                "processing.confidence_threshold must be between 0 and 1, got {}",
                threshold
            )));
        }

        if self.gmail.max_concurrent_requests == 0 {
            return Err(CleanerError::ConfigError(
                "gmail.max_concurrent_requests must be at least 1".to_string(),
            ));
        }

        if self.model.name.trim().is_empty() {
            return Err(CleanerError::ConfigError(
                "model.name cannot be empty".to_string(),
            ));
        }
        if !(self.model.endpoint.starts_with("http://") || self.model.endpoint.starts_with("https://")) {
            return Err(CleanerError::ConfigError(format!(
                "model.endpoint must be an http(s) URL, got '{}'",
                self.model.endpoint
            )));
        }
        if self.model.timeout_secs == 0 {
            return Err(CleanerError::ConfigError(
                "model.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.labels.advertisement.trim().is_empty() {
            return Err(CleanerError::ConfigError(
                "labels.advertisement cannot be empty".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        Self::default().save(path).await
    }
}
