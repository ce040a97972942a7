//! Advertisement label lookup and creation
use crate::client::GmailClient;
use crate::error::{CleanerError, Result};
use std::collections::HashMap;
use tracing::{debug, info};

/// Resolves label names to Gmail label IDs, creating labels on demand
pub struct LabelManager {
    client: Box<dyn GmailClient>,
    label_cache: HashMap<String, String>, // lowercase name -> id
    loaded: bool,
}

impl LabelManager {
    pub fn new(client: Box<dyn GmailClient>) -> Self {
        Self {
            client,
            label_cache: HashMap::new(),
            loaded: false,
        }
    }

    /// Loads all existing labels from Gmail into the cache
    /// Note: Cache keys are stored lowercase for case-insensitive lookups
    pub async fn load_existing_labels(&mut self) -> Result<usize> {
        let labels = self.client.list_labels().await?;
        let count = labels.len();

        for label in labels {
            self.label_cache.insert(label.name.to_lowercase(), label.id);
        }
        self.loaded = true;

        info!("Loaded {} existing labels into cache", count);
        Ok(count)
    }

    pub fn get_label_id(&self, name: &str) -> Option<String> {
        self.label_cache.get(&name.to_lowercase()).cloned()
    }

    /// Label ID for `name`, creating the label if the account lacks it
    pub async fn ensure_label(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CleanerError::LabelError(
                "Label name cannot be empty".to_string(),
            ));
        }

        if !self.loaded {
            self.load_existing_labels().await?;
        }

        if let Some(id) = self.get_label_id(name) {
            debug!("Reusing existing label '{}' ({})", name, id);
            return Ok(id);
        }

        info!("Creating label: {}", name);
        let label_id = self.client.create_label(name).await.map_err(|e| {
            CleanerError::LabelError(format!("Failed to create label '{}': {}", name, e))
        })?;

        self.label_cache.insert(name.to_lowercase(), label_id.clone());
        info!("Successfully created label '{}' with ID: {}", name, label_id);
        Ok(label_id)
    }
}
