//! Language model transport (local Ollama server)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::{CleanerError, Result};

/// Anything that turns a prompt into raw text
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one prompt to completion, giving up after `timeout`
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for Ollama's `/api/generate` endpoint
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.endpoint.clone(), config.name.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }

    async fn send(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(self.generate_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CleanerError::ModelError(format!(
                "Ollama API error: {} {}",
                status,
                body.trim()
            )));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String> {
        debug!(
            "Sending {} character prompt to model '{}'",
            prompt.chars().count(),
            self.model
        );

        match tokio::time::timeout(timeout, self.send(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(CleanerError::ModelTimeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", "gemma3");
        assert_eq!(client.generate_url(), "http://localhost:11434/api/generate");
        assert_eq!(client.model(), "gemma3");
    }

    #[test]
    fn test_request_disables_streaming() {
        let request = GenerateRequest {
            model: "gemma3",
            prompt: "hi",
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["model"], "gemma3");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_model_unavailable() {
        // Port 9 (discard) is essentially never served locally
        let client = OllamaClient::new("http://127.0.0.1:9", "gemma3");
        let err = client
            .generate("hello", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_model_error(), "unexpected error: {:?}", err);
    }
}
