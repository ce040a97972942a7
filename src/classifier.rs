//! Email classification through a language model
//!
//! `classify` never fails: transport errors, timeouts and unusable output all
//! collapse into [`Verdict::safe_default`], which the decision policy always
//! treats as "important". A broken model can therefore never get mail deleted.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;
use crate::llm::LanguageModel;
use crate::models::{EmailMessage, Verdict};
use crate::parser::parse_model_output;
use crate::prompt::build_prompt;

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct EmailClassifier {
    model: Box<dyn LanguageModel>,
    timeout: Duration,
}

impl EmailClassifier {
    pub fn new(model: Box<dyn LanguageModel>) -> Self {
        Self::with_timeout(model, DEFAULT_MODEL_TIMEOUT)
    }

    pub fn with_timeout(model: Box<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Classify one message
    pub async fn classify(&self, email: &EmailMessage) -> Verdict {
        match self.try_classify(email).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Error classifying email {}: {}", email.id, e);
                Verdict::safe_default()
            }
        }
    }

    async fn try_classify(&self, email: &EmailMessage) -> Result<Verdict> {
        let prompt = build_prompt(email);
        let output = self.model.generate(&prompt, self.timeout).await?;
        let verdict = parse_model_output(&output);

        debug!(
            "Email {} classified: advertisement={} confidence={:.2}",
            email.id, verdict.is_advertisement, verdict.confidence
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CleanerError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Replays one canned result and records the prompt it was given
    struct ScriptedModel {
        reply: Mutex<Option<Result<String>>>,
        seen: Mutex<Vec<(String, Duration)>>,
    }

    impl ScriptedModel {
        fn replying(reply: Result<String>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String> {
            self.seen.lock().unwrap().push((prompt.to_string(), timeout));
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(CleanerError::Unknown("no reply scripted".into())))
        }
    }

    fn email() -> EmailMessage {
        EmailMessage {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            subject: "50% off everything".to_string(),
            snippet: "Today only".to_string(),
            from: "deals@store.example".to_string(),
            date: Utc::now(),
            labels: vec!["INBOX".to_string()],
            body: "Huge sale".to_string(),
        }
    }

    #[tokio::test]
    async fn test_classify_parses_model_output() {
        let classifier = EmailClassifier::new(Box::new(ScriptedModel::replying(Ok(
            r#"{"isAdvertisement": true, "confidence": 0.9, "reasoning": "Sale"}"#.to_string(),
        ))));

        let verdict = classifier.classify(&email()).await;
        assert_eq!(verdict, Verdict::new(true, 0.9, "Sale"));
    }

    #[tokio::test]
    async fn test_prompt_and_timeout_reach_model() {
        let model = std::sync::Arc::new(ScriptedModel::replying(Ok("{}".to_string())));

        struct Shared(std::sync::Arc<ScriptedModel>);
        #[async_trait]
        impl LanguageModel for Shared {
            async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String> {
                self.0.generate(prompt, timeout).await
            }
        }

        let classifier = EmailClassifier::with_timeout(
            Box::new(Shared(model.clone())),
            Duration::from_secs(5),
        );
        classifier.classify(&email()).await;

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("Subject: 50% off everything"));
        assert_eq!(seen[0].1, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout_yields_safe_default() {
        let classifier = EmailClassifier::new(Box::new(ScriptedModel::replying(Err(
            CleanerError::ModelTimeout(DEFAULT_MODEL_TIMEOUT),
        ))));

        let verdict = classifier.classify(&email()).await;
        assert_eq!(verdict, Verdict::safe_default());
    }

    #[tokio::test]
    async fn test_unavailable_model_yields_safe_default() {
        let classifier = EmailClassifier::new(Box::new(ScriptedModel::replying(Err(
            CleanerError::ModelUnavailable("connection refused".into()),
        ))));

        let verdict = classifier.classify(&email()).await;
        assert!(!verdict.is_advertisement);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.reasoning, "Error in classification process");
    }

    #[tokio::test]
    async fn test_garbage_output_still_produces_verdict() {
        let classifier = EmailClassifier::new(Box::new(ScriptedModel::replying(Ok(
            "¯\\_(ツ)_/¯".to_string(),
        ))));

        let verdict = classifier.classify(&email()).await;
        assert!(!verdict.is_advertisement);
        assert!((0.0..=1.0).contains(&verdict.confidence));
    }
}
