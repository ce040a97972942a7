//! Common test utilities and fixtures
#![allow(dead_code)]

use gmail_ad_cleaner::client::{GmailClient, LabelInfo};
use gmail_ad_cleaner::error::Result;
use gmail_ad_cleaner::interactive::Prompter;
use gmail_ad_cleaner::llm::LanguageModel;
use gmail_ad_cleaner::models::{Answer, MessageDetail, MessagePage, MessagePayload, Mode, Question};
use gmail_ad_cleaner::pipeline::PipelineSettings;
use mockall::mock;
use serde_json::json;
use std::time::Duration;

pub const AD_LABEL: &str = "Advertisement";
pub const AD_LABEL_ID: &str = "Label_ad";

/// Create a full message with a plain-text body
pub fn create_test_detail(id: &str, from: &str, subject: &str) -> MessageDetail {
    MessageDetail {
        id: id.to_string(),
        thread_id: format!("thread_{}", id),
        label_ids: vec!["INBOX".to_string()],
        snippet: format!("Snippet of {}", subject),
        internal_date: Some(1_704_124_800_000),
        headers: vec![
            ("From".to_string(), from.to_string()),
            ("Subject".to_string(), subject.to_string()),
            ("Date".to_string(), "Mon, 1 Jan 2024 10:00:00 -0800".to_string()),
        ],
        payload: Some(MessagePayload {
            mime_type: Some("text/plain".to_string()),
            body: Some(format!("Body of {}", subject).into_bytes()),
            parts: vec![],
        }),
    }
}

/// A message Gmail already filed under Promotions
pub fn create_promotion_detail(id: &str, subject: &str) -> MessageDetail {
    let mut detail = create_test_detail(id, "deals@shop.example", subject);
    detail.label_ids.push("CATEGORY_PROMOTIONS".to_string());
    detail
}

pub fn create_page(ids: &[&str], next_page_token: Option<&str>) -> MessagePage {
    MessagePage {
        ids: ids.iter().map(|id| id.to_string()).collect(),
        next_page_token: next_page_token.map(str::to_string),
    }
}

/// Model output in the format the prompt asks for
pub fn verdict_json(is_advertisement: bool, confidence: f64, reasoning: &str) -> String {
    json!({
        "isAdvertisement": is_advertisement,
        "confidence": confidence,
        "reasoning": reasoning,
    })
    .to_string()
}

pub fn test_settings(confidence_threshold: f64) -> PipelineSettings {
    PipelineSettings {
        confidence_threshold,
        advertisement_label: AD_LABEL.to_string(),
        batch_size: 10,
        concurrent_fetches: 2,
    }
}

pub fn create_test_label_info(id: &str, name: &str) -> LabelInfo {
    LabelInfo {
        id: id.to_string(),
        name: name.to_string(),
    }
}

/// Account already has the advertisement label
pub fn expect_existing_ad_label(client: &mut MockGmailClient) {
    client.expect_list_labels().times(1).returning(|| {
        Ok(vec![
            create_test_label_info("INBOX", "INBOX"),
            create_test_label_info(AD_LABEL_ID, AD_LABEL),
        ])
    });
    client.expect_create_label().never();
}

/// Serve `details` by id from `get_message`
pub fn expect_messages(client: &mut MockGmailClient, details: Vec<MessageDetail>) {
    client.expect_get_message().returning(move |id| {
        details
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| gmail_ad_cleaner::CleanerError::MessageNotFound(id.to_string()))
    });
}

// Mock implementation of GmailClient for testing
mock! {
    pub GmailClient {}

    #[async_trait::async_trait]
    impl GmailClient for GmailClient {
        async fn list_messages(&self, page_token: Option<String>, max_results: u32) -> Result<MessagePage>;
        async fn get_message(&self, id: &str) -> Result<MessageDetail>;
        async fn list_labels(&self) -> Result<Vec<LabelInfo>>;
        async fn create_label(&self, name: &str) -> Result<String>;
        async fn apply_label(&self, message_id: &str, label_id: &str) -> Result<()>;
        async fn trash_message(&self, message_id: &str) -> Result<()>;
    }
}

mock! {
    pub LanguageModel {}

    #[async_trait::async_trait]
    impl LanguageModel for LanguageModel {
        async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String>;
    }
}

mock! {
    pub Prompter {}

    impl Prompter for Prompter {
        fn choose_mode(&self) -> Result<Mode>;
        fn batch_count(&self) -> Result<u32>;
        fn ask(&self, question: Question) -> Result<Answer>;
        fn confirm_continue(&self) -> Result<bool>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_detail() {
        let detail = create_test_detail("msg1", "test@example.com", "Test Subject");
        assert_eq!(detail.id, "msg1");
        assert_eq!(detail.header("from"), Some("test@example.com"));
        assert_eq!(detail.header("Subject"), Some("Test Subject"));
    }

    #[test]
    fn test_create_promotion_detail() {
        let detail = create_promotion_detail("msg1", "Sale");
        assert!(detail.label_ids.contains(&"CATEGORY_PROMOTIONS".to_string()));
    }

    #[test]
    fn test_verdict_json() {
        let value: serde_json::Value =
            serde_json::from_str(&verdict_json(true, 0.9, "promo")).unwrap();
        assert_eq!(value["isAdvertisement"], true);
        assert_eq!(value["reasoning"], "promo");
    }
}
