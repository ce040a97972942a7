//! Gmail API client with bounded concurrency and retry logic

use async_trait::async_trait;
use google_gmail1::api::{Label, Message, MessagePart, ModifyMessageRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::auth::GmailHub;
use crate::error::{CleanerError, Result};
use crate::models::{MessageDetail, MessagePage, MessagePayload};

const MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";
const LABELS_SCOPE: &str = "https://www.googleapis.com/auth/gmail.labels";

/// Label info returned from Gmail API
#[derive(Debug, Clone)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
}

/// Mailbox operations the cleaner needs; mocked in tests
#[async_trait]
pub trait GmailClient: Send + Sync {
    /// List one page of message IDs, newest first
    async fn list_messages(
        &self,
        page_token: Option<String>,
        max_results: u32,
    ) -> Result<MessagePage>;

    /// Get a full message including headers and body parts
    async fn get_message(&self, id: &str) -> Result<MessageDetail>;

    /// List all labels in the account
    async fn list_labels(&self) -> Result<Vec<LabelInfo>>;

    /// Create a new label, returning its ID
    async fn create_label(&self, name: &str) -> Result<String>;

    /// Apply a label to a message
    async fn apply_label(&self, message_id: &str, label_id: &str) -> Result<()>;

    /// Move a message to the trash
    async fn trash_message(&self, message_id: &str) -> Result<()>;
}

/// Production Gmail client
///
/// - Every API call, read or write, waits for a semaphore permit
/// - Exponential backoff on transient failures
pub struct ProductionGmailClient {
    hub: GmailHub,
    rate_limiter: Arc<Semaphore>,
}

impl ProductionGmailClient {
    /// Create a new production Gmail client
    ///
    /// # Arguments
    /// * `hub` - Gmail API hub instance
    /// * `max_concurrent` - Maximum concurrent requests
    pub fn new(hub: GmailHub, max_concurrent: usize) -> Self {
        Self {
            hub,
            rate_limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Check if an error is retryable
    fn should_retry(error: &CleanerError) -> bool {
        error.is_transient()
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(operation_name: &str, max_retries: u32, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_millis(500);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    let wait = match &e {
                        CleanerError::RateLimitExceeded { retry_after } => {
                            Duration::from_secs(*retry_after).max(delay)
                        }
                        _ => delay,
                    };
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Email address of the authenticated account
    pub async fn account_email(&self) -> Result<String> {
        let (_, profile) = self
            .hub
            .users()
            .get_profile("me")
            .add_scope(MODIFY_SCOPE)
            .doit()
            .await?;

        Ok(profile.email_address.unwrap_or_default())
    }

    /// Retry `operation`, holding one of the client's permits per attempt
    async fn bounded<T, F, Fut>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        with_permit(&self.rate_limiter, operation_name, operation).await
    }
}

/// Run `operation` with retries; every attempt waits for a permit from
/// `limiter`, backoff sleeps do not hold one
async fn with_permit<T, F, Fut>(limiter: &Semaphore, operation_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    ProductionGmailClient::with_retry(operation_name, 3, || {
        let attempt = operation();
        async move {
            let _permit = limiter.acquire().await.map_err(|e| {
                CleanerError::Unknown(format!("Failed to acquire rate limit permit: {}", e))
            })?;
            attempt.await
        }
    })
    .await
}

/// Convert a Gmail API message into the provider-neutral detail record
fn convert_message(msg: Message) -> Result<MessageDetail> {
    let id = msg
        .id
        .ok_or_else(|| CleanerError::InvalidMessageFormat("Missing message ID".to_string()))?;

    let headers = msg
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_ref())
        .map(|headers| {
            headers
                .iter()
                .filter_map(|h| match (&h.name, &h.value) {
                    (Some(name), Some(value)) => Some((name.clone(), value.clone())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(MessageDetail {
        id,
        thread_id: msg.thread_id.unwrap_or_default(),
        label_ids: msg.label_ids.unwrap_or_default(),
        snippet: msg.snippet.unwrap_or_default(),
        internal_date: msg.internal_date,
        headers,
        payload: msg.payload.map(convert_part),
    })
}

fn convert_part(part: MessagePart) -> MessagePayload {
    MessagePayload {
        mime_type: part.mime_type,
        body: part.body.and_then(|b| b.data).filter(|data| !data.is_empty()),
        parts: part
            .parts
            .unwrap_or_default()
            .into_iter()
            .map(convert_part)
            .collect(),
    }
}

#[async_trait]
impl GmailClient for ProductionGmailClient {
    async fn list_messages(
        &self,
        page_token: Option<String>,
        max_results: u32,
    ) -> Result<MessagePage> {
        self.bounded("list_messages", || async {
            let mut call = self.hub.users().messages_list("me").max_results(max_results);
            if let Some(token) = page_token.as_deref() {
                call = call.page_token(token);
            }

            let (_, response) = call.add_scope(MODIFY_SCOPE).doit().await?;

            let ids: Vec<String> = response
                .messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|m| m.id)
                .collect();

            debug!("Listed {} message IDs", ids.len());
            Ok(MessagePage {
                ids,
                next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
            })
        })
        .await
    }

    async fn get_message(&self, id: &str) -> Result<MessageDetail> {
        self.bounded("get_message", || async {
            let (_, msg) = self
                .hub
                .users()
                .messages_get("me", id)
                .format("full")
                .add_scope(MODIFY_SCOPE)
                .doit()
                .await?;

            convert_message(msg)
        })
        .await
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        self.bounded("list_labels", || async {
            // Guard against indefinite hangs
            let timeout_duration = Duration::from_secs(30);
            let api_call = self
                .hub
                .users()
                .labels_list("me")
                .add_scope(LABELS_SCOPE)
                .doit();

            let (_, response) = match tokio::time::timeout(timeout_duration, api_call).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("Gmail API list_labels call timed out after {:?}", timeout_duration);
                    return Err(CleanerError::NetworkError(format!(
                        "API call timed out after {:?}",
                        timeout_duration
                    )));
                }
            };

            Ok(response
                .labels
                .unwrap_or_default()
                .into_iter()
                .filter_map(|label| match (label.id, label.name) {
                    (Some(id), Some(name)) => Some(LabelInfo { id, name }),
                    _ => None,
                })
                .collect())
        })
        .await
    }

    async fn create_label(&self, name: &str) -> Result<String> {
        self.bounded("create_label", || async {
            let label = Label {
                name: Some(name.to_string()),
                message_list_visibility: Some("show".to_string()),
                label_list_visibility: Some("labelShow".to_string()),
                ..Default::default()
            };

            let (_, created_label) = self
                .hub
                .users()
                .labels_create(label, "me")
                .add_scope(LABELS_SCOPE)
                .doit()
                .await?;

            created_label
                .id
                .ok_or_else(|| CleanerError::LabelError("Created label has no ID".to_string()))
        })
        .await
    }

    async fn apply_label(&self, message_id: &str, label_id: &str) -> Result<()> {
        self.bounded("apply_label", || async {
            let modify_request = ModifyMessageRequest {
                add_label_ids: Some(vec![label_id.to_string()]),
                remove_label_ids: None,
            };

            self.hub
                .users()
                .messages_modify(modify_request, "me", message_id)
                .add_scope(MODIFY_SCOPE)
                .doit()
                .await?;
            Ok(())
        })
        .await
    }

    async fn trash_message(&self, message_id: &str) -> Result<()> {
        self.bounded("trash_message", || async {
            self.hub
                .users()
                .messages_trash("me", message_id)
                .add_scope(MODIFY_SCOPE)
                .doit()
                .await?;
            Ok(())
        })
        .await
    }
}

// Shared clients (production or mocked) can be handed out as boxes
#[async_trait]
impl<T: GmailClient + ?Sized> GmailClient for Arc<T> {
    async fn list_messages(
        &self,
        page_token: Option<String>,
        max_results: u32,
    ) -> Result<MessagePage> {
        self.as_ref().list_messages(page_token, max_results).await
    }

    async fn get_message(&self, id: &str) -> Result<MessageDetail> {
        self.as_ref().get_message(id).await
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        self.as_ref().list_labels().await
    }

    async fn create_label(&self, name: &str) -> Result<String> {
        self.as_ref().create_label(name).await
    }

    async fn apply_label(&self, message_id: &str, label_id: &str) -> Result<()> {
        self.as_ref().apply_label(message_id, label_id).await
    }

    async fn trash_message(&self, message_id: &str) -> Result<()> {
        self.as_ref().trash_message(message_id).await
    }
}
