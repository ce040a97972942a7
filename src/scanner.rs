//! Mailbox paginator: turns listing pages into batches of classifiable messages

use chrono::{DateTime, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::client::GmailClient;
use crate::error::Result;
use crate::models::{EmailMessage, MessageDetail, MessagePayload};

/// Stop collecting body parts once this many characters are gathered
pub const BODY_ACCUMULATION_LIMIT: usize = 1000;
/// Hard cap on the body handed to the classifier
pub const BODY_MAX_CHARS: usize = 3000;

const DEFAULT_CONCURRENT_FETCHES: usize = 10;

/// One page of fetched messages
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub messages: Vec<EmailMessage>,
    /// `None` once the mailbox is exhausted
    pub next_cursor: Option<String>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Fetches batches of messages; the caller owns the cursor
pub struct MailboxScanner {
    client: Box<dyn GmailClient>,
    batch_size: u32,
    concurrent_fetches: usize,
}

impl MailboxScanner {
    pub fn new(client: Box<dyn GmailClient>, batch_size: u32) -> Self {
        Self {
            client,
            batch_size,
            concurrent_fetches: DEFAULT_CONCURRENT_FETCHES,
        }
    }

    pub fn with_concurrency(mut self, concurrent_fetches: usize) -> Self {
        self.concurrent_fetches = concurrent_fetches.max(1);
        self
    }

    /// Fetch the page starting at `cursor` (`None` for the first page)
    pub async fn next_batch(&self, cursor: Option<&str>) -> Result<Batch> {
        let page = self
            .client
            .list_messages(cursor.map(str::to_string), self.batch_size)
            .await?;

        if page.ids.is_empty() {
            debug!("Listing returned no message IDs");
            return Ok(Batch {
                messages: Vec::new(),
                next_cursor: page.next_page_token,
            });
        }

        info!(
            "Fetching {} messages with {} concurrent workers",
            page.ids.len(),
            self.concurrent_fetches
        );

        // `buffered` keeps listing order while fetching in parallel
        let details: Vec<Result<MessageDetail>> = stream::iter(page.ids)
            .map(|id| {
                let client = &self.client;
                async move {
                    debug!("Fetching message: {}", id);
                    client.get_message(&id).await
                }
            })
            .buffered(self.concurrent_fetches)
            .collect()
            .await;

        let messages = details
            .into_iter()
            .map(|detail| detail.map(to_email_message))
            .collect::<Result<Vec<_>>>()?;

        Ok(Batch {
            messages,
            next_cursor: page.next_page_token,
        })
    }
}

/// Reduce a provider message to what the classifier sees
pub fn to_email_message(detail: MessageDetail) -> EmailMessage {
    let subject = detail.header("Subject").unwrap_or_default().to_string();
    let from = detail.header("From").unwrap_or_default().to_string();
    let date = message_date(&detail);
    let body = detail
        .payload
        .as_ref()
        .map(extract_body)
        .unwrap_or_default();

    EmailMessage {
        id: detail.id,
        thread_id: detail.thread_id,
        subject,
        snippet: detail.snippet,
        from,
        date,
        labels: detail.label_ids,
        body,
    }
}

/// `internalDate`, then the `Date` header, then the epoch
fn message_date(detail: &MessageDetail) -> DateTime<Utc> {
    detail
        .internal_date
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .or_else(|| detail.header("Date").and_then(parse_email_date))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Parse email date header
pub fn parse_email_date(date_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}

/// Pull readable text out of a payload
///
/// A single-part body wins outright. Otherwise `text/plain` and `text/html`
/// parts are concatenated in order until more than
/// [`BODY_ACCUMULATION_LIMIT`] characters are gathered. The result is capped
/// at [`BODY_MAX_CHARS`] characters.
pub fn extract_body(payload: &MessagePayload) -> String {
    let text = match &payload.body {
        Some(data) => String::from_utf8_lossy(data).into_owned(),
        None => {
            let mut text = String::new();
            let mut chars = 0;
            for part in &payload.parts {
                if !is_text_part(part) {
                    continue;
                }
                if let Some(data) = &part.body {
                    let chunk = String::from_utf8_lossy(data);
                    chars += chunk.chars().count();
                    text.push_str(&chunk);
                    if chars > BODY_ACCUMULATION_LIMIT {
                        break;
                    }
                }
            }
            text
        }
    };

    truncate_chars(&text, BODY_MAX_CHARS)
}

fn is_text_part(part: &MessagePayload) -> bool {
    matches!(
        part.mime_type.as_deref(),
        Some("text/plain") | Some("text/html")
    )
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
