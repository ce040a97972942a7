use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CleanerError;

/// Gmail's own promotions category label
pub const PROMOTIONS_CATEGORY: &str = "CATEGORY_PROMOTIONS";

/// Reasoning attached to the verdict returned when classification fails
pub const CLASSIFICATION_ERROR_REASONING: &str = "Error in classification process";

/// A fetched message, reduced to what the classifier needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub snippet: String,
    pub from: String,
    pub date: DateTime<Utc>,
    pub labels: Vec<String>,
    /// Text body, already truncated to bound classifier input
    pub body: String,
}

impl EmailMessage {
    /// Whether the provider already filed this message under promotions
    pub fn is_provider_promotion(&self) -> bool {
        self.labels.iter().any(|l| l == PROMOTIONS_CATEGORY)
    }
}

/// Provider-neutral view of a full message as returned by the mail API
#[derive(Debug, Clone, Default)]
pub struct MessageDetail {
    pub id: String,
    pub thread_id: String,
    pub label_ids: Vec<String>,
    pub snippet: String,
    /// Milliseconds since the epoch, as reported by the provider
    pub internal_date: Option<i64>,
    pub headers: Vec<(String, String)>,
    pub payload: Option<MessagePayload>,
}

impl MessageDetail {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One MIME part of a message; body data is already base64-decoded
#[derive(Debug, Clone, Default)]
pub struct MessagePayload {
    pub mime_type: Option<String>,
    pub body: Option<Vec<u8>>,
    pub parts: Vec<MessagePayload>,
}

/// One page of message ids from the provider listing
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Structured classifier result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_advertisement: bool,
    pub confidence: f64,
    pub reasoning: String,
}

impl Verdict {
    pub fn new(is_advertisement: bool, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            is_advertisement,
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
        }
    }

    /// Always-important, zero-confidence verdict; never leads to deletion
    pub fn safe_default() -> Self {
        Self::new(false, 0.0, CLASSIFICATION_ERROR_REASONING)
    }
}

/// Force a confidence into [0, 1]; NaN becomes 0
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// How advertisement verdicts are acted upon for a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Interactive,
    AutoLabel,
    AutoDelete,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Interactive, Mode::AutoLabel, Mode::AutoDelete];

    pub fn is_interactive(&self) -> bool {
        matches!(self, Mode::Interactive)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Interactive => "1 = Interactive",
            Mode::AutoLabel => "2 = Auto-label only",
            Mode::AutoDelete => "3 = Auto-delete",
        };
        f.write_str(s)
    }
}

impl FromStr for Mode {
    type Err = CleanerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Mode::Interactive),
            "2" => Ok(Mode::AutoLabel),
            "3" => Ok(Mode::AutoDelete),
            other => Err(CleanerError::ConfigError(format!(
                "Invalid processing mode '{}'. Must be 1, 2 or 3",
                other
            ))),
        }
    }
}

/// Question put to the user in interactive mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
    /// delete / keep / skip, default skip
    Advertisement,
    /// delete / keep, default keep
    Important,
}

impl Question {
    pub fn choices(&self) -> &'static [Answer] {
        match self {
            Question::Advertisement => &[Answer::Delete, Answer::Keep, Answer::Skip],
            Question::Important => &[Answer::Delete, Answer::Keep],
        }
    }

    pub fn default_answer(&self) -> Answer {
        match self {
            Question::Advertisement => Answer::Skip,
            Question::Important => Answer::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Delete,
    Keep,
    Skip,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Answer::Delete => "d = delete",
            Answer::Keep => "k = keep",
            Answer::Skip => "s = skip",
        };
        f.write_str(s)
    }
}

/// What to do with one classified message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ApplyAdLabelAndDelete,
    ApplyAdLabelAndKeep,
    ApplyAdLabelOnly,
    KeepAsImportant,
    DeleteDespiteImportant,
    AskUser(Question),
}

impl Action {
    /// The advertisement label is applied before anything else happens
    pub fn labels_as_advertisement(&self) -> bool {
        matches!(
            self,
            Action::ApplyAdLabelAndDelete
                | Action::ApplyAdLabelAndKeep
                | Action::ApplyAdLabelOnly
                | Action::AskUser(Question::Advertisement)
        )
    }

    pub fn moves_to_trash(&self) -> bool {
        matches!(
            self,
            Action::ApplyAdLabelAndDelete | Action::DeleteDespiteImportant
        )
    }
}
