//! Turns free-text language model output into a [`Verdict`]
//!
//! Model output is untrusted. Parsing goes through three tiers and always
//! ends with a well-typed verdict:
//!
//! 1. **Structured**: decode the outermost `{...}` span as JSON and accept it
//!    when `isAdvertisement`, `confidence` and `reasoning` have the right types.
//! 2. **Key scan**: look for an `isAdvertisement: true` assertion in any
//!    quoting/spacing variant. Runs whenever a JSON object decoded but lacked
//!    the verdict fields, and otherwise only if the text mentions
//!    `isAdvertisement` at all.
//! 3. **Keywords**: if the key scan has nothing to work with, look for
//!    advertising vocabulary in the text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{CleanerError, Result};
use crate::models::Verdict;

pub const MANUAL_PARSE_REASONING: &str = "Parsed manually from model output";
pub const KEYWORD_FALLBACK_REASONING: &str = "Fallback classification based on keywords";

/// Confidence reported when an advertisement was inferred without JSON
pub const INFERRED_AD_CONFIDENCE: f64 = 0.6;
/// Confidence reported when the text gave no sign of an advertisement
pub const INFERRED_KEEP_CONFIDENCE: f64 = 0.5;

const AD_KEYWORDS: &[&str] = &[
    "advertisement",
    "promotion",
    "marketing",
    "newsletter",
    "sale",
    "deal",
    "offer",
];

/// First `{` through last `}`
static JSON_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// `isAdvertisement": true`, `"isAdvertisement":true`, `isAdvertisement: true`, ...
static AD_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)isadvertisement['"]?\s*[:=]\s*['"]?true\b"#).unwrap()
});

/// Parse raw model output. Never fails.
pub fn parse_model_output(output: &str) -> Verdict {
    match structured_or_flag(output) {
        Ok(verdict) => verdict,
        Err(e) => {
            debug!("Falling back to keyword scan: {}", e);
            keyword_fallback(output)
        }
    }
}

/// Tiers 1 and 2. Errs when neither has anything to go on.
fn structured_or_flag(output: &str) -> Result<Verdict> {
    match extract_structured(output) {
        Structured::Verdict(verdict) => return Ok(verdict),
        Structured::Unusable => {}
        Structured::Absent => {
            if !output.to_lowercase().contains("isadvertisement") {
                return Err(CleanerError::ParseError(
                    "output neither contains a JSON object nor mentions isAdvertisement"
                        .to_string(),
                ));
            }
        }
    }

    let is_ad = AD_FLAG.is_match(output);
    Ok(Verdict::new(
        is_ad,
        if is_ad {
            INFERRED_AD_CONFIDENCE
        } else {
            INFERRED_KEEP_CONFIDENCE
        },
        MANUAL_PARSE_REASONING,
    ))
}

/// Outcome of tier 1
#[derive(Debug)]
enum Structured {
    Verdict(Verdict),
    /// An object decoded but its fields are missing or mistyped
    Unusable,
    /// Nothing decoded as JSON
    Absent,
}

/// Tier 1
fn extract_structured(output: &str) -> Structured {
    // The greedy span swallows everything between two separate objects;
    // the first balanced object is tried after it.
    let candidates = [
        JSON_SPAN.find(output).map(|m| m.as_str()),
        first_balanced_object(output),
    ];

    let mut decoded_any = false;
    for candidate in candidates.into_iter().flatten() {
        let Ok(value) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        decoded_any = true;
        if let Some(verdict) = verdict_from_value(&value) {
            return Structured::Verdict(verdict);
        }
    }

    if decoded_any {
        Structured::Unusable
    } else {
        Structured::Absent
    }
}

fn verdict_from_value(value: &Value) -> Option<Verdict> {
    let is_advertisement = value.get("isAdvertisement")?.as_bool()?;
    let confidence = value.get("confidence")?.as_f64()?;
    let reasoning = value.get("reasoning")?.as_str()?;

    Some(Verdict::new(is_advertisement, confidence, reasoning))
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Tier 3: advertising vocabulary anywhere in the text
pub fn keyword_fallback(output: &str) -> Verdict {
    let lower = output.to_lowercase();
    let is_ad = AD_KEYWORDS.iter().any(|keyword| lower.contains(keyword));

    Verdict::new(
        is_ad,
        if is_ad {
            INFERRED_AD_CONFIDENCE
        } else {
            INFERRED_KEEP_CONFIDENCE
        },
        KEYWORD_FALLBACK_REASONING,
    )
}
