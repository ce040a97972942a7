//! Classifier prompt construction

use crate::models::EmailMessage;

const NO_BODY: &str = "(No body available)";

const KEEP_CATEGORIES: &[&str] = &[
    "Receipts and order confirmations",
    "Account management emails",
    "Bills and payment notifications",
    "Official documents",
    "Personal communications",
    "Work-related communications",
    "Emails containing important information or time-sensitive notifications",
];

const DELETE_CATEGORIES: &[&str] = &[
    "Marketing promotions",
    "Newsletters that don't contain important information",
    "Sales announcements",
    "Product recommendations",
    "Marketing from companies you've purchased from before",
    "Promotions and deals",
];

/// Build the prompt asking the model to classify one message
pub fn build_prompt(email: &EmailMessage) -> String {
    let body = if email.body.trim().is_empty() {
        NO_BODY
    } else {
        email.body.as_str()
    };

    let mut prompt = String::with_capacity(1024 + body.len());
    prompt.push_str(
        "You are a helpful email assistant tasked with identifying advertisement emails.\n\n",
    );

    prompt.push_str("Email Details:\n");
    prompt.push_str(&format!("From: {}\n", email.from));
    prompt.push_str(&format!("Subject: {}\n", email.subject));
    prompt.push_str(&format!("Date: {}\n", email.date.to_rfc3339()));
    prompt.push_str(&format!("Preview: {}\n", email.snippet));
    prompt.push_str(&format!("Body: {}\n\n", body));

    prompt.push_str(
        "Your task is to analyze this email and determine if it's an advertisement that can be \
         deleted or if it's an important email that should be kept.\n\n",
    );

    prompt.push_str("Important emails that should be KEPT include:\n");
    for category in KEEP_CATEGORIES {
        prompt.push_str(&format!("- {}\n", category));
    }

    prompt.push_str("\nAdvertisements that can be DELETED include:\n");
    for category in DELETE_CATEGORIES {
        prompt.push_str(&format!("- {}\n", category));
    }

    prompt.push_str(
        "\nPlease classify this email and respond in the following JSON format only:\n\
         {\n  \"isAdvertisement\": true/false,\n  \"confidence\": <number between 0 and 1>,\n  \
         \"reasoning\": \"<brief explanation of your decision>\"\n}",
    );

    prompt
}
