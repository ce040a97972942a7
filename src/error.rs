use std::time::Duration;
use thiserror::Error;

/// Type alias for Result with CleanerError
pub type Result<T> = std::result::Result<T, CleanerError>;

/// Error types for the mailbox cleaner
#[derive(Error, Debug)]
pub enum CleanerError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// User cancelled operation
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Invalid message format or parsing error
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// Label-related errors
    #[error("Label error: {0}")]
    LabelError(String),

    /// The local inference server could not be reached
    #[error("Language model unavailable: {0}. Make sure Ollama is running.")]
    ModelUnavailable(String),

    /// The model did not answer within the configured bound
    #[error("Language model timed out after {0:?}")]
    ModelTimeout(Duration),

    /// The inference server answered with an error status or a bad envelope
    #[error("Language model error: {0}")]
    ModelError(String),

    /// Model output could not be interpreted
    #[error("Parse error: {0}")]
    ParseError(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl CleanerError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CleanerError::RateLimitExceeded { .. }
                | CleanerError::ServerError { .. }
                | CleanerError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Errors the classification service absorbs into its safe default
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            CleanerError::ModelUnavailable(_)
                | CleanerError::ModelTimeout(_)
                | CleanerError::ModelError(_)
                | CleanerError::ParseError(_)
        )
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// The Retry-After header can be specified in two formats:
/// 1. Delay-seconds: An integer indicating seconds to wait (e.g., "120")
/// 2. HTTP-date: An HTTP date format (e.g., "Wed, 21 Oct 2015 07:28:00 GMT")
///
/// Returns the number of seconds to wait. If the header is missing or invalid,
/// returns a default of 5 seconds.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    let Some(value) = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
    else {
        return DEFAULT_RETRY_AFTER;
    };

    if let Ok(seconds) = value.parse::<u64>() {
        return seconds;
    }

    httpdate::parse_http_date(value)
        .ok()
        .and_then(|at| at.duration_since(std::time::SystemTime::now()).ok())
        .map(|remaining| remaining.as_secs())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

impl From<google_gmail1::Error> for CleanerError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    429 => CleanerError::RateLimitExceeded {
                        retry_after: parse_retry_after_header(response),
                    },
                    401 => CleanerError::AuthError(message),
                    404 => CleanerError::MessageNotFound("Resource not found".to_string()),
                    400 => CleanerError::BadRequest(message),
                    403 => CleanerError::Forbidden(message),
                    500..=599 => CleanerError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => CleanerError::ApiError(message),
                }
            }
            google_gmail1::Error::BadRequest(ref err) => CleanerError::BadRequest(format!("{}", err)),
            google_gmail1::Error::HttpError(ref err) => {
                CleanerError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => CleanerError::NetworkError(err.to_string()),
            _ => CleanerError::ApiError(error.to_string()),
        }
    }
}

impl From<reqwest::Error> for CleanerError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            CleanerError::ModelUnavailable(error.to_string())
        } else if error.is_decode() {
            CleanerError::ModelError(format!("Malformed response body: {}", error))
        } else if let Some(status) = error.status() {
            CleanerError::ModelError(format!("HTTP {}", status))
        } else {
            CleanerError::ModelError(error.to_string())
        }
    }
}
