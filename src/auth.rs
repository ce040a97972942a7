//! OAuth2 authentication for the Gmail API

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use yup_oauth2::ApplicationSecret;

use crate::config::GmailConfig;
use crate::error::{CleanerError, Result};

/// Gmail API scopes the cleaner needs
///
/// - gmail.modify: read messages, apply labels, move to trash
/// - gmail.labels: create the advertisement label
pub const REQUIRED_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.labels",
];

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub = Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Build an application secret from configured client credentials
///
/// Returns `None` when the client id or secret is missing.
pub fn secret_from_config(config: &GmailConfig) -> Option<ApplicationSecret> {
    if !config.has_client_credentials() {
        return None;
    }

    Some(ApplicationSecret {
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        auth_uri: AUTH_URI.to_string(),
        token_uri: TOKEN_URI.to_string(),
        redirect_uris: vec![config.redirect_uri.clone()],
        ..Default::default()
    })
}

/// Resolve OAuth2 client credentials
///
/// Configured client id/secret take precedence; otherwise the Google
/// `credentials.json` download at `credentials_path` is read.
pub async fn load_application_secret(
    config: &GmailConfig,
    credentials_path: &Path,
) -> Result<ApplicationSecret> {
    if let Some(secret) = secret_from_config(config) {
        debug!("Using OAuth2 client credentials from configuration");
        return Ok(secret);
    }

    if !credentials_path.exists() {
        return Err(CleanerError::ConfigError(format!(
            "No OAuth2 client credentials: set CLIENT_ID and CLIENT_SECRET or provide {}",
            credentials_path.display()
        )));
    }

    yup_oauth2::read_application_secret(credentials_path)
        .await
        .map_err(|e| CleanerError::AuthError(format!("Failed to read credentials: {}", e)))
}

/// Initialize Gmail API hub with OAuth2 authentication
///
/// Opens a browser for consent when no valid token is cached; tokens are
/// persisted to `token_cache_path` and refreshed automatically.
pub async fn initialize_gmail_hub(
    secret: ApplicationSecret,
    token_cache_path: &Path,
) -> Result<GmailHub> {
    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| CleanerError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Obtain the token up front so the cached token carries every scope
    let _token = auth
        .token(REQUIRED_SCOPES)
        .await
        .map_err(|e| CleanerError::AuthError(format!("Failed to obtain token: {}", e)))?;

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| CleanerError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// The on-disk OAuth token cache
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the cached token set, `None` when nothing is cached yet
    pub async fn load(&self) -> Result<Option<serde_json::Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let tokens = serde_json::from_str(&content).map_err(|e| {
                    CleanerError::AuthError(format!(
                        "Token cache {} is corrupt ({}); run `auth --reset`",
                        self.path.display(),
                        e
                    ))
                })?;
                Ok(Some(tokens))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the cached token so the next run asks for consent again.
    /// Returns whether a token was present.
    pub async fn delete(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed cached token at {:?}", self.path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Restrict the token file to its owner
    #[cfg(unix)]
    pub async fn secure(&self) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = tokio::fs::metadata(&self.path).await?.permissions();
        perms.set_mode(0o600);
        tokio::fs::set_permissions(&self.path, perms).await?;
        Ok(())
    }

    /// Windows relies on the profile directory ACLs
    #[cfg(windows)]
    pub async fn secure(&self) -> Result<()> {
        Ok(())
    }
}
