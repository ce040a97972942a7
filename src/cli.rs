//! Command-line interface

use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

use crate::auth::{self, TokenFile};
use crate::classifier::EmailClassifier;
use crate::client::{GmailClient, ProductionGmailClient};
use crate::config::Config;
use crate::error::Result;
use crate::interactive::{Prompter, TerminalPrompter};
use crate::llm::OllamaClient;
use crate::pipeline::BatchPipeline;
use crate::state::RunSummary;

#[derive(Parser, Debug)]
#[command(name = "gmail-ad-cleaner")]
#[command(version)]
#[command(about = "Classify Gmail messages as advertisements with a local LLM", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file (used when CLIENT_ID/CLIENT_SECRET are unset)
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = "token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with Gmail API
    Auth {
        /// Delete the cached token instead of authenticating
        #[arg(long)]
        reset: bool,
    },

    /// Classify mailbox messages batch by batch
    Run,

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

/// Progress reporter using indicatif
#[derive(Clone)]
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    /// When set, lines are collected here instead of printed
    captured: Option<Arc<Mutex<Vec<String>>>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_multi_progress(MultiProgress::new())
    }

    /// Share a MultiProgress with the log writer so log lines print above spinners
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        Self {
            multi,
            spinner_style,
            captured: None,
        }
    }

    /// Hidden spinners; printed lines are kept for [`Self::captured_lines`]
    pub fn capturing() -> Self {
        let mut reporter =
            Self::with_multi_progress(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()));
        reporter.captured = Some(Arc::new(Mutex::new(Vec::new())));
        reporter
    }

    /// Lines printed so far by a capturing reporter (shared between clones)
    pub fn captured_lines(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .and_then(|lines| lines.lock().ok().map(|lines| lines.clone()))
            .unwrap_or_default()
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        self.println(&format!("  ✓ {}", msg));
    }

    /// Print a line without tearing active spinners
    pub fn println(&self, msg: &str) {
        if let Some(lines) = &self.captured {
            if let Ok(mut lines) = lines.lock() {
                lines.push(msg.to_string());
            }
            return;
        }
        self.multi.suspend(|| println!("{}", msg));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// `run` command: authenticate, ask for mode and batch count, then process
pub async fn run_cleaner(cli: &Cli, multi: MultiProgress) -> Result<RunSummary> {
    let reporter = ProgressReporter::with_multi_progress(multi);

    let config_spinner = reporter.add_spinner("Loading configuration...");
    let config = Config::load(&cli.config).await;
    config_spinner.finish_and_clear();
    let config = config?;
    reporter.println(&format!(
        "  ✓ Configuration loaded (model: {}, threshold: {})",
        config.model.name, config.processing.confidence_threshold
    ));

    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let client = connect(cli, &config).await;
    auth_spinner.finish_and_clear();
    let client = client?;
    reporter.println("  ✓ Gmail API authenticated successfully");

    let prompter = TerminalPrompter::new();
    let mode = prompter.choose_mode()?;
    let batches = prompter.batch_count()?;
    info!("Selected mode '{}' for {} batch(es)", mode, batches);

    let model = OllamaClient::from_config(&config.model);
    let classifier = EmailClassifier::with_timeout(Box::new(model), config.model.timeout());

    let client: Arc<dyn GmailClient> = client;
    let mut pipeline = BatchPipeline::new(client, classifier, Box::new(prompter), &config)
        .with_reporter(reporter);

    pipeline.run(mode, batches).await
}

/// Build an authenticated Gmail client, running the consent flow if needed
pub async fn connect(cli: &Cli, config: &Config) -> Result<Arc<ProductionGmailClient>> {
    if let Some(parent) = cli.token_cache.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let secret = auth::load_application_secret(&config.gmail, &cli.credentials).await?;
    let hub = auth::initialize_gmail_hub(secret, &cli.token_cache).await?;

    let token = TokenFile::new(&cli.token_cache);
    if token.exists() {
        token.secure().await?;
    }

    Ok(Arc::new(ProductionGmailClient::new(
        hub,
        config.gmail.max_concurrent_requests,
    )))
}
