use anyhow::Result;
use clap::Parser;
use gmail_ad_cleaner::auth::TokenFile;
use gmail_ad_cleaner::cli::{self, Cli, Commands};
use gmail_ad_cleaner::config::Config;
use gmail_ad_cleaner::error::CleanerError;
use indicatif::MultiProgress;
use std::io::Write;
use std::process;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// A writer that prints through MultiProgress to avoid progress bar conflicts
#[derive(Clone)]
struct MultiProgressWriter {
    multi: Arc<MultiProgress>,
    buffer: Arc<std::sync::Mutex<Vec<u8>>>,
}

impl MultiProgressWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self {
            multi,
            buffer: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        if !buffer.is_empty() {
            let msg = String::from_utf8_lossy(&buffer);
            let msg = msg.trim_end_matches('\n');
            if !msg.is_empty() {
                // Hidden when stderr is not a terminal; fall back to plain stderr
                if self.multi.is_hidden() {
                    eprintln!("{}", msg);
                } else {
                    let _ = self.multi.println(msg);
                }
            }
            buffer.clear();
        }
        Ok(())
    }
}

impl Drop for MultiProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter implementation for tracing
#[derive(Clone)]
struct MultiProgressMakeWriter {
    multi: Arc<MultiProgress>,
}

impl MultiProgressMakeWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self { multi }
    }
}

impl<'a> MakeWriter<'a> for MultiProgressMakeWriter {
    type Writer = MultiProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiProgressWriter::new(Arc::clone(&self.multi))
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Install default crypto provider for rustls
    // On non-Windows platforms, use aws-lc-rs; on Windows, use ring
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_ad_cleaner=debug,warn"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_ad_cleaner=info,warn"))
    };

    // Shared between log output and spinners so log lines print above progress
    let multi_progress = Arc::new(MultiProgress::new());
    let make_writer = MultiProgressMakeWriter::new(Arc::clone(&multi_progress));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match &cli.command {
        Commands::Auth { reset } => {
            let token = TokenFile::new(&cli.token_cache);

            if *reset {
                if token.delete().await? {
                    println!("Token deleted. Run `gmail-ad-cleaner auth` to authenticate again.");
                } else {
                    println!("No cached token found at {:?}", cli.token_cache);
                }
                return Ok(());
            }

            if token.load().await?.is_some() {
                tracing::info!("Found cached token at {:?}", cli.token_cache);
            }

            tracing::info!("Authenticating with Gmail API...");
            let config = Config::load(&cli.config).await?;
            let client = cli::connect(&cli, &config).await?;

            println!("Successfully authenticated with Gmail API");
            println!("Token cached at: {:?}", token.path());
            println!("Connected to account: {}", client.account_email().await?);

            Ok(())
        }

        Commands::Run => {
            tracing::debug!("Starting cleaner run");

            let summary = cli::run_cleaner(&cli, (*multi_progress).clone()).await?;

            println!("\n========================================");
            println!("Summary");
            println!("========================================");
            println!("{}", summary);
            println!("Batches processed: {}", summary.batches);
            println!("========================================");

            Ok(())
        }

        Commands::InitConfig { output, force } => {
            if output.exists() && !*force {
                return Err(CleanerError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(output).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nKey settings to review:");
            println!("  - processing.batch_size: Emails fetched per batch");
            println!("  - processing.confidence_threshold: Minimum confidence to treat an email as an advertisement");
            println!("  - model.name / model.endpoint: Ollama model and server");
            println!("  - labels.advertisement: Label applied to advertisements");
            println!("\nOAuth client credentials may also be set with CLIENT_ID and CLIENT_SECRET.");

            Ok(())
        }
    }
}

fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(err) = error.downcast_ref::<CleanerError>() {
        match err {
            CleanerError::AuthError(_) => {
                eprintln!("\nHint: Make sure your OAuth client credentials are valid.");
                eprintln!("      Set CLIENT_ID/CLIENT_SECRET or download credentials.json from Google Cloud Console.");
                eprintln!("      Try running: gmail-ad-cleaner auth --reset");
            }
            CleanerError::RateLimitExceeded { .. } => {
                eprintln!("\nHint: You've hit Gmail API rate limits.");
                eprintln!("      Wait a few seconds and try again.");
                eprintln!("      Consider reducing gmail.max_concurrent_requests in config.");
            }
            CleanerError::ApiError(_) | CleanerError::ServerError { .. } | CleanerError::NetworkError(_) => {
                eprintln!("\nHint: This may be a temporary API error.");
                eprintln!("      Try running the command again.");
            }
            CleanerError::ConfigError(_) => {
                eprintln!("\nHint: Check your configuration file for errors.");
                eprintln!("      Run: gmail-ad-cleaner init-config --force");
            }
            CleanerError::OperationCancelled(_) => {
                eprintln!("\nCancelled. Counters for this run were not saved.");
            }
            _ => {}
        }
    }
}
