//! Gmail Advertisement Cleaner
//!
//! Pages through a Gmail mailbox, asks a locally hosted language model
//! (Ollama) whether each message is an advertisement, and labels, trashes or
//! keeps it depending on the chosen mode.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 installed-app flow with token caching
//! - **Scanning**: batch-wise mailbox paging with concurrent detail fetches
//! - **Classification**: prompt construction, model call and tolerant parsing
//!   of free-text model output into a [`Verdict`]
//! - **Policy**: pure mapping from verdict, mode and threshold to an [`Action`]
//! - **Pipeline**: drives the loop, user prompts and mailbox mutations
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use gmail_ad_cleaner::{auth, client::ProductionGmailClient, config::Config};
//! use gmail_ad_cleaner::{BatchPipeline, EmailClassifier, Mode, OllamaClient, TerminalPrompter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!
//!     let secret = auth::load_application_secret(&config.gmail, "credentials.json".as_ref()).await?;
//!     let hub = auth::initialize_gmail_hub(secret, "token.json".as_ref()).await?;
//!     let client = Arc::new(ProductionGmailClient::new(hub, config.gmail.max_concurrent_requests));
//!
//!     let classifier = EmailClassifier::new(Box::new(OllamaClient::from_config(&config.model)));
//!     let mut pipeline =
//!         BatchPipeline::new(client, classifier, Box::new(TerminalPrompter::new()), &config);
//!
//!     let summary = pipeline.run(Mode::AutoLabel, 1).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and token cache handling
//! - [`client`] - Gmail API client with retry logic
//! - [`scanner`] - Mailbox paging and body extraction
//! - [`label_manager`] - Advertisement label lookup and creation
//! - [`prompt`] - Classifier prompt construction
//! - [`llm`] - Language model transport (Ollama)
//! - [`parser`] - Model output parsing
//! - [`classifier`] - Email classification service
//! - [`policy`] - Decision policy
//! - [`pipeline`] - Batch pipeline
//! - [`interactive`] - Terminal prompts
//! - [`state`] - Run counters and phases
//! - [`cli`] - Command-line interface
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`models`] - Core data structures

pub mod auth;
pub mod classifier;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod interactive;
pub mod label_manager;
pub mod llm;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod policy;
pub mod prompt;
pub mod scanner;
pub mod state;

// Re-export commonly used types for convenience
pub use error::{CleanerError, Result};

// Core data models
pub use models::{Action, Answer, EmailMessage, Mode, Question, Verdict};

// Classification
pub use classifier::EmailClassifier;
pub use llm::{LanguageModel, OllamaClient};
pub use parser::{keyword_fallback, parse_model_output};

// Config types
pub use config::{Config, GmailConfig, LabelConfig, ModelConfig, ProcessingConfig};

// Client traits
pub use client::{GmailClient, ProductionGmailClient};

// Pipeline
pub use interactive::{Prompter, TerminalPrompter};
pub use pipeline::{BatchPipeline, PipelineSettings};
pub use policy::{decide, resolve_answer};
pub use scanner::{Batch, MailboxScanner};
pub use state::{PipelinePhase, RunState, RunSummary};

// CLI types (for binary usage)
pub use cli::{Cli, Commands, ProgressReporter};
