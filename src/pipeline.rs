//! Batch classification and decision pipeline
//!
//! Pages through the mailbox one batch at a time, classifies every message,
//! applies the decision policy and carries out the resulting mailbox
//! mutations. Messages are handled strictly one after another; only the
//! detail fetches inside a batch run concurrently (see [`MailboxScanner`]).

use std::sync::Arc;
use tracing::{debug, info};

use crate::classifier::EmailClassifier;
use crate::cli::{truncate_string, ProgressReporter};
use crate::client::GmailClient;
use crate::config::Config;
use crate::error::Result;
use crate::interactive::Prompter;
use crate::label_manager::LabelManager;
use crate::models::{Action, EmailMessage, Mode, Verdict};
use crate::policy::{decide, resolve_answer};
use crate::scanner::MailboxScanner;
use crate::state::{PipelinePhase, RunState, RunSummary};

pub const NO_MORE_EMAILS: &str = "No more emails to process.";

const SUBJECT_DISPLAY_CHARS: usize = 50;
const SENDER_DISPLAY_CHARS: usize = 30;

/// Knobs the pipeline takes from configuration
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub confidence_threshold: f64,
    pub advertisement_label: String,
    pub batch_size: u32,
    pub concurrent_fetches: usize,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            confidence_threshold: config.processing.confidence_threshold,
            advertisement_label: config.labels.advertisement.clone(),
            batch_size: config.processing.batch_size,
            concurrent_fetches: config.gmail.max_concurrent_requests,
        }
    }
}

pub struct BatchPipeline {
    client: Arc<dyn GmailClient>,
    scanner: MailboxScanner,
    labels: LabelManager,
    classifier: EmailClassifier,
    prompter: Box<dyn Prompter>,
    settings: PipelineSettings,
    reporter: ProgressReporter,
}

impl BatchPipeline {
    pub fn new(
        client: Arc<dyn GmailClient>,
        classifier: EmailClassifier,
        prompter: Box<dyn Prompter>,
        config: &Config,
    ) -> Self {
        Self::with_settings(client, classifier, prompter, PipelineSettings::from(config))
    }

    pub fn with_settings(
        client: Arc<dyn GmailClient>,
        classifier: EmailClassifier,
        prompter: Box<dyn Prompter>,
        settings: PipelineSettings,
    ) -> Self {
        let scanner = MailboxScanner::new(Box::new(Arc::clone(&client)), settings.batch_size)
            .with_concurrency(settings.concurrent_fetches);
        let labels = LabelManager::new(Box::new(Arc::clone(&client)));

        Self {
            client,
            scanner,
            labels,
            classifier,
            prompter,
            settings,
            reporter: ProgressReporter::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Process up to `batches` batches in `mode`
    ///
    /// Provider errors abort the run; classification problems never do.
    pub async fn run(&mut self, mode: Mode, batches: u32) -> Result<RunSummary> {
        let mut state = RunState::new();
        info!(
            "Run {} started: mode '{}', up to {} batch(es) of {}",
            state.run_id, mode, batches, self.settings.batch_size
        );

        let label_spinner = self.reporter.add_spinner("Preparing advertisement label...");
        let label_id = match self
            .labels
            .ensure_label(&self.settings.advertisement_label)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                label_spinner.finish_and_clear();
                return Err(e);
            }
        };
        self.reporter.finish_spinner(
            &label_spinner,
            &format!("Using label '{}'", self.settings.advertisement_label),
        );

        for batch_number in 1..=batches {
            state.set_phase(PipelinePhase::FetchingBatch);
            let spinner = self.reporter.add_spinner(&format!(
                "Fetching batch {}/{}...",
                batch_number, batches
            ));
            let batch = self.scanner.next_batch(state.cursor.as_deref()).await;
            spinner.finish_and_clear();
            let batch = batch?;

            if batch.is_empty() {
                self.reporter.println(NO_MORE_EMAILS);
                state.has_more = false;
                break;
            }

            self.reporter.println(&format!(
                "\nBatch {}/{}: {} emails",
                batch_number,
                batches,
                batch.messages.len()
            ));

            for email in &batch.messages {
                self.process_message(email, mode, &label_id, &mut state)
                    .await?;
            }

            state.set_phase(PipelinePhase::AdvancingBatch);
            state.batches_processed += 1;
            state.cursor = batch.next_cursor;

            if state.cursor.is_none() {
                self.reporter.println(NO_MORE_EMAILS);
                state.has_more = false;
                break;
            }

            if !mode.is_interactive()
                && batch_number < batches
                && !self.prompter.confirm_continue()?
            {
                info!("Stopping after batch {} at user request", batch_number);
                break;
            }
        }

        state.set_phase(PipelinePhase::Done);
        let summary = state.summary();
        info!(
            "Run {} finished: {} processed, {} advertisements, {} kept",
            state.run_id, summary.processed, summary.advertisements, summary.kept
        );
        Ok(summary)
    }

    async fn process_message(
        &self,
        email: &EmailMessage,
        mode: Mode,
        label_id: &str,
        state: &mut RunState,
    ) -> Result<()> {
        self.reporter.println(&format!(
            "\nProcessing email: \"{}\" from {}",
            truncate_string(&email.subject, SUBJECT_DISPLAY_CHARS),
            truncate_string(&email.from, SENDER_DISPLAY_CHARS)
        ));

        if email.is_provider_promotion() {
            debug!("Skipping {}: already in the promotions category", email.id);
            self.reporter
                .println("  Skipped: already categorized as a promotion by Gmail");
            return Ok(());
        }

        state.set_phase(PipelinePhase::ClassifyingMessage);
        let spinner = self.reporter.add_spinner("Classifying...");
        let verdict = self.classifier.classify(email).await;
        spinner.finish_and_clear();

        let mut action = decide(&verdict, mode, self.settings.confidence_threshold);
        self.report_verdict(&verdict, action, mode);

        if action.labels_as_advertisement() {
            self.client.apply_label(&email.id, label_id).await?;
        }

        if let Action::AskUser(question) = action {
            state.set_phase(PipelinePhase::AwaitingUserDecision);
            let answer = self.prompter.ask(question)?;
            action = resolve_answer(question, answer);
            debug!("User answered {:?} for {}: {:?}", answer, email.id, action);
        }

        if action.moves_to_trash() {
            self.client.trash_message(&email.id).await?;
        }

        self.report_outcome(action, mode);
        state.record(action);
        Ok(())
    }

    fn report_verdict(&self, verdict: &Verdict, action: Action, mode: Mode) {
        if action.labels_as_advertisement() {
            self.reporter.println(&format!(
                "  ADVERTISEMENT (confidence: {:.2})",
                verdict.confidence
            ));
        } else if mode.is_interactive() {
            // Shown as confidence that the message is important
            self.reporter.println(&format!(
                "  IMPORTANT (confidence: {:.2})",
                1.0 - verdict.confidence
            ));
        } else {
            self.reporter.println("  IMPORTANT");
        }
        self.reporter
            .println(&format!("  Reasoning: {}", verdict.reasoning));
    }

    fn report_outcome(&self, action: Action, mode: Mode) {
        let line = match action {
            Action::ApplyAdLabelAndDelete | Action::DeleteDespiteImportant => "  Deleted",
            Action::ApplyAdLabelAndKeep => "  Kept",
            Action::ApplyAdLabelOnly if mode.is_interactive() => "  Skipped",
            Action::ApplyAdLabelOnly => "  Labeled",
            Action::KeepAsImportant => "  Kept",
            Action::AskUser(_) => return,
        };
        self.reporter.println(line);
    }
}
