use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::models::Action;
use crate::policy::resolve_answer;

/// Where the batch pipeline currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelinePhase {
    Idle,
    FetchingBatch,
    ClassifyingMessage,
    AwaitingUserDecision,
    AdvancingBatch,
    Done,
}

/// Counters and cursor for one run; never persisted
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub phase: PipelinePhase,
    pub processed: usize,
    pub advertisements: usize,
    pub kept: usize,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub batches_processed: usize,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            phase: PipelinePhase::Idle,
            processed: 0,
            advertisements: 0,
            kept: 0,
            cursor: None,
            has_more: true,
            batches_processed: 0,
        }
    }

    pub fn set_phase(&mut self, phase: PipelinePhase) {
        if self.phase != phase {
            tracing::debug!("Pipeline phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Update counters for a resolved action
    ///
    /// `DeleteDespiteImportant` counts as an advertisement and not as kept:
    /// the message was first tallied as important, then reclassified by the
    /// user.
    pub fn record(&mut self, action: Action) {
        // Unresolved questions count as their default answer
        let action = match action {
            Action::AskUser(question) => resolve_answer(question, question.default_answer()),
            resolved => resolved,
        };

        match action {
            Action::ApplyAdLabelAndDelete | Action::ApplyAdLabelOnly => {
                self.advertisements += 1;
            }
            Action::ApplyAdLabelAndKeep => {
                self.advertisements += 1;
                self.kept += 1;
            }
            Action::KeepAsImportant => {
                self.kept += 1;
            }
            Action::DeleteDespiteImportant | Action::AskUser(_) => {
                self.advertisements += 1;
            }
        }
        self.processed += 1;
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            processed: self.processed,
            advertisements: self.advertisements,
            kept: self.kept,
            batches: self.batches_processed,
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Final counters reported after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub advertisements: usize,
    pub kept: usize,
    pub batches: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total emails processed: {}", self.processed)?;
        writeln!(f, "Advertisements found: {}", self.advertisements)?;
        write!(f, "Important emails kept: {}", self.kept)
    }
}
