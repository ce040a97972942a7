//! Terminal prompts for the batch pipeline

use inquire::validator::Validation;
use inquire::{Confirm, CustomType, InquireError, Select};

use crate::error::{CleanerError, Result};
use crate::models::{Answer, Mode, Question};

pub const MIN_BATCHES: u32 = 1;
pub const MAX_BATCHES: u32 = 100;
pub const DEFAULT_BATCHES: u32 = 1;

/// User interaction points of a run
///
/// Calls block until the user answers; cancelling (Esc / Ctrl-C) surfaces as
/// [`CleanerError::OperationCancelled`].
pub trait Prompter: Send + Sync {
    /// Mode for the whole run
    fn choose_mode(&self) -> Result<Mode>;

    /// How many batches to process, in `MIN_BATCHES..=MAX_BATCHES`
    fn batch_count(&self) -> Result<u32>;

    /// Ask what to do with one message
    fn ask(&self, question: Question) -> Result<Answer>;

    /// Whether to go on with the next batch
    fn confirm_continue(&self) -> Result<bool>;
}

/// `inquire`-backed prompter
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn choose_mode(&self) -> Result<Mode> {
        Select::new("Select processing mode:", Mode::ALL.to_vec())
            .with_starting_cursor(0)
            .prompt()
            .map_err(prompt_error)
    }

    fn batch_count(&self) -> Result<u32> {
        CustomType::<u32>::new("How many batches to process?")
            .with_default(DEFAULT_BATCHES)
            .with_help_message(&format!("{} to {}", MIN_BATCHES, MAX_BATCHES))
            .with_error_message("Please enter a whole number")
            .with_validator(|count: &u32| {
                Ok(match validate_batch_count(*count) {
                    Ok(()) => Validation::Valid,
                    Err(e) => Validation::Invalid(e.to_string().into()),
                })
            })
            .prompt()
            .map_err(prompt_error)
    }

    fn ask(&self, question: Question) -> Result<Answer> {
        let message = match question {
            Question::Advertisement => "Action:",
            Question::Important => "Delete this email anyway?",
        };

        Select::new(message, question.choices().to_vec())
            .with_starting_cursor(default_cursor(question))
            .prompt()
            .map_err(prompt_error)
    }

    fn confirm_continue(&self) -> Result<bool> {
        Confirm::new("Continue to next batch?")
            .with_default(true)
            .prompt()
            .map_err(prompt_error)
    }
}

pub fn validate_batch_count(count: u32) -> Result<()> {
    if (MIN_BATCHES..=MAX_BATCHES).contains(&count) {
        Ok(())
    } else {
        Err(CleanerError::ConfigError(format!(
            "Batch count must be between {} and {}",
            MIN_BATCHES, MAX_BATCHES
        )))
    }
}

/// Position of the default answer among the offered choices
fn default_cursor(question: Question) -> usize {
    let default = question.default_answer();
    question
        .choices()
        .iter()
        .position(|answer| *answer == default)
        .unwrap_or(0)
}

fn prompt_error(e: InquireError) -> CleanerError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            CleanerError::OperationCancelled("Prompt cancelled by user".to_string())
        }
        other => CleanerError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_batch_count() {
        assert!(validate_batch_count(1).is_ok());
        assert!(validate_batch_count(100).is_ok());
        assert!(validate_batch_count(0).is_err());
        assert!(validate_batch_count(101).is_err());
    }

    #[test]
    fn test_default_cursor_points_at_default_answer() {
        let ad = Question::Advertisement;
        assert_eq!(ad.choices()[default_cursor(ad)], Answer::Skip);

        let important = Question::Important;
        assert_eq!(important.choices()[default_cursor(important)], Answer::Keep);
    }

    #[test]
    fn test_cancellation_maps_to_operation_cancelled() {
        assert!(matches!(
            prompt_error(InquireError::OperationCanceled),
            CleanerError::OperationCancelled(_)
        ));
        assert!(matches!(
            prompt_error(InquireError::OperationInterrupted),
            CleanerError::OperationCancelled(_)
        ));
        assert!(matches!(
            prompt_error(InquireError::NotTTY),
            CleanerError::IoError(_)
        ));
    }

    #[test]
    fn test_mode_choices_start_with_interactive() {
        assert_eq!(Mode::ALL[0], Mode::Interactive);
    }
}
