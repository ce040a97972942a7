//! Decision policy: verdict + mode + threshold -> action
//!
//! Pure functions only; side effects are carried out by the pipeline.

use crate::models::{Action, Answer, Mode, Question, Verdict};

/// Whether a verdict clears the advertisement bar (inclusive)
pub fn is_confident_advertisement(verdict: &Verdict, threshold: f64) -> bool {
    verdict.is_advertisement && verdict.confidence >= threshold
}

/// Choose the action for one classified message
pub fn decide(verdict: &Verdict, mode: Mode, threshold: f64) -> Action {
    if is_confident_advertisement(verdict, threshold) {
        match mode {
            Mode::Interactive => Action::AskUser(Question::Advertisement),
            Mode::AutoDelete => Action::ApplyAdLabelAndDelete,
            Mode::AutoLabel => Action::ApplyAdLabelOnly,
        }
    } else {
        match mode {
            Mode::Interactive => Action::AskUser(Question::Important),
            Mode::AutoLabel | Mode::AutoDelete => Action::KeepAsImportant,
        }
    }
}

/// Turn the user's answer into a concrete action
///
/// `Skip` is not offered for important mail; it is treated as the default
/// (keep).
pub fn resolve_answer(question: Question, answer: Answer) -> Action {
    match (question, answer) {
        (Question::Advertisement, Answer::Delete) => Action::ApplyAdLabelAndDelete,
        (Question::Advertisement, Answer::Keep) => Action::ApplyAdLabelAndKeep,
        (Question::Advertisement, Answer::Skip) => Action::ApplyAdLabelOnly,
        (Question::Important, Answer::Delete) => Action::DeleteDespiteImportant,
        (Question::Important, Answer::Keep | Answer::Skip) => Action::KeepAsImportant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.7;

    fn verdict(is_ad: bool, confidence: f64) -> Verdict {
        Verdict::new(is_ad, confidence, "test")
    }

    #[test]
    fn test_advertisement_per_mode() {
        let v = verdict(true, 0.9);
        assert_eq!(
            decide(&v, Mode::Interactive, THRESHOLD),
            Action::AskUser(Question::Advertisement)
        );
        assert_eq!(
            decide(&v, Mode::AutoDelete, THRESHOLD),
            Action::ApplyAdLabelAndDelete
        );
        assert_eq!(decide(&v, Mode::AutoLabel, THRESHOLD), Action::ApplyAdLabelOnly);
    }

    #[test]
    fn test_important_per_mode() {
        let v = verdict(false, 0.9);
        assert_eq!(
            decide(&v, Mode::Interactive, THRESHOLD),
            Action::AskUser(Question::Important)
        );
        assert_eq!(decide(&v, Mode::AutoDelete, THRESHOLD), Action::KeepAsImportant);
        assert_eq!(decide(&v, Mode::AutoLabel, THRESHOLD), Action::KeepAsImportant);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert_eq!(
            decide(&verdict(true, 0.7), Mode::AutoDelete, 0.7),
            Action::ApplyAdLabelAndDelete
        );
        assert_eq!(
            decide(&verdict(true, 0.69), Mode::AutoDelete, 0.7),
            Action::KeepAsImportant
        );
    }

    #[test]
    fn test_low_confidence_advertisement_is_kept() {
        assert_eq!(
            decide(&verdict(true, 0.6), Mode::AutoDelete, THRESHOLD),
            Action::KeepAsImportant
        );
    }

    #[test]
    fn test_safe_default_is_never_deleted() {
        for mode in Mode::ALL {
            let action = decide(&Verdict::safe_default(), mode, 0.0);
            assert!(!action.moves_to_trash());
            assert!(!action.labels_as_advertisement());
        }
    }

    #[test]
    fn test_decide_is_total() {
        let confidences = [0.0, 0.3, 0.5, 0.7, 0.99, 1.0];
        for mode in Mode::ALL {
            for is_ad in [true, false] {
                for c in confidences {
                    let action = decide(&verdict(is_ad, c), mode, THRESHOLD);
                    let ad_path = is_ad && c >= THRESHOLD;
                    if mode.is_interactive() {
                        assert!(matches!(action, Action::AskUser(_)));
                    }
                    assert_eq!(action.labels_as_advertisement(), ad_path);
                    if action.moves_to_trash() {
                        assert_eq!(mode, Mode::AutoDelete);
                    }
                }
            }
        }
    }

    #[test]
    fn test_resolve_answer() {
        assert_eq!(
            resolve_answer(Question::Advertisement, Answer::Delete),
            Action::ApplyAdLabelAndDelete
        );
        assert_eq!(
            resolve_answer(Question::Advertisement, Answer::Keep),
            Action::ApplyAdLabelAndKeep
        );
        assert_eq!(
            resolve_answer(Question::Advertisement, Answer::Skip),
            Action::ApplyAdLabelOnly
        );
        assert_eq!(
            resolve_answer(Question::Important, Answer::Delete),
            Action::DeleteDespiteImportant
        );
        assert_eq!(
            resolve_answer(Question::Important, Answer::Keep),
            Action::KeepAsImportant
        );
    }

    #[test]
    fn test_resolved_answers_never_ask_again() {
        for question in [Question::Advertisement, Question::Important] {
            for answer in [Answer::Delete, Answer::Keep, Answer::Skip] {
                assert!(!matches!(
                    resolve_answer(question, answer),
                    Action::AskUser(_)
                ));
            }
        }
    }
}
