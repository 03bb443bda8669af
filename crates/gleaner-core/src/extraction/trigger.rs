//! Heuristic gate deciding whether a turn warrants lesson extraction.
//!
//! Three independent signals are OR-ed together. Evaluation is pure: no
//! model calls, no I/O, and absent data simply yields `false`.

use std::fmt;

use gleaner_types::turn::SessionState;

/// Sentiment and evaluation words that suggest the user is judging the
/// agent's work. Matched case-insensitively as whole words.
pub const FEEDBACK_WORDS: [&str; 12] = [
    "good", "bad", "wrong", "right", "better", "worse", "mistake", "perfect", "great",
    "terrible", "nice", "failed",
];

/// Substrings that mark the end of a unit of work. Matched case-sensitively.
pub const COMPLETION_KEYWORDS: [&str; 3] = ["completed", "failed", "timeout"];

/// Keys in action-result data that correlate the result with a task.
pub const TASK_ID_KEYS: [&str; 2] = ["taskId", "task_id"];

/// One of the independent reasons extraction may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSignal {
    /// A prior action in the session reported a task result.
    TaskResult,
    /// The turn contains evaluative feedback.
    Feedback,
    /// The turn reports completion, failure, or a timeout.
    CompletionKeyword,
}

impl fmt::Display for TriggerSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSignal::TaskResult => write!(f, "task_result"),
            TriggerSignal::Feedback => write!(f, "feedback"),
            TriggerSignal::CompletionKeyword => write!(f, "completion_keyword"),
        }
    }
}

/// Stateless trigger evaluation.
pub struct TriggerEvaluator;

impl TriggerEvaluator {
    /// Whether any signal holds for this turn.
    pub fn should_extract(turn_text: &str, state: &SessionState) -> bool {
        Self::has_task_result(state)
            || Self::has_feedback(turn_text)
            || Self::has_completion_keyword(turn_text)
    }

    /// Every signal that holds, in a fixed order. Used for logging and the CLI.
    pub fn signals(turn_text: &str, state: &SessionState) -> Vec<TriggerSignal> {
        let mut signals = Vec::new();
        if Self::has_task_result(state) {
            signals.push(TriggerSignal::TaskResult);
        }
        if Self::has_feedback(turn_text) {
            signals.push(TriggerSignal::Feedback);
        }
        if Self::has_completion_keyword(turn_text) {
            signals.push(TriggerSignal::CompletionKeyword);
        }
        signals
    }

    /// True iff some action result carries an object with a task-correlation key.
    pub fn has_task_result(state: &SessionState) -> bool {
        state.action_results.iter().any(|result| {
            result
                .data
                .as_ref()
                .and_then(|data| data.as_object())
                .is_some_and(|map| TASK_ID_KEYS.iter().any(|key| map.contains_key(*key)))
        })
    }

    /// True iff the lower-cased text contains a feedback word as a whole word.
    ///
    /// Word characters are alphanumerics and `_`, so "that's wrong" matches
    /// `wrong` while "goodness" does not match `good`.
    pub fn has_feedback(turn_text: &str) -> bool {
        turn_text
            .to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .any(|word| FEEDBACK_WORDS.contains(&word))
    }

    /// True iff the text contains a completion keyword (case-sensitive).
    pub fn has_completion_keyword(turn_text: &str) -> bool {
        COMPLETION_KEYWORDS
            .iter()
            .any(|keyword| turn_text.contains(keyword))
    }
}
