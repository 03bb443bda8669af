//! Analysis prompt assembly.
//!
//! The prompt is a pure function of the session snapshot, the turn text and
//! the window size: framing, the last `window` recent messages (oldest
//! first), the current turn, and strict output-format instructions.

use std::fmt::Write as _;

use gleaner_types::lesson::LessonCategory;
use gleaner_types::turn::SessionState;

/// Framing for the extraction call.
const EXTRACTION_FRAMING: &str = "You are reviewing a conversation between a user and an AI agent. \
Extract actionable lessons the agent should remember to do better on future tasks.

Rules:
1. Extract ONLY lessons that would change how the agent acts next time
2. Each lesson must be a single, self-contained sentence
3. Do NOT restate the conversation or include pleasantries
4. Rate your confidence honestly; vague lessons deserve low confidence
5. If there is nothing worth learning, return an empty array: []";

/// Output contract for the model.
const OUTPUT_INSTRUCTIONS: &str = r#"Respond with ONLY a JSON array. No prose before or after it, no markdown, no code fences.
Each element must have exactly these fields:
- "text": string (the lesson, one sentence)
- "category": string (one of the categories above)
- "confidence": number from 0.0 to 1.0
- "outcome": string (one of: "success", "failure", "partial")

Example output:
[
  {"text": "Break large refactors into PRs under 400 lines", "category": "task-estimation", "confidence": 0.8, "outcome": "success"}
]"#;

/// Build the extraction prompt for `turn_text` given the session snapshot.
pub fn build_extraction_prompt(state: &SessionState, turn_text: &str, window: usize) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(EXTRACTION_FRAMING);

    prompt.push_str("\n\nCategories:\n");
    for category in LessonCategory::ALL {
        let _ = writeln!(prompt, "- {category}: {}", category.description());
    }

    prompt.push_str("\nRecent conversation:\n");
    let start = state.recent_messages.len().saturating_sub(window);
    let recent = &state.recent_messages[start..];
    if recent.is_empty() {
        prompt.push_str("(no recent messages)\n");
    }
    for message in recent {
        let _ = writeln!(prompt, "{}: {}", message.role, message.text);
    }

    prompt.push_str("\nCurrent message:\n");
    prompt.push_str(turn_text);
    prompt.push_str("\n\n");
    prompt.push_str(OUTPUT_INSTRUCTIONS);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use gleaner_types::llm::MessageRole;
    use gleaner_types::turn::RecentMessage;

    fn state_with_messages(count: usize) -> SessionState {
        SessionState {
            recent_messages: (0..count)
                .map(|i| RecentMessage {
                    role: if i % 2 == 0 {
                        MessageRole::User
                    } else {
                        MessageRole::Assistant
                    },
                    text: format!("message {i}"),
                })
                .collect(),
            action_results: Vec::new(),
        }
    }

    #[test]
    fn test_prompt_lists_all_categories() {
        let prompt = build_extraction_prompt(&SessionState::default(), "done", 6);
        for category in [
            "task-estimation",
            "project-selection",
            "error-handling",
            "user-preference",
            "tool-selection",
        ] {
            assert!(prompt.contains(category), "missing category {category}");
        }
    }

    #[test]
    fn test_prompt_keeps_last_window_oldest_first() {
        let prompt = build_extraction_prompt(&state_with_messages(9), "now", 6);

        assert!(!prompt.contains("message 2\n"));
        assert!(prompt.contains("assistant: message 3\n"));
        assert!(prompt.contains("user: message 8\n"));

        let first = prompt.find("message 3").unwrap();
        let last = prompt.find("message 8").unwrap();
        assert!(first < last);
    }

    #[test]
    fn test_prompt_with_short_history_includes_everything() {
        let prompt = build_extraction_prompt(&state_with_messages(2), "now", 6);
        assert!(prompt.contains("user: message 0"));
        assert!(prompt.contains("assistant: message 1"));
    }

    #[test]
    fn test_prompt_without_history() {
        let prompt = build_extraction_prompt(&SessionState::default(), "hello", 6);
        assert!(prompt.contains("(no recent messages)"));
    }

    #[test]
    fn test_prompt_contains_turn_and_format_contract() {
        let prompt = build_extraction_prompt(&SessionState::default(), "Task completed! PR merged.", 6);
        assert!(prompt.contains("Current message:\nTask completed! PR merged."));
        assert!(prompt.contains("ONLY a JSON array"));
        assert!(prompt.contains("no code fences"));
        for field in ["\"text\"", "\"category\"", "\"confidence\"", "\"outcome\""] {
            assert!(prompt.contains(field));
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let state = state_with_messages(4);
        assert_eq!(
            build_extraction_prompt(&state, "x", 6),
            build_extraction_prompt(&state, "x", 6)
        );
    }
}
