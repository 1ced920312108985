//! Input shaping between teams: upstream concatenation, conversation tail
//! and document truncation.

use crate::gateway::ChatMessage;

use super::run::TeamOutput;

/// Stored in place of an empty team output
pub const TEAM_NO_OUTPUT: &str = "TEAM PRODUCED NO OUTPUT";
/// Shown to a downstream team whose upstream produced nothing
pub const UPSTREAM_NO_OUTPUT: &str = "UPSTREAM PRODUCED NO OUTPUT";
/// Prefix of the marker appended to a truncated document
pub const TRUNCATION_MARKER: &str = "[DOCUMENT TRUNCATED";

/// Fraction of the limit searched backwards for a line break
const LINE_BREAK_WINDOW: f64 = 0.2;

/// Normalize a raw team output for storage
pub fn stored_output(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        TEAM_NO_OUTPUT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Labeled concatenation of every earlier team's full output, in order
pub fn upstream_concat(outputs: &[TeamOutput]) -> String {
    outputs
        .iter()
        .map(|t| {
            let body = if t.output.trim().is_empty() || t.output == TEAM_NO_OUTPUT {
                UPSTREAM_NO_OUTPUT
            } else {
                t.output.as_str()
            };
            format!("=== {} (team {}) ===\n{}", t.name, t.position, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The `m` most recent conversation entries
pub fn history_tail(history: &[ChatMessage], m: usize) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(m);
    history[start..].to_vec()
}

/// Cut `text` to at most `limit` characters, preferring a line break in the
/// last fifth of the window. Returns the text (with a visible marker when
/// cut) and whether truncation happened. `limit == 0` disables the cap.
pub fn truncate_document(text: &str, limit: usize) -> (String, bool) {
    let total = text.chars().count();
    if limit == 0 || total <= limit {
        return (text.to_string(), false);
    }

    let cut = text
        .char_indices()
        .nth(limit)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];

    let window_start = head
        .char_indices()
        .nth(limit - (limit as f64 * LINE_BREAK_WINDOW) as usize)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let head = match head[window_start..].rfind('\n') {
        Some(pos) => &head[..window_start + pos],
        None => head,
    };

    let kept = head.chars().count();
    let marked = format!(
        "{}\n\n{}: showing the first {} of {} characters]",
        head.trim_end(),
        TRUNCATION_MARKER,
        kept,
        total
    );
    (marked, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(position: usize, name: &str, text: &str) -> TeamOutput {
        TeamOutput {
            position,
            name: name.to_string(),
            slug: name.to_lowercase(),
            output: text.to_string(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_upstream_concat_is_labeled_and_ordered() {
        let text = upstream_concat(&[output(1, "Research", "facts"), output(2, "Analysis", TEAM_NO_OUTPUT)]);
        let research = text.find("=== Research (team 1) ===\nfacts").unwrap();
        let analysis = text.find("=== Analysis (team 2) ===").unwrap();
        assert!(research < analysis);
        assert!(text.ends_with(UPSTREAM_NO_OUTPUT));
        assert_eq!(upstream_concat(&[]), "");
    }

    #[test]
    fn test_stored_output_marks_empty() {
        assert_eq!(stored_output("  \n"), TEAM_NO_OUTPUT);
        assert_eq!(stored_output(" report "), "report");
    }

    #[test]
    fn test_history_tail() {
        let history: Vec<ChatMessage> = (0..5).map(|i| ChatMessage::user(format!("m{}", i))).collect();
        let tail = history_tail(&history, 3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].content, "m2");
        assert!(history_tail(&history, 0).is_empty());
        assert_eq!(history_tail(&history[..1], 3).len(), 1);
    }

    #[test]
    fn test_truncate_prefers_line_break() {
        let doc = format!("{}\n{}", "a".repeat(90), "b".repeat(60));
        let (text, truncated) = truncate_document(&doc, 100);
        assert!(truncated);
        assert!(text.starts_with(&"a".repeat(90)));
        assert!(!text.contains('b'));
        assert!(text.contains(TRUNCATION_MARKER));
        assert!(text.contains("of 151 characters"));
    }

    #[test]
    fn test_truncate_hard_cut_and_passthrough() {
        let doc = "é".repeat(50);
        let (text, truncated) = truncate_document(&doc, 10);
        assert!(truncated);
        assert!(text.starts_with(&"é".repeat(10)));
        assert!(text.contains("first 10 of 50"));

        let (same, truncated) = truncate_document("short", 100);
        assert_eq!(same, "short");
        assert!(!truncated);
        assert!(!truncate_document(&doc, 0).1);
    }
}
