//! Ranking and rendering for memory recall.

use std::collections::HashSet;

use super::{MemoryEntry, RecallStrategy};

/// Per-entry response cap in the rendered block
const RESPONSE_PREVIEW_CHARS: usize = 2_000;

/// Tokens shorter than this are ignored by keyword matching
const MIN_TOKEN_LEN: usize = 3;

/// Pick up to `k` entries from `candidates` (newest first)
pub fn select(
    candidates: Vec<MemoryEntry>,
    query: &str,
    k: usize,
    strategy: RecallStrategy,
) -> Vec<MemoryEntry> {
    match strategy {
        RecallStrategy::Recency => candidates.into_iter().take(k).collect(),
        RecallStrategy::Keyword => {
            let wanted = tokens(query);
            let mut scored: Vec<(usize, usize, MemoryEntry)> = candidates
                .into_iter()
                .enumerate()
                .map(|(position, entry)| {
                    let have = tokens(&format!("{} {}", entry.query, entry.response));
                    (wanted.intersection(&have).count(), position, entry)
                })
                .collect();

            if scored.iter().all(|(score, _, _)| *score == 0) {
                return scored.into_iter().take(k).map(|(_, _, e)| e).collect();
            }

            // Higher overlap first, then newer
            scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
            scored
                .into_iter()
                .filter(|(score, _, _)| *score > 0)
                .take(k)
                .map(|(_, _, e)| e)
                .collect()
        }
    }
}

/// Render selected entries as the PRIOR CONTEXT body
pub fn render(entries: &[MemoryEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "[{}] Q: {}\nA: {}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.query.trim(),
                preview(entry.response.trim(), RESPONSE_PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}...", cut.trim_end())
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .collect()
}
