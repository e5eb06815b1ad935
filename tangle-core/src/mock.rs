//! Offline graph generation.
//!
//! Used when no provider is configured so the frontend can be exercised
//! without network access or API keys. Deterministic and infallible.

use std::collections::HashSet;

use crate::models::{Edge, GraphResult, Node};

/// Maximum number of tokens (and therefore nodes) in a mock graph.
pub const MAX_MOCK_NODES: usize = 8;

const MIN_TOKEN_CHARS: usize = 4;
const DEFAULT_TOKENS: [&str; 4] = ["thoughts", "focus", "energy", "sleep"];
const MOCK_RELATION: &str = "related";
const MOCK_WEIGHT: f64 = 0.6;
const TOPICS_IN_INSIGHT: usize = 5;

/// Build a small chain-shaped graph from the words of `text`.
pub fn mock_graph(text: &str) -> GraphResult {
    let tokens = key_tokens(text);

    let nodes = tokens
        .iter()
        .map(|t| Node {
            id: t.clone(),
            label: title_case(t),
            category: None,
        })
        .collect();

    let edges = tokens
        .windows(2)
        .map(|pair| Edge {
            from: pair[0].clone(),
            to: pair[1].clone(),
            relation: MOCK_RELATION.to_string(),
            weight: MOCK_WEIGHT,
        })
        .collect();

    let topics: Vec<String> = tokens
        .iter()
        .take(TOPICS_IN_INSIGHT)
        .map(|t| title_case(t))
        .collect();

    GraphResult {
        nodes,
        edges,
        insights: vec![
            format!("Core topics: {}.", topics.join(", ")),
            "Try grouping related items and addressing one at a time.".to_string(),
        ],
    }
}

/// Lowercased, punctuation-trimmed, first-occurrence-unique words longer
/// than three characters, capped at [`MAX_MOCK_NODES`]. Falls back to a
/// fixed set when nothing qualifies.
pub(crate) fn key_tokens(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c| matches!(c, ',' | '.' | '!' | '?')).to_lowercase())
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|w| seen.insert(w.clone()))
        .take(MAX_MOCK_NODES)
        .collect();

    if tokens.is_empty() {
        DEFAULT_TOKENS.iter().map(|t| t.to_string()).collect()
    } else {
        tokens
    }
}

/// Uppercase the first letter of every run of cased characters, lowercase
/// the rest. Uncased letters (CJK, digits) end a run.
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_cased = false;
    for c in word.chars() {
        if c.is_lowercase() || c.is_uppercase() {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(c);
            prev_cased = false;
        }
    }
    out
}
