//! Recovery of JSON from raw chat-completion output.
//!
//! Models asked for "JSON only" still wrap their answer in code fences,
//! prepend a sentence of commentary, or leave a trailing comma behind. This
//! module undoes those three habits and nothing more. It is not a general
//! JSON repair tool.
//!
//! The steps always run in the same order, each one assuming the previous
//! one already ran:
//!
//! 1. strip a leading/trailing fence line
//! 2. extract the object-like block that runs to the end of the text
//! 3. drop commas that sit right before `]` or `}`
//! 4. parse

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

const FENCE: &str = "```";

/// First `{` through a `}` that is followed only by whitespace.
static OBJECT_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}\s*$").ok());

static TRAILING_COMMA: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").ok());

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("empty model response")]
    EmptyInput,

    #[error("malformed JSON at line {}, column {}: {source}", .source.line(), .source.column())]
    MalformedJson {
        /// The repaired text that failed to parse.
        candidate: String,
        #[source]
        source: serde_json::Error,
    },
}

impl NormalizeError {
    /// The text handed to the JSON parser, if parsing was reached.
    pub fn candidate(&self) -> Option<&str> {
        match self {
            NormalizeError::EmptyInput => None,
            NormalizeError::MalformedJson { candidate, .. } => Some(candidate),
        }
    }
}

/// Recover a JSON value from untrusted model text.
///
/// Pure: the same input always yields the same value or the same failure.
/// No schema is enforced on the result.
pub fn normalize(text: &str) -> Result<Value, NormalizeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::EmptyInput);
    }

    let unfenced = strip_fences(trimmed);
    let candidate = extract_object(&unfenced);
    let repaired = repair_trailing_commas(candidate);

    serde_json::from_str(&repaired).map_err(|source| NormalizeError::MalformedJson {
        candidate: repaired,
        source,
    })
}

/// Remove an opening fence line (with or without a language tag) and, when
/// present, the closing fence line. Input must already be trimmed.
pub(crate) fn strip_fences(text: &str) -> String {
    if !text.starts_with(FENCE) {
        return text.to_string();
    }

    let mut lines: Vec<&str> = text.lines().skip(1).collect();
    if lines
        .last()
        .is_some_and(|last| last.trim().starts_with(FENCE))
    {
        lines.pop();
    }

    lines.join("\n").trim().to_string()
}

/// The object-like block running to the end of `text`, or all of `text`.
pub(crate) fn extract_object(text: &str) -> &str {
    OBJECT_BLOCK
        .as_ref()
        .and_then(|re| re.find(text))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

pub(crate) fn repair_trailing_commas(candidate: &str) -> String {
    match TRAILING_COMMA.as_ref() {
        Some(re) => re.replace_all(candidate, "$1").into_owned(),
        None => candidate.to_string(),
    }
}
