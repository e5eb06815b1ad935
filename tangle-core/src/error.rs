use thiserror::Error;

use crate::normalize::NormalizeError;
use crate::provider::ProviderError;

/// Message returned to callers when the model output cannot be recovered.
pub const INVALID_JSON_MESSAGE: &str = "Model returned invalid JSON. Please try again.";

/// Message returned to callers when the request carries no usable text.
pub const NO_TEXT_MESSAGE: &str = "No text provided";

/// Terminal failure of a single graph request.
///
/// Every variant maps to exactly one HTTP status and one caller-facing
/// message; nothing is retried.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("{}", NO_TEXT_MESSAGE)]
    NoText,

    /// Anything that went wrong talking to the provider. Surfaced as 429
    /// whatever the underlying cause (auth, network, real rate limiting).
    #[error("AI backend error: {0}")]
    Upstream(#[from] ProviderError),

    #[error("{}", INVALID_JSON_MESSAGE)]
    InvalidJson(#[from] NormalizeError),
}

impl GraphError {
    /// HTTP status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            GraphError::NoText => 400,
            GraphError::Upstream(_) => 429,
            GraphError::InvalidJson(_) => 500,
        }
    }

    /// JSON error body: a single `error` string and nothing else.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}
