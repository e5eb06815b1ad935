//! One graph request, start to finish.
//!
//! Validation, the provider call and normalization live here so the HTTP
//! layer only has to turn a [`GraphError`] into a status code.

use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::GraphError;
use crate::models::GraphResult;
use crate::normalize::normalize;
use crate::prompt::SYSTEM_PROMPT;
use crate::provider::{ChatProvider, Completion, CompletionRequest};

/// Incoming request body. Only `text` is read.
#[derive(Debug, Deserialize, Default)]
pub struct GraphRequest {
    #[serde(default)]
    pub text: Option<Value>,
}

impl GraphRequest {
    /// Decode a raw body leniently: anything that is not a JSON object with
    /// a string `text` yields a request without text.
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// The trimmed text, or `None` when missing, blank or not a string.
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Generation settings applied to every completion.
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 700,
        }
    }
}

impl From<&ProviderConfig> for GenerationSettings {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Ask `provider` for a thought graph of `request.text` and recover it.
///
/// The recovered value is returned as-is; it is not checked against the
/// graph schema. Nothing is retried.
pub async fn generate_graph(
    provider: &dyn ChatProvider,
    settings: GenerationSettings,
    request: &GraphRequest,
) -> Result<Value, GraphError> {
    let text = request.text().ok_or(GraphError::NoText)?;

    let start = Instant::now();
    let completion = CompletionRequest {
        system: SYSTEM_PROMPT,
        user: text,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    };

    let raw = match provider.complete(&completion).await {
        Ok(Completion::Raw(raw)) => raw,
        Ok(Completion::Graph(graph)) => {
            tracing::info!(
                provider = provider.name(),
                text_len = text.len(),
                nodes = graph.nodes.len(),
                "Graph generated"
            );
            // Plain strings and numbers only, so serialization cannot fail.
            return Ok(serde_json::to_value(&graph).unwrap_or_default());
        }
        Err(e) => {
            tracing::error!(
                provider = provider.name(),
                error = %e,
                took_ms = start.elapsed().as_millis() as u64,
                "Provider call failed"
            );
            return Err(e.into());
        }
    };

    let value = match normalize(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(
                provider = provider.name(),
                error = %e,
                candidate_len = e.candidate().map(str::len).unwrap_or(0),
                raw_len = raw.len(),
                "Model output could not be normalized"
            );
            return Err(e.into());
        }
    };

    inspect_graph(&value, provider.name());

    tracing::info!(
        provider = provider.name(),
        text_len = text.len(),
        took_ms = start.elapsed().as_millis() as u64,
        "Graph generated"
    );

    Ok(value)
}

/// Log shape problems in model output without rejecting it.
fn inspect_graph(value: &Value, provider: &str) {
    match serde_json::from_value::<GraphResult>(value.clone()) {
        Ok(graph) => {
            let dangling = graph.dangling_edges().len();
            if dangling > 0 {
                tracing::warn!(provider, dangling, "Edges reference unknown nodes");
            }
            let out_of_range = graph.out_of_range_weights().len();
            if out_of_range > 0 {
                tracing::warn!(provider, out_of_range, "Edge weights outside [0, 1]");
            }
        }
        Err(e) => {
            tracing::warn!(provider, error = %e, "Model output does not match the graph schema");
        }
    }
}
