pub mod config;
pub mod error;
pub mod mock;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod provider;

pub use config::TangleConfig;
pub use error::GraphError;
pub use models::{Category, Edge, GraphResult, Node};
pub use normalize::{normalize, NormalizeError};
pub use pipeline::{generate_graph, GenerationSettings, GraphRequest};
pub use provider::{
    create_provider, ChatProvider, Completion, CompletionRequest, MockProvider,
    OpenAiCompatibleClient, ProviderError, ProviderKind,
};
