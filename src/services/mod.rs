// Service exports
pub mod embedding;
pub mod huggingface;
pub mod ollama;
pub mod reasoning;

pub use embedding::{Embedder, EmbeddingError, EmbeddingRuntime, HashingEmbedder};
pub use huggingface::HuggingFaceClient;
pub use ollama::OllamaClient;
pub use reasoning::{
    BackendKind, ReasoningError, ReasoningGenerator, ReasoningMode, TextGenerator,
};
