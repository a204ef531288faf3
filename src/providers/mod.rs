//! Provider abstractions for the embedding and generation services
//!
//! Trait-based so the pipeline can run against any backend that honors
//! the contracts; the default implementation talks to a local Ollama
//! server for both.

pub mod embedding;
pub mod generation;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use generation::GenerationProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaGenerator};
