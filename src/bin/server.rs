//! RAG server binary
//!
//! Run with: cargo run --bin datarag-server [config.toml]

use datarag::{config::RagConfig, providers::OllamaClient, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datarag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional config file path as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => RagConfig::load(&path)?,
        None => RagConfig::default(),
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - Generation model: {}", config.llm.generate_model);
    tracing::info!("  - Chunk size: {}", config.chunking.max_chars);
    tracing::info!("  - Data dir: {}", config.storage.data_dir.display());

    // Probe the LLM service so a missing backend is visible at startup
    let client = OllamaClient::new(&config.llm)?;
    match client.health_check().await {
        Ok(true) => tracing::info!("Ollama is running at {}", config.llm.base_url),
        _ => {
            tracing::warn!("Ollama not available at {}", config.llm.base_url);
            tracing::warn!("Start it with: ollama serve");
            tracing::warn!(
                "Then pull models: ollama pull {} && ollama pull {}",
                config.llm.embed_model,
                config.llm.generate_model
            );
        }
    }

    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/files/upload - Upload documents");
    println!("  POST /api/query        - Ask questions");
    println!("  GET  /api/files        - List documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
