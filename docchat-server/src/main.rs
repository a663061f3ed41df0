use anyhow::Result;
use clap::Parser;
use docchat_context::{ChunkConfig, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use docchat_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
use docchat_llm::{AnswerGenerator, LlamaServerConfig, LlamaServerGenerator, ensure_model_file};
use docchat_retriever::{RetrievalConfig, RetrievalService};
use docchat_server::{ServerConfig, run_server};
use std::path::PathBuf;
use std::sync::Arc;

/// Retrieval-augmented chat over your own documents, running entirely on
/// local models.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Directory holding the persisted index and document store
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory holding downloaded embedding model files
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,

    /// Chunk window size in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Chunk overlap in characters
    #[arg(long, default_value_t = DEFAULT_OVERLAP)]
    overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, default_value_t = 3)]
    top_k: usize,

    /// Generation budget per answer, in tokens
    #[arg(long, default_value_t = 256)]
    max_tokens: usize,

    /// Base URL of a llama.cpp-style completion server. Without it the
    /// service answers with a placeholder.
    #[arg(long)]
    llm_url: Option<String>,

    /// Skip loading the embedding model (retrieval disabled)
    #[arg(long)]
    no_embedder: bool,

    /// Optional GGUF weights URL to fetch at startup (pair with --fetch-model-dest)
    #[arg(long, requires = "fetch_model_dest")]
    fetch_model_url: Option<String>,

    /// Where to store the fetched GGUF weights
    #[arg(long)]
    fetch_model_dest: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    // Idempotent: skipped when the weights are already on disk
    if let (Some(url), Some(dest)) = (&args.fetch_model_url, &args.fetch_model_dest) {
        ensure_model_file(url, dest).await?;
    }

    let embedder: Option<Arc<dyn EmbeddingProvider>> = if args.no_embedder {
        None
    } else {
        match FastEmbedProvider::create(EmbedConfig::builtin_minilm(&args.model_dir)).await {
            Ok(provider) => Some(Arc::new(provider)),
            Err(e) => {
                tracing::warn!("Embedding model unavailable, running degraded: {e}");
                None
            }
        }
    };

    let generator: Option<Arc<dyn AnswerGenerator>> = match &args.llm_url {
        Some(url) => Some(Arc::new(LlamaServerGenerator::new(LlamaServerConfig::new(
            url,
        ))?)),
        None => None,
    };

    let chunking = ChunkConfig::new(args.chunk_size, args.overlap)
        .map_err(|e| anyhow::anyhow!("invalid chunking parameters: {e}"))?;
    let retrieval_config = RetrievalConfig::new(&args.data_dir)
        .with_chunking(chunking)
        .with_top_k(args.top_k)
        .with_max_tokens(args.max_tokens);

    let service = Arc::new(RetrievalService::open(retrieval_config, embedder, generator)?);
    let stats = service.stats().await;
    tracing::info!(
        "Corpus loaded: {} chunks, dimension {:?}, degraded: {}",
        stats.chunks,
        stats.dimension,
        service.is_degraded()
    );

    let config = ServerConfig {
        host: args.host,
        port: args.port,
    };
    run_server(config, service).await
}
