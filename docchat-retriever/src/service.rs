//! Ingest/query orchestration over the index and document store.
//!
//! [`RetrievalService`] is the single owner of the vector index and document
//! store. One `tokio::sync::Mutex` guards the pair for every mutating
//! operation (ingest) and every traversing operation (query): the underlying
//! index is not safe for read-during-write, so queries block during ingests
//! and vice versa. Embedding and generation run to completion while the lock
//! is held, which makes lock hold time equal to backend cost. Large ingests
//! therefore stall queries; that is the known scaling limit of this service.
//!
//! Both backends are optional. Without an embedder the service refuses to
//! ingest and answers questions without retrieved context; without a
//! generator it answers with a fixed placeholder. [`RetrievalService::is_degraded`]
//! reports the combined state so callers never probe backends ad hoc.

use crate::error::{Result, RetrieverError};
use crate::index::FlatIndex;
use crate::store::DocumentStore;
use docchat_context::{ChunkConfig, Chunker};
use docchat_embed::EmbeddingProvider;
use docchat_llm::AnswerGenerator;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Answer returned when no generation backend is configured.
pub const UNCONFIGURED_GENERATOR_ANSWER: &str =
    "[Generation backend missing: start a local completion server and point docchat at it]";

/// File name of the persisted vector index inside the data directory.
pub const INDEX_FILE_NAME: &str = "index.bin";

/// File name of the persisted document store inside the data directory.
pub const DOCS_FILE_NAME: &str = "docs.txt";

/// Configuration for [`RetrievalService`].
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Directory holding `index.bin` and `docs.txt`
    pub data_dir: PathBuf,
    /// Chunking parameters applied at ingest
    pub chunking: ChunkConfig,
    /// Default number of chunks retrieved per query
    pub top_k: usize,
    /// Default generation budget per query
    pub max_tokens: usize,
}

impl RetrievalConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            chunking: ChunkConfig::default(),
            top_k: 3,
            max_tokens: 256,
        }
    }

    /// Set the chunking parameters (builder style)
    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Set the default retrieval depth (builder style)
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the default generation budget (builder style)
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE_NAME)
    }

    fn docs_path(&self) -> PathBuf {
        self.data_dir.join(DOCS_FILE_NAME)
    }
}

/// Outcome of a successful ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Number of raw texts supplied to this ingest
    pub documents: usize,
    /// Number of chunks added to the corpus by this ingest
    pub chunks_indexed: usize,
    /// Total chunks in the corpus afterwards
    pub total_chunks: usize,
}

/// Snapshot of corpus size and shape, for logging and the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    /// Total chunks stored (and vectors indexed)
    pub chunks: usize,
    /// Embedding dimension, once established by the first ingest
    pub dimension: Option<usize>,
}

/// The index/store pair, always mutated together under one lock.
#[derive(Debug, Default)]
struct CorpusState {
    index: FlatIndex,
    store: DocumentStore,
}

/// Orchestrates chunking, embedding, indexing, and answer generation.
pub struct RetrievalService {
    config: RetrievalConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    state: Mutex<CorpusState>,
}

impl std::fmt::Debug for RetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
            .field("config", &self.config)
            .field("embedder", &self.embedder.is_some())
            .field("generator", &self.generator.is_some())
            .finish()
    }
}

impl RetrievalService {
    /// Open a service over `config.data_dir`, loading persisted state when
    /// present.
    ///
    /// The index file is authoritative: when it exists, the sibling document
    /// store is loaded too and the pair must agree on corpus size, otherwise
    /// the load fails rather than serving desynced results. When no index
    /// file exists the corpus starts empty (a stray `docs.txt` is ignored,
    /// and overwritten on the next ingest).
    pub fn open(
        config: RetrievalConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        generator: Option<Arc<dyn AnswerGenerator>>,
    ) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let index_path = config.index_path();
        let docs_path = config.docs_path();

        let (index, store) = if index_path.exists() {
            let index = FlatIndex::load(&index_path)?;
            let store = if docs_path.exists() {
                DocumentStore::load(&docs_path)?
            } else {
                DocumentStore::new()
            };
            if index.len() != store.len() {
                return Err(RetrieverError::StoreDesync {
                    index_len: index.len(),
                    store_len: store.len(),
                });
            }
            (index, store)
        } else {
            (FlatIndex::new(), DocumentStore::new())
        };

        tracing::info!(
            "Retrieval corpus ready: {} chunks at {}",
            store.len(),
            config.data_dir.display()
        );
        if embedder.is_none() {
            tracing::warn!("No embedding backend configured; ingestion is disabled");
        }
        if generator.is_none() {
            tracing::warn!("No generation backend configured; answers are placeholders");
        }

        Ok(Self {
            config,
            embedder,
            generator,
            state: Mutex::new(CorpusState { index, store }),
        })
    }

    /// `true` when at least one backend is missing and the service is
    /// running with reduced capability.
    pub fn is_degraded(&self) -> bool {
        self.embedder.is_none() || self.generator.is_none()
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Current corpus size and dimension.
    pub async fn stats(&self) -> CorpusStats {
        let state = self.state.lock().await;
        CorpusStats {
            chunks: state.store.len(),
            dimension: state.index.dimension(),
        }
    }

    /// Chunk, embed, index, and persist a batch of raw document texts.
    ///
    /// All chunks across all inputs are flattened into one batch and
    /// embedded in a single provider call. Embeddings and texts are appended
    /// in the same relative order, keeping the index and store positionally
    /// aligned, then both are persisted (index first). There is no rollback:
    /// if persistence fails after the in-memory append, memory is ahead of
    /// disk until the next successful persist.
    pub async fn ingest_texts(&self, raw_texts: &[String]) -> Result<IngestReport> {
        if raw_texts.is_empty() {
            return Err(RetrieverError::EmptyInput);
        }
        let embedder = self
            .embedder
            .as_ref()
            .ok_or(RetrieverError::EmbeddingUnavailable)?;

        let chunker = Chunker::new(self.config.chunking);
        let mut all_chunks: Vec<String> = Vec::new();
        for text in raw_texts {
            let chunks = chunker.chunk(text);
            if chunks.is_empty() {
                // An unchunkable document still gets one entry so it is
                // never silently dropped
                all_chunks.push(text.clone());
            } else {
                all_chunks.extend(chunks);
            }
        }

        let mut state = self.state.lock().await;

        let embedded = embedder
            .embed_texts(&all_chunks)
            .await
            .map_err(RetrieverError::backend)?;
        if embedded.len() != all_chunks.len() {
            return Err(RetrieverError::Backend {
                source: anyhow::anyhow!(
                    "embedding backend returned {} vectors for {} chunks",
                    embedded.len(),
                    all_chunks.len()
                ),
            });
        }

        let chunks_indexed = all_chunks.len();
        state.index.add(&embedded.embeddings)?;
        state.store.append(all_chunks);

        state.index.save(&self.config.index_path())?;
        state.store.save(&self.config.docs_path())?;

        let report = IngestReport {
            documents: raw_texts.len(),
            chunks_indexed,
            total_chunks: state.store.len(),
        };
        tracing::info!(
            "Ingested {} documents as {} chunks ({} total)",
            report.documents,
            report.chunks_indexed,
            report.total_chunks
        );
        Ok(report)
    }

    /// Answer `question` using the configured retrieval depth and token
    /// budget.
    pub async fn answer(&self, question: &str) -> Result<String> {
        self.query(question, self.config.top_k, self.config.max_tokens)
            .await
    }

    /// Answer `question`: embed it, retrieve the `top_k` nearest chunks,
    /// assemble the prompt, and generate.
    ///
    /// Retrieval degrades gracefully: an empty index or a missing embedder
    /// produces an empty context block and an ungrounded answer rather than
    /// an error. A missing generator yields a fixed placeholder answer.
    pub async fn query(&self, question: &str, top_k: usize, max_tokens: usize) -> Result<String> {
        let state = self.state.lock().await;

        let context = self.retrieve_context(&state, question, top_k).await?;
        let prompt = build_prompt(&context, question);
        tracing::debug!(
            "Assembled prompt: {} context chars, {} prompt chars",
            context.len(),
            prompt.len()
        );

        match &self.generator {
            Some(generator) => generator
                .generate(&prompt, max_tokens)
                .await
                .map_err(RetrieverError::backend),
            None => Ok(UNCONFIGURED_GENERATOR_ANSWER.to_string()),
        }
    }

    async fn retrieve_context(
        &self,
        state: &CorpusState,
        question: &str,
        top_k: usize,
    ) -> Result<String> {
        let Some(embedder) = &self.embedder else {
            tracing::warn!("No embedding backend; answering without retrieved context");
            return Ok(String::new());
        };
        if state.index.is_empty() {
            return Ok(String::new());
        }

        let query_vector = embedder
            .embed_text(question)
            .await
            .map_err(RetrieverError::backend)?;
        let hits = state.index.search(&query_vector, top_k)?;

        // Positions outside the store are skipped: a desync degrades the
        // context instead of failing the query
        let texts: Vec<&str> = hits
            .iter()
            .filter_map(|hit| state.store.get(hit.position))
            .collect();
        Ok(texts.join("\n\n"))
    }
}

/// Fixed prompt template: instructions, retrieved context, question, answer cue.
fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an assistant. Use the context to answer the question.\n\n\
         CONTEXT:\n{context}\n\n\
         QUESTION: {question}\n\n\
         ANSWER:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docchat_embed::EmbeddingResult;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    /// Embedder returning all-zero vectors: every stored chunk is equally
    /// distant from every query, so ties resolve by insertion order.
    struct ZeroEmbedder {
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for ZeroEmbedder {
        async fn embed_text(&self, _text: &str) -> docchat_embed::Result<Vec<f32>> {
            Ok(vec![0.0; self.dimension])
        }

        async fn embed_texts(&self, texts: &[String]) -> docchat_embed::Result<EmbeddingResult> {
            Ok(EmbeddingResult::new(
                texts.iter().map(|_| vec![0.0; self.dimension]).collect(),
            ))
        }

        fn embedding_dimension(&self) -> usize {
            self.dimension
        }

        fn provider_name(&self) -> &str {
            "zero"
        }
    }

    /// Generator that records every prompt it is asked to complete.
    struct RecordingGenerator {
        prompts: StdMutex<Vec<String>>,
    }

    impl RecordingGenerator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                prompts: StdMutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl AnswerGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str, _max_tokens: usize) -> docchat_llm::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("generated answer".to_string())
        }

        fn generator_name(&self) -> &str {
            "recording"
        }
    }

    fn service_with_backends(
        data_dir: &std::path::Path,
    ) -> (Arc<RetrievalService>, Arc<RecordingGenerator>) {
        let generator = RecordingGenerator::new();
        let service = RetrievalService::open(
            RetrievalConfig::new(data_dir),
            Some(Arc::new(ZeroEmbedder { dimension: 4 })),
            Some(generator.clone()),
        )
        .unwrap();
        (Arc::new(service), generator)
    }

    #[test]
    fn test_degraded_flags() {
        let temp_dir = tempdir().unwrap();
        let service =
            RetrievalService::open(RetrievalConfig::new(temp_dir.path()), None, None).unwrap();
        assert!(service.is_degraded());
        assert!(!service.has_embedder());
        assert!(!service.has_generator());

        let (service, _) = service_with_backends(temp_dir.path());
        assert!(!service.is_degraded());
    }

    #[tokio::test]
    async fn test_ingest_without_embedder_fails() {
        let temp_dir = tempdir().unwrap();
        let service =
            RetrievalService::open(RetrievalConfig::new(temp_dir.path()), None, None).unwrap();

        let result = service.ingest_texts(&["some text".to_string()]).await;
        assert!(matches!(result, Err(RetrieverError::EmbeddingUnavailable)));
    }

    #[tokio::test]
    async fn test_ingest_empty_batch_fails() {
        let temp_dir = tempdir().unwrap();
        let (service, _) = service_with_backends(temp_dir.path());

        let result = service.ingest_texts(&[]).await;
        assert!(matches!(result, Err(RetrieverError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_query_on_empty_index_is_ungrounded_not_an_error() {
        let temp_dir = tempdir().unwrap();
        let (service, generator) = service_with_backends(temp_dir.path());

        let answer = service.answer("What color is the sky?").await.unwrap();
        assert_eq!(answer, "generated answer");

        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("CONTEXT:\n\n"));
        assert!(prompt.contains("QUESTION: What color is the sky?"));
    }

    #[tokio::test]
    async fn test_query_without_generator_returns_placeholder() {
        let temp_dir = tempdir().unwrap();
        let service = RetrievalService::open(
            RetrievalConfig::new(temp_dir.path()),
            Some(Arc::new(ZeroEmbedder { dimension: 4 })),
            None,
        )
        .unwrap();

        let answer = service.answer("anything").await.unwrap();
        assert_eq!(answer, UNCONFIGURED_GENERATOR_ANSWER);
    }

    #[tokio::test]
    async fn test_retrieved_context_reaches_the_prompt() {
        let temp_dir = tempdir().unwrap();
        let (service, generator) = service_with_backends(temp_dir.path());

        let report = service
            .ingest_texts(&[
                "The sky is blue.".to_string(),
                "Grass is green.".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(report.chunks_indexed, 2);

        let answer = service
            .query("What color is the sky?", 1, 64)
            .await
            .unwrap();
        assert_eq!(answer, "generated answer");

        // Zero vectors tie everywhere, so retrieval returns the first
        // stored chunk
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("The sky is blue."));
        assert!(prompt.ends_with("ANSWER:"));
    }

    #[tokio::test]
    async fn test_prompt_template_shape() {
        let prompt = build_prompt("some context", "a question");
        assert!(prompt.starts_with("You are an assistant."));
        assert!(prompt.contains("CONTEXT:\nsome context\n\n"));
        assert!(prompt.contains("QUESTION: a question"));
        assert!(prompt.ends_with("ANSWER:"));
    }

    #[tokio::test]
    async fn test_open_rejects_desynced_persisted_state() {
        let temp_dir = tempdir().unwrap();
        let config = RetrievalConfig::new(temp_dir.path());

        // Persist one vector but two documents
        let mut index = FlatIndex::new();
        index.add(&[vec![0.0, 0.0]]).unwrap();
        index.save(&config.index_path()).unwrap();
        let mut store = DocumentStore::new();
        store.append(vec!["one".to_string(), "two".to_string()]);
        store.save(&config.docs_path()).unwrap();

        let result = RetrievalService::open(config, None, None);
        assert!(matches!(
            result,
            Err(RetrieverError::StoreDesync {
                index_len: 1,
                store_len: 2
            })
        ));
    }
}
