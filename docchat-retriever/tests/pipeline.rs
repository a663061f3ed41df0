//! Integration tests for the full ingest → persist → retrieve → answer
//! pipeline, using deterministic fake backends:
//! - an embedder that hashes each text into a small vector, so distinct
//!   texts land at distinct points and retrieval is meaningful
//! - a zero-vector embedder for tie-breaking behavior
//! - a generator that echoes its prompt, so tests can inspect what
//!   retrieval fed it

use async_trait::async_trait;
use docchat_context::ChunkConfig;
use docchat_embed::{EmbeddingProvider, EmbeddingResult};
use docchat_llm::AnswerGenerator;
use docchat_retriever::{RetrievalConfig, RetrievalService};
use std::sync::Arc;
use tempfile::tempdir;

const DIM: usize = 8;

/// Deterministic text-to-vector hash; equal texts embed equally.
struct HashEmbedder;

fn hash_embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for (i, byte) in text.bytes().enumerate() {
        vector[i % DIM] += f32::from(byte) / 255.0;
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_text(&self, text: &str) -> docchat_embed::Result<Vec<f32>> {
        Ok(hash_embed(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> docchat_embed::Result<EmbeddingResult> {
        Ok(EmbeddingResult::new(
            texts.iter().map(|t| hash_embed(t)).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        DIM
    }

    fn provider_name(&self) -> &str {
        "hash"
    }
}

/// Embedder returning all-zero vectors: every distance ties.
struct ZeroEmbedder;

#[async_trait]
impl EmbeddingProvider for ZeroEmbedder {
    async fn embed_text(&self, _text: &str) -> docchat_embed::Result<Vec<f32>> {
        Ok(vec![0.0; DIM])
    }

    async fn embed_texts(&self, texts: &[String]) -> docchat_embed::Result<EmbeddingResult> {
        Ok(EmbeddingResult::new(
            texts.iter().map(|_| vec![0.0; DIM]).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        DIM
    }

    fn provider_name(&self) -> &str {
        "zero"
    }
}

/// Generator that returns its own prompt, so assertions can see the context.
struct EchoGenerator;

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    async fn generate(&self, prompt: &str, _max_tokens: usize) -> docchat_llm::Result<String> {
        Ok(prompt.to_string())
    }

    fn generator_name(&self) -> &str {
        "echo"
    }
}

fn open_service(
    data_dir: &std::path::Path,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Arc<RetrievalService> {
    // Chunk size 1000 means the short test sentences never split
    let config = RetrievalConfig::new(data_dir).with_chunking(ChunkConfig::new(1000, 200).unwrap());
    Arc::new(RetrievalService::open(config, Some(embedder), Some(Arc::new(EchoGenerator))).unwrap())
}

/// Two short sentences, no splitting, zero-vector ties.
#[tokio::test]
async fn test_two_sentence_scenario() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(temp_dir.path(), Arc::new(ZeroEmbedder));

    let report = service
        .ingest_texts(&[
            "The sky is blue.".to_string(),
            "Grass is green.".to_string(),
        ])
        .await?;
    assert_eq!(report.documents, 2);
    assert_eq!(report.chunks_indexed, 2);
    assert_eq!(report.total_chunks, 2);

    let stats = service.stats().await;
    assert_eq!(stats.chunks, 2);
    assert_eq!(stats.dimension, Some(DIM));

    // top_k = 1 with all-zero embeddings: ties resolve to the first stored
    // chunk, and the prompt must carry it as context
    let answer = service.query("What color is the sky?", 1, 64).await?;
    assert!(answer.contains("CONTEXT:\nThe sky is blue."));
    assert!(answer.contains("QUESTION: What color is the sky?"));
    Ok(())
}

#[tokio::test]
async fn test_retrieval_ranks_by_similarity() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(temp_dir.path(), Arc::new(HashEmbedder));

    let stored = "What color is the sky today?".to_string();
    service
        .ingest_texts(&[
            "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz".to_string(),
            stored.clone(),
        ])
        .await?;

    // The question embeds exactly like the matching stored text, so it must
    // be the nearest neighbor
    let answer = service.query("What color is the sky today?", 1, 64).await?;
    assert!(answer.contains(&stored));
    Ok(())
}

#[tokio::test]
async fn test_corpus_grows_in_lockstep_across_ingests() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(temp_dir.path(), Arc::new(HashEmbedder));

    let before = service.stats().await;
    assert_eq!(before.chunks, 0);

    let first = service.ingest_texts(&["one".to_string()]).await?;
    let second = service
        .ingest_texts(&["two".to_string(), "three".to_string()])
        .await?;

    let after = service.stats().await;
    assert_eq!(
        after.chunks,
        before.chunks + first.chunks_indexed + second.chunks_indexed
    );
    Ok(())
}

#[tokio::test]
async fn test_long_document_is_split_into_overlapping_chunks() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let config = RetrievalConfig::new(temp_dir.path())
        .with_chunking(ChunkConfig::new(100, 20).unwrap());
    let service = RetrievalService::open(
        config,
        Some(Arc::new(HashEmbedder)),
        Some(Arc::new(EchoGenerator)),
    )?;

    let document: String = (0..40).map(|i| format!("sentence number {i}. ")).collect();
    let report = service.ingest_texts(&[document]).await?;
    assert_eq!(report.documents, 1);
    assert!(report.chunks_indexed > 1);

    let stats = service.stats().await;
    assert_eq!(stats.chunks, report.chunks_indexed);
    Ok(())
}

/// Restarting the service from the same data dir resumes the exact corpus.
#[tokio::test]
async fn test_persistence_survives_restart() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;

    {
        let service = open_service(temp_dir.path(), Arc::new(HashEmbedder));
        service
            .ingest_texts(&[
                "The sky is blue.".to_string(),
                "Grass is green.".to_string(),
            ])
            .await?;
    }

    // A fresh service over the same directory sees the same corpus and can
    // retrieve from it without re-ingesting
    let restarted = open_service(temp_dir.path(), Arc::new(HashEmbedder));
    let stats = restarted.stats().await;
    assert_eq!(stats.chunks, 2);
    assert_eq!(stats.dimension, Some(DIM));

    let answer = restarted.query("The sky is blue.", 1, 64).await?;
    assert!(answer.contains("The sky is blue."));

    // And ingesting more keeps extending the restored corpus
    restarted.ingest_texts(&["Clouds are white.".to_string()]).await?;
    assert_eq!(restarted.stats().await.chunks, 3);
    Ok(())
}

/// Concurrent ingests and queries never leave the index and store with
/// unequal sizes.
#[tokio::test]
#[tracing_test::traced_test]
async fn test_concurrent_ingest_and_query_stay_in_lockstep() {
    let temp_dir = tempdir().unwrap();
    let service = open_service(temp_dir.path(), Arc::new(HashEmbedder));

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service
                    .ingest_texts(&[format!("document number {i}")])
                    .await
                    .map(|_| ())
            } else {
                service.query("anything at all", 2, 32).await.map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = service.stats().await;
    assert_eq!(stats.chunks, 4);

    // Every stored position is retrievable: the index agrees with the store
    let answer = service.query("document number 0", 4, 32).await.unwrap();
    assert!(answer.contains("document number"));
}
