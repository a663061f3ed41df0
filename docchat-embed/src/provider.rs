//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::downloader::ModelDownloader;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{
    EmbeddingModel, InitOptions, TextEmbedding, TokenizerFiles, UserDefinedEmbeddingModel,
};
use fnv::FnvHasher;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::fs;

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new result; the dimension is inferred from the first vector
    /// (0 when the result is empty).
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Type alias for cached model entries (model, dimension)
type ModelCacheEntry = (Arc<Mutex<TextEmbedding>>, usize);

/// Global cache for initialized embedding models to avoid reloading
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, ModelCacheEntry>>> = OnceLock::new();

fn get_model_cache() -> &'static Mutex<HashMap<String, ModelCacheEntry>> {
    MODEL_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Trait for embedding providers that can generate embeddings from text.
///
/// The retrieval service depends on this trait only; the concrete backend is
/// injected at construction, so a missing backend degrades the service
/// instead of crashing it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in one batched call
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// FastEmbed-based embedding provider running local ONNX models
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Option<Arc<Mutex<TextEmbedding>>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("model", &self.model.is_some())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Creates a new uninitialized provider; call [`initialize`](Self::initialize)
    /// before embedding, or use [`create`](Self::create).
    pub fn new(config: EmbedConfig) -> Self {
        Self {
            config,
            model: None,
            dimension: 384, // all-MiniLM-L6-v2 output size, corrected on load
        }
    }

    /// Creates and initializes a provider in one step.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let mut provider = Self::new(config);
        provider.initialize().await?;
        Ok(provider)
    }

    /// Downloads (if needed) and loads the embedding model, reusing the
    /// global cache when another provider already loaded the same config.
    pub async fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            self.config.model_name
        );

        let cache_key = self.create_cache_key();

        let cached = {
            let cache = get_model_cache().lock().unwrap();
            cache
                .get(&cache_key)
                .map(|(model, dim)| (Arc::clone(model), *dim))
        };
        if let Some((model, dimension)) = cached {
            tracing::info!("Using cached model for: {}", self.config.model_name);
            self.model = Some(model);
            self.dimension = dimension;
            return self.validate_model().await;
        }

        let (model, dimension) = if self.config.is_huggingface_model() {
            tracing::info!(
                "Preparing HuggingFace model: {}",
                self.config.model_name
            );
            ModelDownloader::new().ensure_model(&self.config).await?;
            self.load_user_defined_model().await?
        } else {
            self.load_builtin_model().await?
        };

        let model_arc = Arc::new(Mutex::new(model));
        {
            let mut cache = get_model_cache().lock().unwrap();
            cache.insert(cache_key, (Arc::clone(&model_arc), dimension));
        }
        self.model = Some(model_arc);
        self.dimension = dimension;

        self.validate_model().await
    }

    /// Cache key derived from the full config, so two providers share a
    /// model only when every knob matches.
    fn create_cache_key(&self) -> String {
        let config_json =
            serde_json::to_string(&self.config).expect("Config should always serialize");

        let mut hasher = FnvHasher::default();
        hasher.write(config_json.as_bytes());
        format!("{:x}", hasher.finish())
    }

    /// Load a fastembed built-in model by name
    async fn load_builtin_model(&self) -> Result<(TextEmbedding, usize)> {
        tracing::info!("Using built-in fastembed model: {}", self.config.model_name);

        tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
            let init_options =
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true);

            let mut model = TextEmbedding::try_new(init_options)
                .map_err(|e| EmbedError::External { source: e })?;

            // Probe the dimension with a test embedding
            let test_embeddings = model
                .embed(vec!["test".to_string()], None)
                .map_err(|e| EmbedError::External { source: e })?;
            let dimension = test_embeddings.first().map(|emb| emb.len()).unwrap_or(384);

            tracing::info!("Model loaded successfully. Dimension: {}", dimension);
            Ok((model, dimension))
        })
        .await?
    }

    /// Load a user-defined ONNX model from downloaded HuggingFace files
    async fn load_user_defined_model(&self) -> Result<(TextEmbedding, usize)> {
        tracing::info!("Loading user-defined model: {}", self.config.model_name);

        let onnx_file = fs::read(self.config.onnx_model_path())
            .await
            .map_err(|e| EmbedError::Io { source: e })?;
        let tokenizer_file = fs::read(self.config.tokenizer_path())
            .await
            .map_err(|e| EmbedError::Io { source: e })?;
        let config_file = fs::read(self.config.model_config_path())
            .await
            .map_err(|e| EmbedError::Io { source: e })?;
        let special_tokens_map_file = fs::read(self.config.special_tokens_map_path())
            .await
            .map_err(|e| EmbedError::Io { source: e })?;

        // tokenizer_config.json is optional upstream; synthesize a minimal
        // one when the repository does not ship it
        let tokenizer_config_path = self.config.tokenizer_config_path();
        let tokenizer_config_file = if tokenizer_config_path.exists() {
            fs::read(&tokenizer_config_path)
                .await
                .map_err(|e| EmbedError::Io { source: e })?
        } else {
            let minimal_config = serde_json::json!({
                "clean_up_tokenization_spaces": true,
                "do_lower_case": false,
                "model_max_length": 512,
                "tokenizer_class": "BertTokenizer"
            });
            serde_json::to_vec_pretty(&minimal_config)
                .map_err(|e| EmbedError::External { source: e.into() })?
        };

        let tokenizer_files = TokenizerFiles {
            tokenizer_file,
            config_file,
            special_tokens_map_file,
            tokenizer_config_file,
        };
        let user_model = UserDefinedEmbeddingModel::new(onnx_file, tokenizer_files);

        let config_name = self.config.model_name.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                tracing::info!("Initializing user-defined model: {}", config_name);

                let mut model =
                    TextEmbedding::try_new_from_user_defined(user_model, Default::default())
                        .map_err(|e| EmbedError::External { source: e })?;

                let test_embeddings = model
                    .embed(vec!["test".to_string()], None)
                    .map_err(|e| EmbedError::External { source: e })?;
                let dimension = test_embeddings.first().map(|emb| emb.len()).unwrap_or(384);

                tracing::info!(
                    "User-defined model loaded successfully. Dimension: {}",
                    dimension
                );
                Ok((model, dimension))
            })
            .await??;

        Ok((model, dimension))
    }

    /// Validate that the loaded model produces sane embeddings
    async fn validate_model(&self) -> Result<()> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| EmbedError::invalid_config("Model not initialized"))?;

        let model_clone = Arc::clone(model);
        let validation_result = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
            let mut model_guard = model_clone.lock().unwrap();
            model_guard
                .embed(vec!["validation test".to_string()], None)
                .map_err(|e| EmbedError::External { source: e })
        })
        .await??;

        let embedding = validation_result
            .first()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                EmbedError::invalid_config("Model validation failed: no embedding generated")
            })?;

        if embedding.len() != self.dimension {
            return Err(EmbedError::invalid_config(format!(
                "Model validation failed: expected dimension {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        if embedding.iter().any(|value| !value.is_finite()) {
            return Err(EmbedError::invalid_config(
                "Model validation failed: non-finite values in embedding",
            ));
        }

        tracing::debug!("Model validation passed for: {}", self.config.model_name);
        Ok(())
    }

    /// Clears the global model cache.
    pub fn clear_cache() {
        get_model_cache().lock().unwrap().clear();
        tracing::info!("Model cache cleared");
    }

    /// Returns the number of cached models.
    pub fn cache_size() -> usize {
        get_model_cache().lock().unwrap().len()
    }

    fn maybe_normalize(&self, embeddings: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
        if !self.config.normalize {
            return embeddings;
        }
        embeddings
            .into_iter()
            .map(|mut embedding| {
                let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for value in &mut embedding {
                        *value /= norm;
                    }
                }
                embedding
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("No embedding generated for text"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let model = self.model.as_ref().ok_or_else(|| {
            EmbedError::invalid_config("Model not initialized. Call initialize() first.")
        })?;

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            let chunk = chunk.to_vec();
            let model_clone = Arc::clone(model);

            let batch_embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                tracing::debug!("Processing batch of {} texts", chunk.len());
                let mut model_guard = model_clone.lock().unwrap();
                model_guard
                    .embed(chunk, None)
                    .map_err(|e| EmbedError::External { source: e })
            })
            .await??;

            all_embeddings.extend(self.maybe_normalize(batch_embeddings));
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}
