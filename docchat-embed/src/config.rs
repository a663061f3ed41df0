//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the fastembed built-in model used when nothing else is configured.
///
/// all-MiniLM-L6-v2 is small enough to run on CPU and produces 384-dim
/// vectors; the retrieval index fixes its dimension on the first ingest.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Configuration for embedding models.
///
/// Two kinds of model are supported: fastembed built-ins (resolved by name,
/// no local files required) and user-defined ONNX models downloaded from a
/// HuggingFace repository into `model_base_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Base directory holding downloaded model files
    pub model_base_path: PathBuf,
    /// Name of the embedding model
    pub model_name: String,
    /// HuggingFace repository for user-defined models (e.g. "BAAI/bge-small-en-v1.5")
    pub hf_model_repo: Option<String>,
    /// HuggingFace revision/branch
    pub hf_revision: Option<String>,
    /// Maximum batch size per embedding call
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings after generation.
    /// Retrieval ranks by raw L2 distance, so this defaults to off.
    pub normalize: bool,
}

impl EmbedConfig {
    /// Configuration for the fastembed built-in MiniLM model.
    pub fn builtin_minilm<P: AsRef<Path>>(model_base_path: P) -> Self {
        Self {
            model_base_path: model_base_path.as_ref().to_path_buf(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            hf_model_repo: None,
            hf_revision: Some("main".to_string()),
            batch_size: 32,
            normalize: false,
        }
    }

    /// Configuration for a user-defined ONNX model from HuggingFace.
    pub fn from_huggingface<P: AsRef<Path>>(
        model_base_path: P,
        model_name: impl Into<String>,
        hf_repo: impl Into<String>,
    ) -> Self {
        Self {
            model_base_path: model_base_path.as_ref().to_path_buf(),
            model_name: model_name.into(),
            hf_model_repo: Some(hf_repo.into()),
            hf_revision: Some("main".to_string()),
            // Smaller batch for models we did not pick ourselves
            batch_size: 16,
            normalize: false,
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Set the HuggingFace revision (builder style)
    pub fn with_revision<S: Into<String>>(self, revision: S) -> Self {
        Self {
            hf_revision: Some(revision.into()),
            ..self
        }
    }

    /// Directory holding this model's files
    pub fn model_path(&self) -> PathBuf {
        self.model_base_path.join(&self.model_name)
    }

    /// Path to the quantized ONNX model file
    pub fn onnx_model_path(&self) -> PathBuf {
        self.model_path().join("onnx").join("model_quantized.onnx")
    }

    /// Path to the tokenizer.json file
    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_path().join("tokenizer.json")
    }

    /// Path to the model config.json file
    pub fn model_config_path(&self) -> PathBuf {
        self.model_path().join("config.json")
    }

    /// Path to the special_tokens_map.json file
    pub fn special_tokens_map_path(&self) -> PathBuf {
        self.model_path().join("special_tokens_map.json")
    }

    /// Path to the optional tokenizer_config.json file
    pub fn tokenizer_config_path(&self) -> PathBuf {
        self.model_path().join("tokenizer_config.json")
    }

    /// Check if this is a user-defined HuggingFace model
    pub fn is_huggingface_model(&self) -> bool {
        self.hf_model_repo.is_some()
    }

    /// Get the HuggingFace repository name
    pub fn hf_repo(&self) -> Option<&str> {
        self.hf_model_repo.as_deref()
    }

    /// Get the HuggingFace revision
    pub fn hf_revision(&self) -> &str {
        self.hf_revision.as_deref().unwrap_or("main")
    }

    /// Validate that all files a user-defined model needs exist on disk.
    /// Built-in models have no local files and always validate.
    pub fn validate(&self) -> Result<()> {
        if !self.is_huggingface_model() {
            return Ok(());
        }

        let required = [
            self.onnx_model_path(),
            self.tokenizer_path(),
            self.model_config_path(),
            self.special_tokens_map_path(),
        ];
        for path in &required {
            if !path.exists() {
                tracing::error!("Missing model file: {}", path.display());
                return Err(EmbedError::ModelFileNotFound { path: path.clone() });
            }
        }

        if !self.tokenizer_config_path().exists() {
            tracing::warn!(
                "tokenizer_config.json not found at {}, will generate minimal config",
                self.tokenizer_config_path().display()
            );
        }

        tracing::debug!("Model validation successful for: {}", self.model_name);
        Ok(())
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self::builtin_minilm("models")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_config() {
        let config = EmbedConfig::default();
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
        assert!(!config.is_huggingface_model());
        assert_eq!(config.batch_size, 32);
        assert!(!config.normalize);
        // Built-in models need no local files
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huggingface_config_paths() {
        let temp_dir = tempdir().unwrap();
        let config =
            EmbedConfig::from_huggingface(temp_dir.path(), "bge-small", "BAAI/bge-small-en-v1.5");

        let base = temp_dir.path().join("bge-small");
        assert_eq!(
            config.onnx_model_path(),
            base.join("onnx").join("model_quantized.onnx")
        );
        assert_eq!(config.tokenizer_path(), base.join("tokenizer.json"));
        assert_eq!(config.model_config_path(), base.join("config.json"));
        assert_eq!(
            config.special_tokens_map_path(),
            base.join("special_tokens_map.json")
        );
        assert_eq!(config.hf_repo(), Some("BAAI/bge-small-en-v1.5"));
        assert_eq!(config.hf_revision(), "main");
    }

    #[test]
    fn test_huggingface_config_validation_missing_files() {
        let temp_dir = tempdir().unwrap();
        let config = EmbedConfig::from_huggingface(temp_dir.path(), "missing", "org/missing");
        assert!(matches!(
            config.validate(),
            Err(EmbedError::ModelFileNotFound { .. })
        ));
    }

    #[test]
    fn test_builder_methods() {
        let config = EmbedConfig::default()
            .with_batch_size(8)
            .with_normalize(true)
            .with_revision("v1.0");
        assert_eq!(config.batch_size, 8);
        assert!(config.normalize);
        assert_eq!(config.hf_revision(), "v1.0");
    }
}
