//! HuggingFace model downloading functionality

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use hf_hub::api::tokio::{Api, ApiRepo};
use std::path::Path;
use tokio::fs;

/// Downloads user-defined embedding models from HuggingFace Hub.
///
/// Downloads are idempotent: files already present on disk are left alone,
/// so a restart never re-fetches a complete model.
pub struct ModelDownloader {
    api: Api,
}

impl ModelDownloader {
    /// Create a new downloader. Authentication is handled by hf-hub via
    /// environment variables or cached tokens.
    ///
    /// # Panics
    /// Panics if the HuggingFace API client cannot be initialized
    pub fn new() -> Self {
        Self {
            api: Api::new().expect("Failed to create HuggingFace API client"),
        }
    }

    /// Download the model's files if not already present locally.
    ///
    /// Does nothing for built-in fastembed models (they have no local
    /// files). For user-defined models this fetches the quantized ONNX
    /// model and the tokenizer files into the config's model directory.
    pub async fn ensure_model(&self, config: &EmbedConfig) -> Result<()> {
        if !config.is_huggingface_model() {
            tracing::debug!("Not a HuggingFace model, skipping download");
            return Ok(());
        }

        if self.is_model_complete(config) {
            tracing::info!("Model {} already exists and is complete", config.model_name);
            return Ok(());
        }

        let repo_id = config
            .hf_repo()
            .ok_or_else(|| EmbedError::invalid_config("HuggingFace repository not specified"))?;

        tracing::info!("Downloading model {} from {}", config.model_name, repo_id);

        fs::create_dir_all(config.model_path().join("onnx")).await?;

        let repo = self.api.repo(hf_hub::Repo::with_revision(
            repo_id.to_string(),
            hf_hub::RepoType::Model,
            config.hf_revision().to_string(),
        ));
        self.download_model_files(&repo, config).await?;

        tracing::info!("Model {} downloaded successfully", config.model_name);
        Ok(())
    }

    /// Check whether every required file is already on disk
    fn is_model_complete(&self, config: &EmbedConfig) -> bool {
        let required = [
            config.onnx_model_path(),
            config.tokenizer_path(),
            config.model_config_path(),
            config.special_tokens_map_path(),
        ];
        required.iter().all(|path| path.exists())
    }

    async fn download_model_files(&self, repo: &ApiRepo, config: &EmbedConfig) -> Result<()> {
        let downloads = [
            ("onnx/model_quantized.onnx", config.onnx_model_path()),
            ("tokenizer.json", config.tokenizer_path()),
            ("config.json", config.model_config_path()),
            ("special_tokens_map.json", config.special_tokens_map_path()),
            ("tokenizer_config.json", config.tokenizer_config_path()),
        ];

        for (remote_path, local_path) in &downloads {
            if local_path.exists() {
                tracing::debug!("File already exists: {}", local_path.display());
                continue;
            }

            tracing::info!("Downloading {} to {}", remote_path, local_path.display());

            match repo.get(remote_path).await {
                Ok(cached_path) => {
                    fs::copy(&cached_path, local_path)
                        .await
                        .map_err(|e| EmbedError::Io { source: e })?;
                    tracing::debug!("Successfully downloaded {}", remote_path);
                }
                Err(e) => {
                    tracing::warn!("Failed to download {}: {}", remote_path, e);
                    match *remote_path {
                        // The provider synthesizes a minimal tokenizer_config.json
                        "tokenizer_config.json" => continue,
                        "special_tokens_map.json" => {
                            self.create_fallback_special_tokens_map(local_path).await?;
                        }
                        _ => return Err(EmbedError::External { source: e.into() }),
                    }
                }
            }
        }

        Ok(())
    }

    /// Create a fallback special tokens map if the repository lacks one
    async fn create_fallback_special_tokens_map(&self, path: &Path) -> Result<()> {
        let fallback_content = serde_json::json!({
            "cls_token": "[CLS]",
            "sep_token": "[SEP]",
            "unk_token": "[UNK]",
            "pad_token": "[PAD]",
            "mask_token": "[MASK]"
        });

        let content = serde_json::to_string_pretty(&fallback_content)
            .map_err(|e| EmbedError::External { source: e.into() })?;

        fs::write(path, content).await?;
        tracing::info!("Created fallback special_tokens_map.json");
        Ok(())
    }
}

impl Default for ModelDownloader {
    fn default() -> Self {
        Self::new()
    }
}
