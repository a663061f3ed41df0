//! Streaming download of GGUF model files.

use crate::error::Result;
use futures::StreamExt;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Download `url` to `dest` unless the file already exists.
///
/// Returns `true` when a download happened, `false` when the file was
/// already present. The file is streamed through a sibling `.part` file and
/// renamed into place, so an interrupted download never leaves a truncated
/// model file behind.
pub async fn ensure_model_file(url: &str, dest: &Path) -> Result<bool> {
    if dest.exists() {
        tracing::info!("Model file already exists: {}", dest.display());
        return Ok(false);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    tracing::info!("Downloading model file from {} to {}", url, dest.display());

    let response = reqwest::get(url).await?.error_for_status()?;
    let total_bytes = response.content_length();

    let partial_path = dest.with_extension("part");
    let mut file = fs::File::create(&partial_path).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_logged: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        // Log roughly every 64 MiB to keep startup output readable
        if downloaded - last_logged >= 64 * 1024 * 1024 {
            last_logged = downloaded;
            match total_bytes {
                Some(total) => tracing::info!(
                    "Downloaded {:.1} / {:.1} MiB",
                    downloaded as f64 / 1_048_576.0,
                    total as f64 / 1_048_576.0
                ),
                None => tracing::info!("Downloaded {:.1} MiB", downloaded as f64 / 1_048_576.0),
            }
        }
    }

    file.flush().await?;
    drop(file);
    fs::rename(&partial_path, dest).await?;

    tracing::info!(
        "Model file ready: {} ({:.1} MiB)",
        dest.display(),
        downloaded as f64 / 1_048_576.0
    );
    Ok(true)
}
