//! Text extraction for uploaded files.
//!
//! PDFs go through a text extractor; everything else is treated as UTF-8
//! text with invalid bytes ignored, so `.txt`, `.md`, and friends all work
//! without a per-format branch. Extraction failures are surfaced to the
//! caller: one unreadable file fails the whole upload batch, so the corpus
//! never silently misses content the caller believes was ingested.

use anyhow::{Context, Result};

/// Extract text from an uploaded file based on its name.
pub fn extract_file_text(filename: &str, bytes: &[u8]) -> Result<String> {
    if filename.to_lowercase().ends_with(".pdf") {
        pdf_to_text(bytes).with_context(|| format!("PDF parse error for {filename}"))
    } else {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Extract the concatenated page text of a PDF.
fn pdf_to_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| anyhow::anyhow!("{e}"))
}
