//! docchat-server: HTTP front end for the docchat RAG pipeline
//!
//! A small axum application over [`docchat_retriever::RetrievalService`]:
//! multipart document upload, a JSON chat endpoint, health reporting, and a
//! session-id debug listing. Everything substantive happens in the
//! retriever; this crate is routing, extraction, and session bookkeeping.

use docchat_retriever::RetrievalService;
use std::sync::Arc;

pub mod extract;
pub mod server;

pub use server::{AppState, ChatRequest, ChatResponse, UploadResponse, router};

/// Network configuration for the server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Bind and serve the application until the process is stopped.
pub async fn run_server(config: ServerConfig, service: Arc<RetrievalService>) -> anyhow::Result<()> {
    let state = AppState::new(service);
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("docchat server listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
