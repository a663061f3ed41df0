//! HTTP routes and handlers.
//!
//! The server is thin glue: handlers validate the request, call into the
//! shared [`RetrievalService`], and map pipeline errors to status codes.
//! Session transcripts live here, in a `RwLock<HashMap>` keyed by generated
//! uuid. Sessions only scope conversation history, never retrieval: every
//! session queries the one global corpus. Sessions are created on upload and
//! live until process restart; there is no eviction.
//!
//! Lock ordering: the corpus lock inside the service is always released
//! before the session map is touched, so the two locks are never held
//! together.

use crate::extract::extract_file_text;
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
};
use docchat_retriever::{RetrievalService, RetrieverError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Error shape returned by every handler: a status code and a plain message.
pub type ApiError = (StatusCode, String);

/// One turn of a session transcript.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RetrievalService>,
    pub sessions: Arc<RwLock<HashMap<String, Vec<ChatTurn>>>>,
}

impl AppState {
    pub fn new(service: Arc<RetrievalService>) -> Self {
        Self {
            service,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// Build the application router with CORS and request tracing applied.
///
/// CORS is permissive to match local-development usage; this service is not
/// meant to face the open internet.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/chat", post(chat))
        .route("/sessions", get(list_sessions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chunks: usize,
    pub degraded: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub indexed: bool,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<String>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.service.stats().await;
    Json(HealthResponse {
        status: "ok",
        chunks: stats.chunks,
        degraded: state.service.is_degraded(),
    })
}

/// Accept multiple PDF or TXT files, extract their text, and ingest every
/// chunk into the shared corpus. Returns a fresh session id for `/chat`.
///
/// One unreadable file fails the whole batch with 400 before anything is
/// ingested.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut texts: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Malformed upload body: {e}")))?
    {
        let filename = field.file_name().unwrap_or("file").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read {filename}: {e}"),
            )
        })?;

        let text = extract_file_text(&filename, &bytes)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("{e:#}")))?;
        texts.push(text);
    }

    if texts.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No files uploaded".to_string()));
    }
    if texts.iter().all(|text| text.trim().is_empty()) {
        return Err((
            StatusCode::BAD_REQUEST,
            "No readable text extracted from uploaded files".to_string(),
        ));
    }

    let report = state
        .service
        .ingest_texts(&texts)
        .await
        .map_err(into_api_error)?;

    let session_id = uuid::Uuid::new_v4().to_string();
    state
        .sessions
        .write()
        .await
        .insert(session_id.clone(), Vec::new());
    tracing::info!(
        "Created session {} after ingesting {} chunks",
        session_id,
        report.chunks_indexed
    );

    Ok(Json(UploadResponse {
        session_id,
        indexed: true,
        message: Some(format!("Ingested {} chunks", report.chunks_indexed)),
    }))
}

/// Answer a question within an existing session, appending both turns to
/// the session transcript. The transcript is bookkeeping only; it is never
/// replayed into the retrieval prompt.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    {
        let sessions = state.sessions.read().await;
        if !sessions.contains_key(&request.session_id) {
            return Err((
                StatusCode::BAD_REQUEST,
                "Invalid or expired session_id. Re-upload documents.".to_string(),
            ));
        }
    }

    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message cannot be empty".to_string()));
    }

    let answer = state
        .service
        .answer(&message)
        .await
        .map_err(into_api_error)?;

    let mut sessions = state.sessions.write().await;
    if let Some(transcript) = sessions.get_mut(&request.session_id) {
        transcript.push(ChatTurn {
            role: "user".to_string(),
            content: message,
        });
        transcript.push(ChatTurn {
            role: "assistant".to_string(),
            content: answer.clone(),
        });
    }

    Ok(Json(ChatResponse { answer }))
}

/// List active session ids (debug endpoint).
async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    let sessions = state.sessions.read().await;
    Json(SessionsResponse {
        sessions: sessions.keys().cloned().collect(),
    })
}

/// Map pipeline errors to HTTP status codes, keeping the cause message.
fn into_api_error(error: RetrieverError) -> ApiError {
    let status = match &error {
        RetrieverError::EmptyInput => StatusCode::BAD_REQUEST,
        RetrieverError::EmbeddingUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error.to_string())
}
