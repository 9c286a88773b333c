//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for retrieval and grounded answers.

use crate::answer::AnswerEngine;
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::SourceSummary;
use crate::error::KildeError;
use crate::orchestrator::Orchestrator;
use crate::retrieval::Retriever;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    retriever: Arc<Retriever>,
    engine: AnswerEngine,
}

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    let state = Arc::new(AppState {
        retriever: orchestrator.retriever(),
        engine: orchestrator.answer_engine(None)?,
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Kilde API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Sources", "GET  /sources");
    Output::kv("Search", "POST /search");
    Output::kv("Ask", "POST /ask");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/sources", get(list_sources))
        .route("/search", post(search))
        .route("/ask", post(ask))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    sources: Vec<SourceInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    source: String,
    start_label: String,
    end_label: String,
    summary: String,
}

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceSummary>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: KildeError) -> Response {
    let status = match &e {
        KildeError::EmptyQuery => StatusCode::BAD_REQUEST,
        e if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("Request failed: {}", e);
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_sources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sources = state.retriever.index().sources();
    Json(SourcesResponse {
        total: sources.len(),
        sources,
    })
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Response {
    match state.retriever.retrieve(&req.query).await {
        Ok(retrieval) => Json(retrieval).into_response(),
        Err(e) => error_response(e),
    }
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    match state.engine.ask(&req.question).await {
        Ok(answer) => Json(AskResponse {
            answer: answer.answer,
            sources: answer
                .citations
                .into_iter()
                .map(|c| SourceInfo {
                    source: c.source,
                    start_label: c.start_label,
                    end_label: c.end_label,
                    summary: c.summary,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
