use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use mnema_core::{QueryError, SyncError};
use mnema_memory::ScoredChunk;

use super::server::AppState;

#[derive(serde::Deserialize)]
pub(crate) struct QueryPayload {
    pub query: String,
}

#[derive(serde::Deserialize)]
pub(crate) struct SearchPayload {
    pub query: String,
    pub limit: Option<u64>,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    sync_phase: mnema_core::SyncPhase,
    approximate_chunks: u64,
}

#[derive(serde::Serialize)]
struct SyncResponse {
    status: &'static str,
    #[serde(flatten)]
    report: mnema_core::SyncReport,
}

#[derive(serde::Serialize)]
struct QueryResponse {
    query: String,
    answer: String,
    sources: Vec<ScoredChunk>,
}

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map a body that failed to parse to 400. Oversize bodies keep the 413 the
/// body-limit layer produced.
fn rejection_response(rejection: &JsonRejection) -> axum::response::Response {
    let status = if matches!(rejection, JsonRejection::BytesRejection(_)) {
        rejection.status()
    } else {
        StatusCode::BAD_REQUEST
    };
    error_response(status, rejection.body_text())
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        sync_phase: state.sync.phase(),
        approximate_chunks: state.index.approximate_count(),
    })
}

pub(crate) async fn sync_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.sync.run(&state.cancel).await {
        Ok(report) => Json(SyncResponse {
            status: "ok",
            report,
        })
        .into_response(),
        Err(e @ SyncError::Cancelled) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "sync pass failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub(crate) async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryPayload>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(&rejection),
    };
    match state.query.ask(&payload.query).await {
        Ok(outcome) => Json(QueryResponse {
            query: payload.query,
            answer: outcome.answer,
            sources: outcome.sources,
        })
        .into_response(),
        Err(e @ QueryError::EmptyQuery) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, "query failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub(crate) async fn search_handler(
    State(state): State<AppState>,
    payload: Result<Json<SearchPayload>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(&rejection),
    };
    match state.query.search(&payload.query, payload.limit).await {
        Ok(results) => Json(results).into_response(),
        Err(e @ QueryError::EmptyQuery) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, "search failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
