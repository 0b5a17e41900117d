//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AccessQuery, ChatRequest, ChatResponse, ConversationResponse, ErrorResponse,
    HistoryLimitRequest, StreamEvent, SuccessResponse, SystemMessageRequest,
};
use super::AppState;
use crate::runtime::RuntimeError;
use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use std::num::NonZeroUsize;

/// Header carrying the access secret
const ACCESS_HEADER: &str = "x-access-key";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/api/conversation", get(get_conversation))
        .route("/api/messages", post(send_message))
        .route("/api/reset", post(reset_conversation))
        .route("/api/system-message", put(set_system_message))
        .route("/api/history-limit", put(set_history_limit))
        .route("/api/events", get(stream_events))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_access,
        ));

    Router::new()
        .merge(gated)
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Access Gate
// ============================================================

async fn require_access(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let from_header = request
        .headers()
        .get(ACCESS_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    // EventSource cannot set headers, so the stream takes ?key=
    let secret = from_header.or_else(|| {
        Query::<AccessQuery>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(q)| q.key)
    });

    if state.gate.is_authenticated(secret.as_deref()) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        AppError::Unauthorized.into_response()
    }
}

// ============================================================
// Conversation
// ============================================================

async fn get_conversation(
    State(state): State<AppState>,
) -> Result<Json<ConversationResponse>, AppError> {
    let snapshot = state.conversation.snapshot().await?;
    Ok(Json(snapshot.into()))
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    match state.conversation.submit(req.text).await {
        Ok(_) => Ok(Json(ChatResponse {
            accepted: true,
            reason: None,
        })),
        // Blank or busy submissions are ignored, not errors
        Err(RuntimeError::Rejected(reason)) => Ok(Json(ChatResponse {
            accepted: false,
            reason: Some(reason.to_string()),
        })),
        Err(e) => Err(e.into()),
    }
}

async fn reset_conversation(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.conversation.reset().await?;
    Ok(Json(SuccessResponse { ok: true }))
}

async fn set_system_message(
    State(state): State<AppState>,
    Json(req): Json<SystemMessageRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.conversation.set_system_message(req.text).await?;
    Ok(Json(SuccessResponse { ok: true }))
}

async fn set_history_limit(
    State(state): State<AppState>,
    Json(req): Json<HistoryLimitRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let limit = NonZeroUsize::new(req.limit)
        .ok_or_else(|| AppError::BadRequest("limit must be a positive integer".to_string()))?;
    state.conversation.set_history_limit(limit).await?;
    Ok(Json(SuccessResponse { ok: true }))
}

/// Subscribes before taking the snapshot, so the stream may repeat a turn
/// already in `init`; clients dedupe by turn index.
async fn stream_events(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let broadcast_rx = state.conversation.subscribe();
    let snapshot = state.conversation.snapshot().await?;
    let init = StreamEvent::Init {
        conversation: snapshot.into(),
    };
    Ok(sse_stream(init, broadcast_rx))
}

async fn get_version() -> impl IntoResponse {
    env!("CARGO_PKG_VERSION")
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unauthorized,
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Rejected(reason) => AppError::BadRequest(reason.to_string()),
            RuntimeError::Stopped => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "access key required".to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
