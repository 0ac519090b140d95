//! HTTP route handlers for the chat API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::chat::{
    ControllerStatus, Message, MessageId, Reply, ReplySource, SendOutcome, Sender, Session,
    SessionId, SessionSummary,
};

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/select", post(select_session))
        .route("/api/chat", post(send_message))
        .route("/api/status", get(controller_status))
        .fallback_service(static_files)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "webhub-chat",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Message as rendered by the client.
#[derive(Debug, Serialize)]
pub struct MessageView {
    /// Message id.
    pub id: MessageId,
    /// Body text.
    pub text: String,
    /// Author.
    pub sender: Sender,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// `HH:MM` label.
    pub time_label: String,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            text: m.text.clone(),
            sender: m.sender,
            timestamp: m.timestamp.timestamp_millis(),
            time_label: m.time_label(),
        }
    }
}

/// Full session with its messages.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Session id.
    pub id: SessionId,
    /// Display title.
    pub title: String,
    /// Whether this is the current session.
    pub is_current: bool,
    /// Messages in order.
    pub messages: Vec<MessageView>,
}

impl SessionView {
    fn new(session: &Session, is_current: bool) -> Self {
        Self {
            id: session.id,
            title: session.title.clone(),
            is_current,
            messages: session.messages.iter().map(MessageView::from).collect(),
        }
    }
}

/// Sidebar listing.
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    /// Selected session, if any.
    pub current_session_id: Option<SessionId>,
    /// Sessions, newest first.
    pub sessions: Vec<SessionSummary>,
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    let store = state.store().read().await;
    Json(SessionListResponse {
        current_session_id: store.current_session_id(),
        sessions: store.summaries(),
    })
}

async fn create_session(State(state): State<Arc<AppState>>) -> Response {
    let mut store = state.store().write().await;
    let id = store.create_session().await;
    match store.session(id) {
        Some(session) => (StatusCode::CREATED, Json(session.summary(true))).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionView>, StatusCode> {
    let store = state.store().read().await;
    let session = store.session(id).ok_or(StatusCode::NOT_FOUND)?;
    let is_current = store.current_session_id() == Some(id);
    Ok(Json(SessionView::new(session, is_current)))
}

async fn select_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> StatusCode {
    state.store().write().await.select_session(id);
    StatusCode::NO_CONTENT
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> StatusCode {
    state.store().write().await.delete_session(id).await;
    StatusCode::NO_CONTENT
}

/// Chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
}

/// Chat response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Session the exchange was recorded in.
    pub session_id: SessionId,
    /// The appended user message.
    pub user_message: MessageView,
    /// The assistant reply.
    pub reply: MessageView,
    /// Origin of the reply text.
    pub source: ReplySource,
    /// `false` when the session was deleted before the reply arrived.
    pub appended: bool,
}

impl From<&Reply> for ChatResponse {
    fn from(r: &Reply) -> Self {
        Self {
            session_id: r.session_id,
            user_message: MessageView::from(&r.user_message),
            reply: MessageView::from(&r.assistant_message),
            source: r.source,
            appended: r.appended,
        }
    }
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    match state.controller.send(&request.message).await {
        SendOutcome::Replied(reply) => Json(ChatResponse::from(reply.as_ref())).into_response(),
        SendOutcome::Rejected(reason) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": reason.as_str() })),
        )
            .into_response(),
    }
}

/// Controller status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Idle or awaiting a reply.
    pub status: ControllerStatus,
}

async fn controller_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.controller.status(),
    })
}
