//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST   /v1/chat`             Send a message, get a reply
//! - `DELETE /v1/sessions/{id}`    Forget a session's conversation

use axum::{
    Router,
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mindmate_core::message::{SessionId, Turn};

use crate::SharedState;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/sessions/{id}", delete(delete_session_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    session_id: Option<String>,
    /// Prior turns used to seed a session the server has not seen yet.
    #[serde(default)]
    conversation_history: Vec<HistoryItem>,
}

#[derive(Deserialize)]
struct HistoryItem {
    role: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ChatResponse {
    pub response: String,
    pub is_emotional: bool,
    pub session_id: String,
    /// Knowledge topics the reply was grounded on.
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "Rejected chat request body");
        api_error(StatusCode::BAD_REQUEST, e.body_text())
    })?;

    let message = payload.message.trim();
    if message.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message is required"));
    }

    let session_id = payload
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| SessionId::new().to_string());

    let history = payload.conversation_history;
    let (handle, created) = state
        .sessions
        .get_or_create(&session_id, move || {
            history
                .into_iter()
                .filter_map(|item| Turn::from_parts(&item.role, item.content))
                .collect()
        })
        .await;

    info!(session = %session_id, created, "v1/chat request");

    // Held for the whole turn: one session, one turn at a time.
    let mut context = handle.lock().await;
    let outcome = state.pipeline.handle_turn_detailed(message, &mut context).await;
    drop(context);

    Ok(Json(ChatResponse {
        response: outcome.response,
        is_emotional: outcome.classification.is_emotional(),
        session_id,
        sources: outcome.retrieved.keys().map(str::to_string).collect(),
    }))
}

async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id).await {
        info!(session = %id, "Session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, format!("Unknown session: {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gateway_state, gateway_state_with};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use mindmate_core::message::Role;
    use tower::ServiceExt;

    fn post_chat(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn chat_returns_reply_and_new_session() {
        let state = gateway_state("NEUTRAL", "Hello there!").await;
        let app = v1_router(state.clone());

        let response = app
            .oneshot(post_chat(serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = read_json(response).await;
        assert_eq!(chat.response, "Hello there!");
        assert!(!chat.is_emotional);
        assert!(!chat.session_id.is_empty());
        assert!(chat.sources.is_empty());
        assert!(state.sessions.contains(&chat.session_id).await);
    }

    #[tokio::test]
    async fn emotional_chat_reports_sources() {
        let state = gateway_state("EMOTIONAL", "That sounds exhausting.").await;
        let app = v1_router(state);

        let response = app
            .oneshot(post_chat(serde_json::json!({
                "message": "I can't sleep at night",
                "session_id": "s-1"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = read_json(response).await;
        assert!(chat.is_emotional);
        assert_eq!(chat.session_id, "s-1");
        assert_eq!(chat.sources, vec!["sleep".to_string()]);
    }

    #[tokio::test]
    async fn session_context_persists_across_requests() {
        let state = gateway_state("NEUTRAL", "ok").await;

        for _ in 0..2 {
            let response = v1_router(state.clone())
                .oneshot(post_chat(serde_json::json!({
                    "message": "hello",
                    "session_id": "keep"
                })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let (ctx, created) = state.sessions.get_or_create("keep", Vec::new).await;
        assert!(!created);
        assert_eq!(ctx.lock().await.len(), 4);
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_session_serialize() {
        let state = gateway_state("NEUTRAL", "ok").await;

        let first = v1_router(state.clone()).oneshot(post_chat(serde_json::json!({
            "message": "first",
            "session_id": "shared"
        })));
        let second = v1_router(state.clone()).oneshot(post_chat(serde_json::json!({
            "message": "second",
            "session_id": "shared"
        })));
        let (a, b) = tokio::join!(first, second);
        assert_eq!(a.unwrap().status(), StatusCode::OK);
        assert_eq!(b.unwrap().status(), StatusCode::OK);

        let (ctx, _) = state.sessions.get_or_create("shared", Vec::new).await;
        let ctx = ctx.lock().await;
        let turns: Vec<(Role, &str)> = ctx.turns().iter().map(|t| (t.role(), t.content())).collect();
        assert_eq!(turns.len(), 4);

        // Each exchange lands whole: user then assistant, never interleaved.
        assert_eq!(turns[0].0, Role::User);
        assert_eq!(turns[1], (Role::Assistant, "ok"));
        assert_eq!(turns[2].0, Role::User);
        assert_eq!(turns[3], (Role::Assistant, "ok"));
        let mut users = vec![turns[0].1, turns[2].1];
        users.sort_unstable();
        assert_eq!(users, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn distinct_sessions_share_one_index() {
        let state = gateway_state("EMOTIONAL", "I hear you.").await;

        let alice = v1_router(state.clone()).oneshot(post_chat(serde_json::json!({
            "message": "I can't sleep",
            "session_id": "alice"
        })));
        let bob = v1_router(state.clone()).oneshot(post_chat(serde_json::json!({
            "message": "work is crushing me",
            "session_id": "bob"
        })));
        let (a, b) = tokio::join!(alice, bob);

        let a: ChatResponse = read_json(a.unwrap()).await;
        let b: ChatResponse = read_json(b.unwrap()).await;
        assert_eq!(a.sources, vec!["sleep".to_string()]);
        assert_eq!(b.sources, vec!["work".to_string()]);

        for id in ["alice", "bob"] {
            let (ctx, created) = state.sessions.get_or_create(id, Vec::new).await;
            assert!(!created);
            assert_eq!(ctx.lock().await.len(), 2);
        }
        assert_eq!(state.pipeline.index().len(), 2);
    }

    #[tokio::test]
    async fn history_seeds_new_session() {
        let state = gateway_state("NEUTRAL", "ok").await;

        let response = v1_router(state.clone())
            .oneshot(post_chat(serde_json::json!({
                "message": "and now?",
                "session_id": "seeded",
                "conversation_history": [
                    {"role": "user", "content": "I had a rough day"},
                    {"role": "assistant", "content": "I'm sorry to hear that"},
                    {"role": "system", "content": "ignored"}
                ]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (ctx, _) = state.sessions.get_or_create("seeded", Vec::new).await;
        let ctx = ctx.lock().await;
        assert_eq!(ctx.len(), 4);
        assert_eq!(ctx.turns()[0].content(), "I had a rough day");
        assert_eq!(ctx.turns()[2].content(), "and now?");
    }

    #[tokio::test]
    async fn blank_message_rejected() {
        let app = v1_router(gateway_state("NEUTRAL", "ok").await);

        let response = app
            .oneshot(post_chat(serde_json::json!({"message": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let err: ErrorResponse = read_json(response).await;
        assert_eq!(err.error, "Message is required");
    }

    #[tokio::test]
    async fn missing_message_rejected() {
        let app = v1_router(gateway_state("NEUTRAL", "ok").await);
        let response = app
            .oneshot(post_chat(serde_json::json!({"session_id": "x"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_rejected_as_json_error() {
        let app = v1_router(gateway_state("NEUTRAL", "ok").await);
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from("{ not json"))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let err: ErrorResponse = read_json(response).await;
        assert!(!err.error.is_empty());
    }

    #[tokio::test]
    async fn failing_backend_still_replies() {
        let state = gateway_state_with(None).await;
        let app = v1_router(state.clone());

        let response = app
            .oneshot(post_chat(serde_json::json!({"message": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = read_json(response).await;
        assert_eq!(chat.response, state.pipeline.fallback_message());
        assert!(!chat.is_emotional);
    }

    #[tokio::test]
    async fn delete_session() {
        let state = gateway_state("NEUTRAL", "ok").await;
        state.sessions.get_or_create("bye", Vec::new).await;

        let req = Request::builder()
            .method("DELETE")
            .uri("/sessions/bye")
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let req = Request::builder()
            .method("DELETE")
            .uri("/sessions/bye")
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
