//! Session API endpoints.
//!
//! Thin adapters over the session store: ids travel as UUID strings and
//! store errors are mapped by [`error_response`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use relay_domain::Error;
use relay_sessions::SessionId;

use crate::api::{api_error, error_response};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionOutput {
    pub session_id: String,
    pub latest_output: String,
}

#[derive(Debug, Deserialize)]
pub struct InputBody {
    pub text: String,
}

fn parse_id(raw: &str) -> Result<SessionId, Response> {
    raw.parse::<SessionId>()
        .map_err(|_| error_response(Error::SessionNotFound(raw.to_owned())))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.sessions.create_session();
    Json(SessionCreated {
        session_id: session.id().to_string(),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions: Vec<_> = state
        .sessions
        .list()
        .iter()
        .map(|s| {
            serde_json::json!({
                "session_id": s.id().to_string(),
                "created_at": s.created_at().to_rfc3339(),
            })
        })
        .collect();
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /sessions/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_session(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    let id = match parse_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.sessions.get_session(&id) {
        Some(session) => Json(serde_json::json!({
            "session_id": id.to_string(),
            "latest_output": session.latest_output(),
            "created_at": session.created_at().to_rfc3339(),
        }))
        .into_response(),
        None => error_response(Error::SessionNotFound(raw)),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /sessions/:id/input
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Send text to a session and block until its reply (or the latest
/// output snapshot, if the store's wait bound runs out first).
pub async fn send_input(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Json(body): Json<InputBody>,
) -> Response {
    if body.text.is_empty() {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, "text must not be empty");
    }
    let id = match parse_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.sessions.enqueue_input(&id, &body.text).await {
        Ok(latest_output) => Json(SessionOutput {
            session_id: id.to_string(),
            latest_output,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DELETE /sessions/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn delete_session(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    let id = match parse_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if state.sessions.close_session(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(Error::SessionNotFound(raw))
    }
}
