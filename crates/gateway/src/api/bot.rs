//! `POST /bot/inbound`: the chat connector contract.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::api::api_error;
use crate::bot::envelope::InboundMessage;
use crate::state::AppState;

/// Blocks until the prompt (if any) has been answered, then returns the
/// replies the connector should send.
pub async fn inbound(
    State(state): State<AppState>,
    Json(body): Json<InboundMessage>,
) -> Response {
    let Some(bot) = state.bot.as_ref() else {
        return api_error(StatusCode::NOT_FOUND, "bot surface is disabled");
    };
    Json(bot.handle(body).await).into_response()
}
