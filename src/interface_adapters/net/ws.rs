//! HTTP to WebSocket upgrade handlers for a room's `/ws/{seat}` and
//! `/ws/watch` routes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::core::errors::ClaimError;
use crate::core::frame::ServerFrame;
use crate::core::room::RoomId;
use crate::core::session::SeatId;
use crate::interface_adapters::auth::extract_username;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::transport::run_transport;
use crate::interface_adapters::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// `GET /r/{roomID}/ws/{seat}`. Claims or reclaims the seat for the
/// requesting username, then upgrades.
pub async fn connect_session(
    State(state): State<Arc<AppState>>,
    Path((room_id, seat)): Path<(RoomId, SeatId)>,
    Query(query): Query<UsernameQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(username) = extract_username(&headers, query.username.as_deref()) else {
        return error_response(StatusCode::UNAUTHORIZED, "username is required");
    };

    let Some(room) = state.server.room(room_id) else {
        return error_response(StatusCode::NOT_FOUND, format!("room {room_id} not found"));
    };

    let session = match room.claim_seat(seat, &username) {
        Ok(session) => session,
        Err(crate::core::errors::RoomError::Claim(ClaimError::NoSuchSeat)) => {
            return error_response(StatusCode::NOT_FOUND, "no such session expected");
        }
        Err(crate::core::errors::RoomError::Claim(ClaimError::SeatTaken)) => {
            return error_response(StatusCode::NOT_FOUND, "session already taken");
        }
        Err(crate::core::errors::RoomError::Claim(ClaimError::WrongUser)) => {
            return error_response(StatusCode::FORBIDDEN, "session already taken");
        }
        Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };

    ws.on_upgrade(move |socket| async move {
        info!(room = room_id, seat, username, "session connected");
        session.spectator().mark_connected();
        room.publish_seat_state(seat, session.state());
        run_transport(socket, Arc::clone(session.spectator())).await;
        room.publish_seat_state(seat, session.state());
    })
}

/// `GET /r/{roomID}/ws/watch`.
pub async fn connect_spectator(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<RoomId>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(room) = state.server.room(room_id) else {
        return error_response(StatusCode::NOT_FOUND, format!("room {room_id} not found"));
    };

    ws.on_upgrade(move |socket| async move {
        let (spectator, greeting) = room.add_spectator();
        let greeting = greeting.to_string();
        spectator.mark_connected();
        spectator.send_sync(ServerFrame::Message {
            text: greeting,
            sender: None,
            highlight: None,
        });
        run_transport(socket, Arc::clone(&spectator)).await;
        room.remove_spectator(&spectator);
    })
}
