//! Room/server HTTP endpoints: creation, listing, the room-watch
//! SSE stream, and the HTML spectator view. Grounded on
//! `game_anywhere/network/server.py`'s `http_interface` and
//! `room.py`'s `http_interface`/`get_request_username`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{Stream, StreamExt as _};
use tokio_stream::wrappers::BroadcastStream;

use crate::core::errors::RoomError;
use crate::core::game_logic::AgentSpec;
use crate::core::room::RoomId;
use crate::core::server::RoomEvent;
use crate::interface_adapters::auth::extract_username;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    AgentSpecDto, CreateRoomRequest, CreateRoomResponse, GameRegistryResponse, RoomListResponse,
    ViewQuery, parse_viewer,
};
use crate::interface_adapters::state::AppState;

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// `POST /room`. Body selects a game from the closed registry plus
/// game-specific construction arguments and a per-seat agent kind.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<CreateRoomRequest>,
) -> Response {
    let agent_specs: Vec<AgentSpec> = body
        .agents
        .into_iter()
        .map(|dto| match dto {
            AgentSpecDto::Network => AgentSpec::Network,
        })
        .collect();

    match state
        .server
        .create_room(&body.game, &body.args, agent_specs)
    {
        Ok(room_id) => (
            StatusCode::CREATED,
            axum::Json(CreateRoomResponse { room_id }),
        )
            .into_response(),
        Err(err @ RoomError::UnknownGame(_)) | Err(err @ RoomError::Construction(_)) => {
            json_error(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

/// `GET /room/list`.
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Response {
    axum::Json(RoomListResponse(state.server.list_rooms())).into_response()
}

/// `OPTIONS /room`: advertises the closed game registry.
pub async fn game_registry(State(state): State<Arc<AppState>>) -> Response {
    let mut response =
        axum::Json(GameRegistryResponse {
            games: state.server.game_names(),
        })
        .into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, header::HeaderValue::from_static("POST"));
    response
}

/// `GET /room/list/watch`: an SSE stream of the same add/remove/
/// state-change events as `GET /room/list`, terminated cleanly when the
/// server starts shutting down.
pub async fn watch_rooms(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let stream = BroadcastStream::new(state.server.watch_events()).filter_map(|event| {
        let event = match event {
            Ok(event) => event,
            Err(_lagged) => return None,
        };
        match event {
            RoomEvent::ServerClosing => None,
            other => {
                let payload = serde_json::to_string(&room_event_json(&other)).ok()?;
                Some(Ok(Event::default().data(payload)))
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn room_event_json(event: &RoomEvent) -> serde_json::Value {
    match event {
        RoomEvent::Add { room_id, value } => serde_json::json!({
            "type": "add",
            "roomID": room_id,
            "value": value,
        }),
        RoomEvent::Remove { room_id } => serde_json::json!({
            "type": "remove",
            "roomID": room_id,
        }),
        RoomEvent::StateChange { room_id, seat, state } => serde_json::json!({
            "type": "state_change",
            "roomID": room_id,
            "seat": seat,
            "state": crate::core::server::state_name(*state),
        }),
        RoomEvent::ServerClosing => unreachable!("filtered out above"),
    }
}

/// `GET /r/{roomID}/html?seat=watch|<seatID>`.
pub async fn render_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<RoomId>,
    Query(query): Query<ViewQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(username) = extract_username(&headers, None) else {
        return json_error(StatusCode::UNAUTHORIZED, "username is required");
    };

    let Ok(viewer) = parse_viewer(&query.seat) else {
        return json_error(StatusCode::BAD_REQUEST, "invalid seat");
    };

    let Some(room) = state.server.room(room_id) else {
        return json_error(StatusCode::NOT_FOUND, format!("room {room_id} not found"));
    };

    if let Some(seat) = viewer
        && !room.seat_owned_by(seat, &username)
    {
        return json_error(StatusCode::FORBIDDEN, "seat owned by another user");
    }

    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        room.render_view(viewer),
    )
        .into_response()
}
