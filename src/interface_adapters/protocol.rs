//! HTTP-layer DTOs for room creation/listing. Distinct from the
//! WebSocket wire frames in `core::frame`, which are the payload once a
//! connection is established.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::room::RoomId;
use crate::core::server::RoomSnapshot;
use crate::core::session::SeatId;

/// `POST /room` body: selects a game from the closed registry plus
/// game-specific construction arguments and a per-seat agent kind.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub game: String,
    #[serde(default = "default_args")]
    pub args: serde_json::Value,
    pub agents: Vec<AgentSpecDto>,
}

fn default_args() -> serde_json::Value {
    serde_json::Value::Null
}

/// Per-seat agent kind in a `POST /room` body. Only `Network` is reachable
/// over HTTP; a `Local` seat has no remote owner and exists purely for the
/// in-process demo/test harness, so it is intentionally not representable
/// here.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentSpecDto {
    Network,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    #[serde(rename = "roomID")]
    pub room_id: RoomId,
}

/// `GET /room/list` response shape, grounded on
/// `json_encode_server_room`.
#[derive(Debug, Serialize)]
pub struct RoomListResponse(pub HashMap<RoomId, RoomSnapshot>);

/// `OPTIONS /room` response.
#[derive(Debug, Serialize)]
pub struct GameRegistryResponse {
    #[serde(rename = "enum")]
    pub games: Vec<String>,
}

/// Query string for `GET /r/{roomID}/html?seat=watch|<seatID>`.
#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub seat: String,
}

pub fn parse_viewer(seat: &str) -> Result<Option<SeatId>, ()> {
    if seat == "watch" {
        Ok(None)
    } else {
        seat.parse::<SeatId>().map(Some).map_err(|_| ())
    }
}
