//! Server: process-wide room index and room-watch event bus, grounded on
//! `game_anywhere/network/server.py` (`Server`), minus the Python singleton
//! decorator; callers hold an explicit `Arc<Server>` instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::broadcast;

use super::errors::RoomError;
use super::game_logic::{AgentSpec, GameLogic};
use super::room::{Room, RoomId};
use super::session::SeatId;
use super::spectator::SpectatorState;

/// Builds a `GameLogic` from a game-specific JSON argument body: a closed
/// registry plus game-specific construction arguments.
pub type GameFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn GameLogic>, RoomError> + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub spectators: usize,
    pub seats: HashMap<SeatId, String>,
}

/// A room-watch document: add, remove, or a seat's state change.
/// `ServerClosing` is the internal sentinel that lets each SSE subscriber
/// task exit cleanly on shutdown; it is never serialized to clients (the
/// HTTP layer translates it into stream end).
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Add {
        room_id: RoomId,
        value: RoomSnapshot,
    },
    Remove {
        room_id: RoomId,
    },
    StateChange {
        room_id: RoomId,
        seat: SeatId,
        state: SpectatorState,
    },
    ServerClosing,
}

pub fn state_name(state: SpectatorState) -> &'static str {
    match state {
        SpectatorState::Free => "FREE",
        SpectatorState::Claimed => "CLAIMED",
        SpectatorState::Connected => "CONNECTED",
        SpectatorState::InterruptedByServer => "INTERRUPTED_BY_SERVER",
    }
}

pub struct Server {
    rooms: Mutex<HashMap<RoomId, Arc<Room>>>,
    next_room_id: AtomicU64,
    events: broadcast::Sender<RoomEvent>,
    registry: HashMap<String, GameFactory>,
    runtime: tokio::runtime::Handle,
    reconnect_timeout: std::time::Duration,
}

impl Server {
    pub fn new(
        registry: HashMap<String, GameFactory>,
        runtime: tokio::runtime::Handle,
        reconnect_timeout: std::time::Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            next_room_id: AtomicU64::new(0),
            events,
            registry,
            runtime,
            reconnect_timeout,
        })
    }

    /// `OPTIONS /room` body.
    pub fn game_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.keys().cloned().collect();
        names.sort();
        names
    }

    /// `POST /room`. Dense integer RoomIds, allocated by a monotonic
    /// counter, per `network/server.py new_room`'s `len(self.rooms)`-style
    /// scheme.
    pub fn create_room(
        self: &Arc<Self>,
        game_name: &str,
        args: &serde_json::Value,
        agent_specs: Vec<AgentSpec>,
    ) -> Result<RoomId, RoomError> {
        let factory = self
            .registry
            .get(game_name)
            .ok_or_else(|| RoomError::UnknownGame(game_name.to_string()))?;
        let game = factory(args)?;
        if agent_specs.len() != game.seat_count() {
            return Err(RoomError::Construction(format!(
                "game {game_name:?} needs {} agents, got {}",
                game.seat_count(),
                agent_specs.len()
            )));
        }

        let room_id = self.next_room_id.fetch_add(1, Ordering::SeqCst);
        let room = Room::spawn(
            room_id,
            game,
            agent_specs,
            Arc::downgrade(self),
            self.runtime.clone(),
            self.reconnect_timeout,
        );
        let snapshot = Self::snapshot(&room);
        self.rooms.lock().unwrap().insert(room_id, room);
        let _ = self.events.send(RoomEvent::Add {
            room_id,
            value: snapshot,
        });
        Ok(room_id)
    }

    pub fn room(&self, id: RoomId) -> Option<Arc<Room>> {
        self.rooms.lock().unwrap().get(&id).cloned()
    }

    /// Called by a room's worker thread once it has torn itself down;
    /// idempotent so it is also safe to call from `close`.
    pub async fn remove_room(&self, id: RoomId) {
        if self.rooms.lock().unwrap().remove(&id).is_some() {
            let _ = self.events.send(RoomEvent::Remove { room_id: id });
        }
    }

    /// Publishes a seat's new state to room-watch subscribers. A no-op
    /// send if nobody is subscribed; `broadcast::Sender::send` only errors
    /// when there are zero receivers, which is not a failure here.
    pub fn publish_state_change(&self, room_id: RoomId, seat: SeatId, state: SpectatorState) {
        let _ = self.events.send(RoomEvent::StateChange {
            room_id,
            seat,
            state,
        });
    }

    pub fn list_rooms(&self) -> HashMap<RoomId, RoomSnapshot> {
        self.rooms
            .lock()
            .unwrap()
            .iter()
            .map(|(id, room)| (*id, Self::snapshot(room)))
            .collect()
    }

    /// `GET /room/list/watch` subscription.
    pub fn watch_events(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    fn snapshot(room: &Room) -> RoomSnapshot {
        RoomSnapshot {
            spectators: room.spectator_count(),
            seats: room
                .seat_states()
                .into_iter()
                .map(|(seat, state)| (seat, state_name(state).to_string()))
                .collect(),
        }
    }

    /// Interrupts every room, waits for each worker to finish, and removes
    /// it. Leaves zero live rooms behind.
    pub async fn close(&self) {
        let _ = self.events.send(RoomEvent::ServerClosing);
        let rooms: Vec<Arc<Room>> = self.rooms.lock().unwrap().values().cloned().collect();
        for room in &rooms {
            room.interrupt();
        }
        for room in rooms {
            let id = room.id;
            let _ = tokio::task::spawn_blocking(move || room.join_worker()).await;
            self.remove_room(id).await;
        }
    }
}
