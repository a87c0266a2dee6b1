//! Room: one game worker, N Sessions, M Spectators, grounded on
//! `game_anywhere/network/room.py` (`ServerRoom`) and `game_room.py`
//! (`GameRoom`, the worker-thread lifecycle).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tracing::{info, warn};

use super::agent::NetworkAgent;
use super::errors::{ClaimError, RoomError};
use super::game_logic::{AgentSpec, GameLogic};
use super::server::Server;
use super::session::{SeatId, Session};
use super::spectator::{Spectator, SpectatorState};

pub type RoomId = u64;

/// Message sent to every new ad-hoc spectator on connect, grounded
/// on `ServerRoom.greeter_message`.
pub const DEFAULT_GREETER_MESSAGE: &str = "Welcome to the room!";

pub struct Room {
    pub id: RoomId,
    server: Weak<Server>,
    runtime: tokio::runtime::Handle,
    game: Arc<dyn GameLogic>,
    sessions: HashMap<SeatId, Arc<Session>>,
    spectators: Mutex<Vec<Arc<Spectator>>>,
    greeter_message: String,
    worker: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl Room {
    /// Allocates one Session per `AgentSpec::Network` seat, stores the
    /// `AgentSpec::Local` agents directly, and launches the worker thread.
    pub fn spawn(
        id: RoomId,
        game: Arc<dyn GameLogic>,
        agent_specs: Vec<AgentSpec>,
        server: Weak<Server>,
        runtime: tokio::runtime::Handle,
        reconnect_timeout: std::time::Duration,
    ) -> Arc<Room> {
        assert_eq!(agent_specs.len(), game.seat_count());

        let mut sessions = HashMap::new();
        let mut local_agents: HashMap<SeatId, Arc<dyn super::agent::Agent>> = HashMap::new();
        for (seat, spec) in agent_specs.into_iter().enumerate() {
            let seat = seat as SeatId;
            match spec {
                AgentSpec::Network => {
                    sessions.insert(seat, Session::with_timeout(seat, reconnect_timeout));
                }
                AgentSpec::Local(agent) => {
                    local_agents.insert(seat, agent);
                }
            }
        }

        let room = Arc::new(Room {
            id,
            server,
            runtime,
            game,
            sessions,
            spectators: Mutex::new(Vec::new()),
            greeter_message: DEFAULT_GREETER_MESSAGE.to_string(),
            worker: Mutex::new(None),
        });

        let worker_room = Arc::clone(&room);
        let handle = std::thread::Builder::new()
            .name(format!("room-{id}-worker"))
            .spawn(move || worker_room.run_game_thread(local_agents))
            .expect("failed to spawn room worker thread");
        *room.worker.lock().unwrap() = Some(handle);

        room
    }

    /// Runs entirely on the dedicated worker OS thread. Blocks on
    /// `Session::reconnect_sync` for each network seat,
    /// then drives `GameLogic::play`, then schedules the room's teardown on
    /// the reactor.
    fn run_game_thread(
        self: Arc<Self>,
        mut local_agents: HashMap<SeatId, Arc<dyn super::agent::Agent>>,
    ) {
        let seat_count = self.game.seat_count();
        let mut agents: Vec<Box<dyn super::agent::Agent>> = Vec::with_capacity(seat_count);
        for seat in 0..seat_count as SeatId {
            if let Some(session) = self.sessions.get(&seat) {
                if let Err(err) = session.reconnect_sync() {
                    warn!(room = self.id, seat, error = %err, "seat never connected; aborting room");
                    self.teardown();
                    return;
                }
                agents.push(Box::new(NetworkAgent::new(Arc::clone(session))));
            } else if let Some(agent) = local_agents.remove(&seat) {
                agents.push(Box::new(LocalAgentHandle(agent)));
            } else {
                unreachable!("every seat is either a Session or a local agent");
            }
        }

        self.game.set_agents(agents);
        info!(room = self.id, "game starting");
        self.game.play();
        info!(room = self.id, "game ended");
        self.teardown();
    }

    /// Interrupts every Session and Spectator in this room. Safe to call
    /// from either the worker thread (on natural game end) or the reactor
    /// (on server shutdown).
    pub fn interrupt(&self) {
        for (&seat, session) in &self.sessions {
            session.interrupt();
            self.publish_seat_state(seat, SpectatorState::InterruptedByServer);
        }
        for spectator in self.spectators.lock().unwrap().iter() {
            spectator.interrupt();
        }
    }

    /// Publishes a seat's current state to room-watch subscribers as a
    /// state-change event. Called at every point a Session observably
    /// changes state: claim, connect, disconnect, interrupt.
    pub fn publish_seat_state(&self, seat: SeatId, state: SpectatorState) {
        if let Some(server) = self.server.upgrade() {
            server.publish_state_change(self.id, seat, state);
        }
    }

    /// Blocks until the worker thread has returned. Only ever called from a
    /// `spawn_blocking` context (`Server::close`) or from the worker's own
    /// teardown path, never directly from the reactor.
    pub fn join_worker(&self) {
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    /// Interrupts every connection, then schedules room removal on the
    /// reactor.
    fn teardown(&self) {
        self.interrupt();

        let server = self.server.clone();
        let room_id = self.id;
        self.runtime.spawn(async move {
            if let Some(server) = server.upgrade() {
                server.remove_room(room_id).await;
            }
        });
    }

    /// Looks up the Session for `seat` and claims it for `username`.
    pub fn claim_seat(&self, seat: SeatId, username: &str) -> Result<Arc<Session>, RoomError> {
        let session = self.sessions.get(&seat).ok_or(RoomError::Claim(ClaimError::NoSuchSeat))?;
        session.try_claim(username)?;
        self.publish_seat_state(seat, SpectatorState::Claimed);
        Ok(Arc::clone(session))
    }

    pub fn session(&self, seat: SeatId) -> Option<Arc<Session>> {
        self.sessions.get(&seat).cloned()
    }

    /// Registers a fresh ad-hoc spectator and returns it alongside the
    /// greeter text the caller should send once the socket is up.
    pub fn add_spectator(&self) -> (Arc<Spectator>, &str) {
        let spectator = Spectator::new_claimed();
        self.spectators.lock().unwrap().push(Arc::clone(&spectator));
        (spectator, &self.greeter_message)
    }

    /// Drops an ad-hoc spectator once its connection ends for good,
    /// grounded on `ServerRoom.report_afk`; Sessions are never removed
    /// this way, they just return to FREE.
    pub fn remove_spectator(&self, spectator: &Arc<Spectator>) {
        debug_assert!(matches!(
            spectator.state(),
            SpectatorState::Free | SpectatorState::InterruptedByServer
        ));
        self.spectators
            .lock()
            .unwrap()
            .retain(|s| !Arc::ptr_eq(s, spectator));
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.lock().unwrap().len()
    }

    /// `seat` to state map for `GET /room/list`, grounded on
    /// `json_encode_server_room`.
    pub fn seat_states(&self) -> HashMap<SeatId, SpectatorState> {
        self.sessions
            .iter()
            .map(|(seat, session)| (*seat, session.state()))
            .collect()
    }

    pub fn render_view(&self, viewer_id: Option<SeatId>) -> String {
        self.game.render_view(viewer_id)
    }

    /// Ownership check for `GET /html?seat=N`.
    pub fn seat_owned_by(&self, seat: SeatId, username: &str) -> bool {
        self.sessions
            .get(&seat)
            .and_then(|session| session.username())
            .is_some_and(|owner| owner == username)
    }
}

/// Adapts a shared `Arc<dyn Agent>` (an `AgentSpec::Local` seat) to the
/// owned `Box<dyn Agent>` `GameLogic::set_agents` expects.
struct LocalAgentHandle(Arc<dyn super::agent::Agent>);

impl super::agent::Agent for LocalAgentHandle {
    fn name(&self) -> &str {
        self.0.name()
    }
    fn tell(&self, message: &str) {
        self.0.tell(message)
    }
    fn update(&self, diffs: Vec<super::agent::ViewDiff>) {
        self.0.update(diffs)
    }
    fn int_choice(&self, min: Option<i64>, max: Option<i64>) -> Result<i64, super::errors::AskError> {
        self.0.int_choice(min, max)
    }
    fn text_choice(&self, options: &[String]) -> Result<String, super::errors::AskError> {
        self.0.text_choice(options)
    }
    fn slot_choice(
        &self,
        slots: &[String],
        indices: &[usize],
        specials: &[String],
    ) -> Result<super::agent::SlotAnswer, super::errors::AskError> {
        self.0.slot_choice(slots, indices, specials)
    }
}
