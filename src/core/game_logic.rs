//! The opaque game contract a `Room` drives on its worker thread.

use std::sync::Arc;

use super::agent::Agent;
use super::session::SeatId;

/// What kind of agent a seat is bound to when a room is created.
/// `Local` seats carry a pre-built agent directly
/// (used for the single-process demo and tests) and never get a Session or
/// HTTP presence at all.
pub enum AgentSpec {
    Network,
    Local(Arc<dyn Agent>),
}

/// Implemented by each game; driven entirely from the worker thread, except
/// for `render_view` which the reactor calls concurrently to answer
/// `GET /html`. Because `play` can run for the lifetime of the room while
/// `render_view` is queried at any time, implementors hold their mutable
/// state behind their own interior mutability (a `Mutex`/`RwLock`) rather
/// than through `&mut self`; the trait only ever hands out `&self`.
pub trait GameLogic: Send + Sync {
    /// Number of seats this game requires; drives how many Sessions `Room`
    /// allocates.
    fn seat_count(&self) -> usize;

    /// Records the agents to play with.
    fn set_agents(&self, agents: Vec<Box<dyn Agent>>);

    /// Runs the game to completion. Only ever called from the worker
    /// thread, after every seat's agent has connected and `set_agents` has
    /// run.
    fn play(&self);

    /// Opaque, viewer-scoped rendering; `viewer_id` is `None` for an
    /// anonymous spectator view.
    fn render_view(&self, viewer_id: Option<SeatId>) -> String;
}
