//! Error taxonomy for the networking/session core.

use std::time::Duration;

use super::spectator::SpectatorState;

/// Raised by `GetSync`/`ReconnectSync` when the queue is empty and the
/// spectator is no longer `CONNECTED`.
#[derive(Debug, thiserror::Error)]
#[error("disconnected while state was {state:?}")]
pub struct Disconnected {
    pub state: SpectatorState,
}

impl Disconnected {
    pub fn new(state: SpectatorState) -> Self {
        Self { state }
    }

    /// Server or game told this connection to stop; terminal, never reconnectable.
    pub fn is_server_interrupt(&self) -> bool {
        matches!(self.state, SpectatorState::InterruptedByServer)
    }
}

/// Raised by `Session::reconnect_sync` when the configured window elapses
/// without the client rejoining.
#[derive(Debug, thiserror::Error)]
#[error("reconnect timed out after {0:?}")]
pub struct ReconnectTimeout(pub Duration);

/// The full set of failures an `Ask.*` call, or the reconnect it may
/// trigger, can surface to `GameLogic`.
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error(transparent)]
    Disconnected(#[from] Disconnected),
    #[error(transparent)]
    ReconnectTimeout(#[from] ReconnectTimeout),
}

impl AskError {
    /// True once nothing further can be done for this seat; the worker
    /// must give up and let the room end.
    pub fn is_terminal(&self) -> bool {
        match self {
            AskError::Disconnected(d) => d.is_server_interrupt(),
            AskError::ReconnectTimeout(_) => false,
        }
    }
}

/// Claim-time failures when a client requests a seat.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("seat already taken")]
    SeatTaken,
    #[error("seat owned by another user")]
    WrongUser,
    #[error("no such seat")]
    NoSuchSeat,
}

/// Room/Server level failures surfaced over HTTP.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found")]
    NotFound,
    #[error("unknown game {0:?}")]
    UnknownGame(String),
    #[error("failed to construct game: {0}")]
    Construction(String),
    #[error(transparent)]
    Claim(#[from] ClaimError),
}
