//! Session: a seat-bound Spectator that survives disconnects.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use super::errors::{AskError, ClaimError, Disconnected};
use super::spectator::{Spectator, SpectatorState};

pub type SeatId = u32;

/// Default reconnect window.
pub const DEFAULT_RECONNECT_TIMEOUT: Duration = Duration::from_secs(180);

pub struct Session {
    pub seat: SeatId,
    spectator: Arc<Spectator>,
    reconnect_timeout: Duration,
    /// Bound once on first successful claim; `None` until then.
    username: Mutex<Option<String>>,
}

impl Session {
    pub fn new(seat: SeatId) -> Arc<Self> {
        Self::with_timeout(seat, DEFAULT_RECONNECT_TIMEOUT)
    }

    pub fn with_timeout(seat: SeatId, reconnect_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            seat,
            spectator: Spectator::new_free(),
            reconnect_timeout,
            username: Mutex::new(None),
        })
    }

    pub fn spectator(&self) -> &Arc<Spectator> {
        &self.spectator
    }

    pub fn state(&self) -> SpectatorState {
        self.spectator.state()
    }

    pub fn username(&self) -> Option<String> {
        self.username.lock().unwrap().clone()
    }

    /// Succeeds iff the session is FREE and either no username is bound
    /// yet or `username` matches the bound one. On first successful claim
    /// the binding is recorded.
    pub fn try_claim(&self, username: &str) -> Result<(), ClaimError> {
        if self.spectator.state() != SpectatorState::Free {
            return Err(ClaimError::SeatTaken);
        }
        let mut bound = self.username.lock().unwrap();
        match bound.as_deref() {
            Some(existing) if existing != username => Err(ClaimError::WrongUser),
            Some(_) => {
                self.spectator.mark_claimed();
                Ok(())
            }
            None => {
                *bound = Some(username.to_string());
                self.spectator.mark_claimed();
                Ok(())
            }
        }
    }

    /// Blocks the worker until the session is `CONNECTED` again, or the
    /// reconnect window elapses, or the session is interrupted. Mirrors
    /// the original's `Condition.wait_for(..., timeout=...)`.
    pub fn reconnect_sync(&self) -> Result<(), AskError> {
        let final_state = self.spectator.wait_for_state(self.reconnect_timeout, |s| {
            matches!(
                s,
                SpectatorState::Connected | SpectatorState::InterruptedByServer
            )
        });
        match final_state {
            SpectatorState::Connected => {
                info!(seat = self.seat, "session reconnected");
                Ok(())
            }
            SpectatorState::InterruptedByServer => Err(AskError::Disconnected(Disconnected::new(
                SpectatorState::InterruptedByServer,
            ))),
            _ => Err(AskError::ReconnectTimeout(super::errors::ReconnectTimeout(
                self.reconnect_timeout,
            ))),
        }
    }

    /// Refined `get_sync`: retries on `Disconnected(Free)` by reconnecting;
    /// propagates `Disconnected(InterruptedByServer)`.
    pub fn get_sync(&self) -> Result<String, AskError> {
        loop {
            match self.spectator.get_sync() {
                Ok(frame) => return Ok(frame),
                Err(d) if d.is_server_interrupt() => return Err(AskError::Disconnected(d)),
                Err(_free) => self.reconnect_sync()?,
            }
        }
    }

    pub fn interrupt(&self) {
        self.spectator.interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_binds_username_once() {
        let session = Session::new(1);
        assert!(session.try_claim("alice").is_ok());
        session.spectator.mark_connected();
        session.spectator.mark_disconnected();
        // Same user may reclaim.
        assert!(session.try_claim("alice").is_ok());
        session.spectator.mark_disconnected();
        // A different user is rejected even though the seat is free again.
        assert!(matches!(
            session.try_claim("charlie"),
            Err(ClaimError::WrongUser)
        ));
    }

    #[test]
    fn claim_rejected_while_taken() {
        let session = Session::new(1);
        session.try_claim("alice").unwrap();
        assert!(matches!(
            session.try_claim("alice"),
            Err(ClaimError::SeatTaken)
        ));
    }

    #[test]
    fn interrupt_is_terminal() {
        let session = Session::new(1);
        session.try_claim("alice").unwrap();
        session.spectator.mark_connected();
        session.interrupt();
        let err = session.get_sync().unwrap_err();
        assert!(err.is_terminal());
    }
}
