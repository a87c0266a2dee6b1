//! Spectator: per-connection state machine bridging the async reactor and
//! the synchronous game worker.
//!
//! The inbound queue is guarded by a plain `std::sync::{Mutex, Condvar}`
//! pair rather than an async primitive, because the only consumer that
//! ever blocks on it is the worker's OS thread (`GetSync`/`ReconnectSync`).
//! This mirrors the original implementation's `threading.Lock`/`Condition`
//! split between the reading queue (sync) and the writing queue (async).

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use tokio::sync::Notify;
use tracing::{debug, trace};

use super::errors::Disconnected;
use super::frame::ServerFrame;

/// The special inbound string meaning "client lost track of the current
/// question, please resend it."
pub const CLIENT_LOST_TRACK: &str = "?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectatorState {
    Free,
    Claimed,
    Connected,
    InterruptedByServer,
}

struct Inner {
    state: SpectatorState,
    inbound: VecDeque<String>,
    /// True while a consumer is blocked in `get_sync`.
    listening: bool,
}

/// Shared, cloneable handle to one connection's state.
///
/// `Spectator` owns the mutex/condvar pair and the outbound queue. The
/// network-side (`on_connect`, `run`, `interrupt`) and worker-side
/// (`send_sync`, `get_sync`) operations are both implemented here; callers
/// on each side only ever use the methods documented for their domain.
pub struct Spectator {
    lock: Mutex<Inner>,
    signal: Condvar,
    /// Worker to reactor frames. `flume` gives both a blocking `send`
    /// for the worker and an async `recv_async` for the reactor's drain
    /// task.
    outbound_tx: flume::Sender<ServerFrame>,
    outbound_rx: flume::Receiver<ServerFrame>,
    /// Installed by a chat session; consumes inbound frames that
    /// begin with `/` before they reach the normal inbound queue.
    interceptor: Mutex<Option<super::chat::Interceptor>>,
    /// Wakes the reactor's transport loop on `interrupt()`, since the worker
    /// has no other way to reach an async task it doesn't own.
    reactor_notify: Notify,
}

impl Spectator {
    /// Ad-hoc spectators start `CLAIMED` (created at connect time); sessions
    /// override this by constructing `Free` directly via `new_free`.
    pub fn new_claimed() -> Arc<Self> {
        Arc::new(Self::new(SpectatorState::Claimed))
    }

    pub fn new_free() -> Arc<Self> {
        Arc::new(Self::new(SpectatorState::Free))
    }

    fn new(state: SpectatorState) -> Self {
        // Unbounded: `send_sync` must never block the worker beyond a
        // trivial hand-off. The real backpressure lives one layer down,
        // in the reactor's socket write, not in this queue. A
        // disconnected Session can only accumulate frames for as long as
        // the worker keeps producing them before blocking on its next
        // `GetSync`/`ReconnectSync`.
        let (outbound_tx, outbound_rx) = flume::unbounded();
        Self {
            lock: Mutex::new(Inner {
                state,
                inbound: VecDeque::new(),
                listening: false,
            }),
            signal: Condvar::new(),
            outbound_tx,
            outbound_rx,
            interceptor: Mutex::new(None),
            reactor_notify: Notify::new(),
        }
    }

    pub fn state(&self) -> SpectatorState {
        self.lock.lock().unwrap().state
    }

    // ---- network side ----

    /// FREE → CONNECTED, performed once the WebSocket handshake is done.
    /// Asserting `FREE` first would race with reconnection claims handled
    /// elsewhere (`Room`), so callers must already hold the claim.
    pub fn mark_connected(&self) {
        let mut inner = self.lock.lock().unwrap();
        inner.state = SpectatorState::Connected;
        self.signal.notify_all();
    }

    pub fn mark_claimed(&self) {
        let mut inner = self.lock.lock().unwrap();
        debug_assert_eq!(inner.state, SpectatorState::Free);
        inner.state = SpectatorState::Claimed;
    }

    /// The transport's read loop calls this for every inbound text frame.
    /// Frames are routed to the active chat interceptor first; only frames
    /// the interceptor declines (or when there is none) reach the inbound
    /// queue. Returns `true` if the caller should additionally emit the
    /// "Not listening" hint.
    pub fn deliver_inbound(&self, text: String) -> bool {
        if let Some(interceptor) = self.interceptor.lock().unwrap().as_ref()
            && interceptor.try_consume(&text)
        {
            return false;
        }

        let mut inner = self.lock.lock().unwrap();
        let was_listening = inner.listening;
        if !was_listening && text == CLIENT_LOST_TRACK {
            // Discarded when not listening; delivered as a normal frame
            // when listening (the worker treats it as "resend the question").
            return true;
        }
        inner.inbound.push_back(text);
        self.signal.notify_all();
        !was_listening
    }

    /// Transport closed; CONNECTED to FREE. A no-op if the spectator has
    /// already been interrupted, since INTERRUPTED_BY_SERVER is terminal
    /// and the transport loop calls this unconditionally on every exit
    /// path, including the one racing `interrupt()`.
    pub fn mark_disconnected(&self) {
        let mut inner = self.lock.lock().unwrap();
        if inner.state == SpectatorState::InterruptedByServer {
            return;
        }
        inner.state = SpectatorState::Free;
        self.signal.notify_all();
    }

    /// Terminal transition; never leaves `InterruptedByServer`.
    pub fn interrupt(&self) {
        let mut inner = self.lock.lock().unwrap();
        if inner.state == SpectatorState::InterruptedByServer {
            return;
        }
        inner.state = SpectatorState::InterruptedByServer;
        self.signal.notify_all();
        drop(inner);
        self.reactor_notify.notify_waiters();
        trace!("spectator interrupted");
    }

    /// Resolves once `interrupt()` has been called. The transport loop
    /// selects on this alongside socket I/O to close promptly on server
    /// shutdown or game end.
    pub async fn wait_interrupted(&self) {
        loop {
            // Register interest before checking state, so a `notify_waiters`
            // racing with the check here is never missed.
            let notified = self.reactor_notify.notified();
            if self.state() == SpectatorState::InterruptedByServer {
                return;
            }
            notified.await;
        }
    }

    /// Drains the outbound queue; the reactor calls this in a loop for the
    /// lifetime of the connection.
    pub async fn recv_outbound(&self) -> Option<ServerFrame> {
        self.outbound_rx.recv_async().await.ok()
    }

    pub fn install_interceptor(&self, interceptor: super::chat::Interceptor) -> Result<(), ()> {
        let mut slot = self.interceptor.lock().unwrap();
        if slot.is_some() {
            // At most one interceptor per Session at a time.
            return Err(());
        }
        *slot = Some(interceptor);
        Ok(())
    }

    pub fn remove_interceptor(&self) {
        *self.interceptor.lock().unwrap() = None;
    }

    // ---- worker side ----

    /// Enqueues onto the outbound queue; never blocks the caller beyond a
    /// trivial hand-off. The queue is unbounded, so this only ever fails
    /// once the channel itself is closed, which happens when this
    /// `Spectator` is dropped, the one case where dropping the frame is
    /// correct.
    pub fn send_sync(&self, frame: ServerFrame) {
        if self.outbound_tx.send(frame).is_err() {
            debug!("outbound queue closed; dropping frame");
        }
    }

    /// Blocks until the inbound queue is non-empty or the state is no
    /// longer `CONNECTED`.
    pub fn get_sync(&self) -> Result<String, Disconnected> {
        let mut inner = self.lock.lock().unwrap();
        inner.listening = true;
        loop {
            if let Some(frame) = inner.inbound.pop_front() {
                inner.listening = false;
                return Ok(frame);
            }
            if inner.state != SpectatorState::Connected {
                inner.listening = false;
                return Err(Disconnected::new(inner.state));
            }
            inner = self.signal.wait(inner).unwrap();
        }
    }

    /// Blocks until `state` satisfies `predicate` or `timeout` elapses.
    /// Returns the final state either way; the caller decides what a
    /// timeout means. Used by `Session::reconnect_sync`.
    pub fn wait_for_state(
        &self,
        timeout: std::time::Duration,
        predicate: impl Fn(SpectatorState) -> bool,
    ) -> SpectatorState {
        let inner = self.lock.lock().unwrap();
        if predicate(inner.state) {
            return inner.state;
        }
        let (inner, _timed_out) = self
            .signal
            .wait_timeout_while(inner, timeout, |inner| !predicate(inner.state))
            .unwrap();
        inner.state
    }
}
