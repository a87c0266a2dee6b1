//! Network adapter modules: the per-connection transport loop and the
//! WebSocket upgrade handlers that hand a socket off to it.

pub mod transport;
pub mod ws;

pub use transport::run_transport;
pub use ws::{connect_session, connect_spectator};

