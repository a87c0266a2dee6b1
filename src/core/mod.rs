//! The networking / session mediation core: Server → Room →
//! Spectator/Session lifecycle, chat fan-out, and the Agent binding.

pub mod agent;
pub mod chat;
pub mod errors;
pub mod frame;
pub mod game_logic;
pub mod room;
pub mod server;
pub mod session;
pub mod spectator;
