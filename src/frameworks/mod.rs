// Outermost layer: process bootstrap, runtime config, axum wiring.

pub mod config;
pub mod server;
