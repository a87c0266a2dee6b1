// Framework bootstrap for the room-hosting runtime.

use crate::core::server::Server;
use crate::frameworks::config;
use crate::game::TicTacToe;
use crate::interface_adapters::auth::login_handler;
use crate::interface_adapters::net::{connect_session, connect_spectator};
use crate::interface_adapters::routes;
use crate::interface_adapters::state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    let app = Router::new()
        .route("/login", post(login_handler))
        .route(
            "/room",
            post(routes::create_room).options(routes::game_registry),
        )
        .route("/room/list", get(routes::list_rooms))
        .route("/room/list/watch", get(routes::watch_rooms))
        .route("/r/{room_id}/html", get(routes::render_room))
        .route("/r/{room_id}/ws/watch", get(connect_spectator))
        .route("/r/{room_id}/ws/{seat}", get(connect_session))
        .with_state(state);

    tracing::info!(%address, "listening");

    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

/// Closed game registry; games are added here, not discovered dynamically.
fn build_state() -> Arc<AppState> {
    let mut registry: HashMap<String, crate::core::server::GameFactory> = HashMap::new();
    registry.insert("tic_tac_toe".to_string(), TicTacToe::factory());

    let server = Server::new(
        registry,
        tokio::runtime::Handle::current(),
        config::reconnect_timeout(),
    );

    Arc::new(AppState { server })
}
