use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

/// Per-seat reconnect window. Overridable for tests that would otherwise
/// wait out the real default.
pub fn reconnect_timeout() -> Duration {
    let secs = env::var("RECONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(180);
    Duration::from_secs(secs)
}
