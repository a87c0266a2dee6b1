//! Username extraction and the `/login` cookie handshake.
//! No external auth service: the only identity a client carries is an
//! opaque username, grounded on `room.py`'s `get_request_username` (cookie
//! first, else a query parameter tagged `(Guest)`).

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;

const COOKIE_NAME: &str = "username";

/// Looks for a `username` cookie first; falls back to a `?username=` query
/// parameter suffixed with `" (Guest)"`. Returns `None` if neither is
/// present, which callers turn into a 401.
pub fn extract_username(headers: &HeaderMap, query_username: Option<&str>) -> Option<String> {
    if let Some(cookie) = find_cookie(headers, COOKIE_NAME) {
        return Some(cookie);
    }
    query_username.map(|name| format!("{name} (Guest)"))
}

fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[derive(Debug, serde::Deserialize)]
pub struct LoginQuery {
    pub username: String,
}

/// `POST /login`: sets an opaque username cookie, no password or external
/// verification.
pub async fn login_handler(
    State(_state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let username = query.username.trim();
    if username.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(ErrorResponse {
                error: "username is required".to_string(),
            }),
        )
            .into_response();
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("{COOKIE_NAME}={username}; Path=/")) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}
