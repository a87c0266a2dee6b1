mod support;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use tokio_tungstenite::tungstenite::Error as WsError;

async fn create_tic_tac_toe_room(base_url: &str) -> u64 {
    let client = reqwest::Client::new();
    let payload = json!({
        "game": "tic_tac_toe",
        "agents": ["network", "network"],
    });
    let response = client
        .post(format!("{base_url}/room"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    let body: serde_json::Value = response.json().await.expect("valid json");
    body["roomID"].as_u64().expect("roomID present")
}

/// Attempts the WebSocket handshake and returns the HTTP status the server
/// rejected it with. Panics if the handshake actually upgrades.
async fn expect_rejected(url: &str) -> StatusCode {
    match tokio_tungstenite::connect_async(url).await {
        Ok(_) => panic!("expected the handshake to be rejected: {url}"),
        Err(WsError::Http(response)) => {
            StatusCode::from_u16(response.status().as_u16()).expect("valid status code")
        }
        Err(other) => panic!("expected an HTTP rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn connecting_to_an_unknown_seat_is_not_found() {
    let base_url = support::ensure_server();
    let room_id = create_tic_tac_toe_room(base_url).await;

    let url = support::ws_url(base_url, &format!("/r/{room_id}/ws/9?username=alice"));
    assert_eq!(expect_rejected(&url).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn claiming_a_seat_already_held_is_rejected() {
    let base_url = support::ensure_server();
    let room_id = create_tic_tac_toe_room(base_url).await;

    let seat0_url = support::ws_url(base_url, &format!("/r/{room_id}/ws/0?username=alice"));
    let (_held_stream, _) = tokio_tungstenite::connect_async(&seat0_url)
        .await
        .expect("first claim should succeed");

    assert_eq!(expect_rejected(&seat0_url).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reclaiming_a_seat_as_a_different_user_is_forbidden() {
    let base_url = support::ensure_server();
    let room_id = create_tic_tac_toe_room(base_url).await;

    let alice_url = support::ws_url(base_url, &format!("/r/{room_id}/ws/0?username=alice"));
    let (alice_stream, _) = tokio_tungstenite::connect_async(&alice_url)
        .await
        .expect("first claim should succeed");
    drop(alice_stream); // seat returns to FREE, but stays bound to "alice (Guest)".

    let bob_url = support::ws_url(base_url, &format!("/r/{room_id}/ws/0?username=bob"));

    // The server notices the disconnect asynchronously; poll briefly rather
    // than assume it has already happened by the time we reconnect.
    let mut last_status = None;
    for _ in 0..50 {
        let status = expect_rejected(&bob_url).await;
        if status == StatusCode::FORBIDDEN {
            return;
        }
        last_status = Some(status);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("seat never settled into FORBIDDEN for a different user: {last_status:?}");
}
