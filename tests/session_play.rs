mod support;

use std::collections::VecDeque;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

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

/// Plays a scripted game on one seat: answers every `choice` frame with the
/// next address in `moves`, and returns the text of the final `message`
/// frame (the win/draw announcement every seat receives).
async fn play_seat(ws_url: String, mut moves: VecDeque<&'static str>) -> String {
    let (mut stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("seat should connect");

    loop {
        let message = stream
            .next()
            .await
            .expect("socket closed before game ended")
            .expect("websocket read error");
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(frame) = serde_json::from_str::<serde_json::Value>(&text) else {
            continue; // bare JSON arrays are ViewUpdate frames; not needed here.
        };
        match frame.get("type").and_then(|t| t.as_str()) {
            Some("choice") => {
                let address = moves.pop_front().expect("ran out of scripted moves");
                stream
                    .send(Message::Text(address.into()))
                    .await
                    .expect("send should succeed");
            }
            Some("message") => {
                let text = frame["text"].as_str().unwrap_or_default().to_string();
                if text.contains("wins") || text.contains("draw") {
                    return text;
                }
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn two_seats_play_to_a_win() {
    let base_url = support::ensure_server();
    let room_id = create_tic_tac_toe_room(base_url).await;

    let seat0_url = support::ws_url(base_url, &format!("/r/{room_id}/ws/0?username=alice"));
    let seat1_url = support::ws_url(base_url, &format!("/r/{room_id}/ws/1?username=bob"));

    // Seat 0 (X) takes the top row; seat 1 (O) plays elsewhere and never
    // gets to move a third time.
    let seat0 = tokio::spawn(play_seat(
        seat0_url,
        VecDeque::from(["/cell/0", "/cell/1", "/cell/2"]),
    ));
    let seat1 = tokio::spawn(play_seat(seat1_url, VecDeque::from(["/cell/3", "/cell/4"])));

    let (result0, result1) = tokio::join!(seat0, seat1);
    let announcement0 = result0.expect("seat 0 task should not panic");
    let announcement1 = result1.expect("seat 1 task should not panic");

    assert!(announcement0.contains("seat 0 wins"));
    assert_eq!(announcement0, announcement1);
}
