mod support;

use serde_json::json;

#[tokio::test]
async fn creating_a_room_lists_its_seats_as_free() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let registry = client
        .request(reqwest::Method::OPTIONS, format!("{base_url}/room"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(registry.status(), reqwest::StatusCode::OK);
    let registry: serde_json::Value = registry.json().await.expect("valid json");
    assert!(
        registry["enum"]
            .as_array()
            .expect("games array")
            .iter()
            .any(|g| g == "tic_tac_toe")
    );

    let payload = json!({
        "game": "tic_tac_toe",
        "agents": ["network", "network"],
    });
    let create = client
        .post(format!("{base_url}/room"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(create.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = create.json().await.expect("valid json");
    let room_id = body["roomID"].as_u64().expect("roomID present");

    let listing = client
        .get(format!("{base_url}/room/list"))
        .send()
        .await
        .expect("request should succeed")
        .json::<serde_json::Value>()
        .await
        .expect("valid json");
    let room = &listing[room_id.to_string()];
    assert_eq!(room["seats"]["0"], "FREE");
    assert_eq!(room["seats"]["1"], "FREE");
}

#[tokio::test]
async fn creating_a_room_for_an_unknown_game_is_rejected() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let payload = json!({
        "game": "chess",
        "agents": ["network", "network"],
    });
    let create = client
        .post(format!("{base_url}/room"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(create.status(), reqwest::StatusCode::BAD_REQUEST);
}
