use crate::fixtures::{test_app::TestApp, test_settings};
use crate::ws_helpers::{connect, recv_close, recv_json, send_json};
use axum::http::StatusCode;
use std::time::Duration;

async fn welcome(stream: &mut crate::ws_helpers::WsStream) -> serde_json::Value {
    recv_json(stream, Duration::from_secs(2))
        .await
        .expect("expected a welcome frame")
}

#[tokio::test]
async fn host_and_viewer_each_negotiate_their_own_transport() {
    let settings = test_settings::base();
    let app = TestApp::spawn(settings).await;
    let (_, body) = app.create_room("p1", "u1").await;
    let room_id = body["room_id"].as_str().unwrap().to_string();

    let mut host = connect(&app.ws_url(&room_id, "host")).await;
    assert_eq!(welcome(&mut host).await["type"], "welcome");

    send_json(
        &mut host,
        serde_json::json!({ "type": "get_router_rtp_capabilities" }),
    )
    .await;
    let caps = recv_json(&mut host, Duration::from_secs(2)).await.unwrap();
    assert_eq!(caps["type"], "router_rtp_capabilities");

    send_json(
        &mut host,
        serde_json::json!({ "type": "get_transport", "data": { "direction": "send" } }),
    )
    .await;
    let send_transport = recv_json(&mut host, Duration::from_secs(2)).await.unwrap();
    assert_eq!(send_transport["type"], "transport_created");
    assert!(send_transport["data"]["dtls_parameters"].is_object());
    assert!(send_transport["data"]["ice_candidates"].is_array());

    let mut viewer = connect(&app.ws_url(&room_id, "viewer")).await;
    assert_eq!(welcome(&mut viewer).await["type"], "welcome");

    send_json(
        &mut viewer,
        serde_json::json!({ "type": "get_transport", "data": { "direction": "recv" } }),
    )
    .await;
    let recv_transport = recv_json(&mut viewer, Duration::from_secs(2)).await.unwrap();
    assert_eq!(recv_transport["type"], "transport_created");
    assert!(recv_transport["data"]["dtls_parameters"].is_object());
}

#[tokio::test]
async fn host_disconnect_cascades_a_close_to_the_viewer() {
    let settings = test_settings::base();
    let app = TestApp::spawn(settings).await;
    let (_, body) = app.create_room("p1", "u1").await;
    let room_id = body["room_id"].as_str().unwrap().to_string();

    let mut host = connect(&app.ws_url(&room_id, "host")).await;
    assert_eq!(welcome(&mut host).await["type"], "welcome");

    let mut viewer = connect(&app.ws_url(&room_id, "viewer")).await;
    assert_eq!(welcome(&mut viewer).await["type"], "welcome");

    drop(host);

    let code = recv_close(&mut viewer, Duration::from_secs(2)).await;
    assert!(code.is_some(), "viewer should have seen a close frame");

    assert_eq!(app.room_stats(&room_id).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn two_viewers_can_join_the_same_room_simultaneously() {
    let settings = test_settings::base();
    let app = TestApp::spawn(settings).await;
    let (_, body) = app.create_room("p1", "u1").await;
    let room_id = body["room_id"].as_str().unwrap().to_string();

    let mut host = connect(&app.ws_url(&room_id, "host")).await;
    assert_eq!(welcome(&mut host).await["type"], "welcome");

    let url = app.ws_url(&room_id, "viewer");
    let (mut viewer_a, mut viewer_b) =
        tokio::join!(connect(&url), connect(&url));

    let (a, b) = tokio::join!(welcome(&mut viewer_a), welcome(&mut viewer_b));
    assert_eq!(a["type"], "welcome");
    assert_eq!(b["type"], "welcome");

    let (_, stats) = app.room_stats_json(&room_id).await;
    assert_eq!(stats["viewer_count"], 2);
}
