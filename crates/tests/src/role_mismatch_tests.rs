use crate::fixtures::{test_app::TestApp, test_settings};
use crate::ws_helpers::{connect, recv_json, send_json};
use std::time::Duration;

#[tokio::test]
async fn host_requesting_a_viewer_only_transport_gets_role_mismatch_and_stays_open() {
    let settings = test_settings::base();
    let app = TestApp::spawn(settings).await;
    let (_, body) = app.create_room("p1", "u1").await;
    let room_id = body["room_id"].as_str().unwrap().to_string();

    let mut host = connect(&app.ws_url(&room_id, "host")).await;
    let welcome = recv_json(&mut host, Duration::from_secs(2)).await.unwrap();
    assert_eq!(welcome["type"], "welcome");

    send_json(
        &mut host,
        serde_json::json!({
            "type": "get_transport",
            "data": { "direction": "recv" }
        }),
    )
    .await;
    let reply = recv_json(&mut host, Duration::from_secs(2)).await.unwrap();
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["data"]["code"], "ROLE_MISMATCH");

    // the session is still alive: the matching send-side request succeeds.
    send_json(
        &mut host,
        serde_json::json!({
            "type": "get_transport",
            "data": { "direction": "send" }
        }),
    )
    .await;
    let transport_reply = recv_json(&mut host, Duration::from_secs(2)).await.unwrap();
    assert_eq!(transport_reply["type"], "transport_created");
}
