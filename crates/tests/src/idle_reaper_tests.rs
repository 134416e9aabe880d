use crate::fixtures::{test_app::TestApp, test_settings};
use axum::http::StatusCode;
use std::time::Duration;

#[tokio::test]
async fn room_with_no_host_is_reaped_and_then_returns_not_found() {
    let settings = test_settings::base();
    let app = TestApp::spawn(settings).await;

    let (status, body) = app.create_room("p1", "u1").await;
    assert_eq!(status, StatusCode::CREATED);
    let room_id = body["room_id"].as_str().unwrap().to_string();

    let reaped = app.registry.reap_idle(Duration::from_secs(1));
    assert_eq!(reaped.len(), 1);

    assert_eq!(app.room_stats(&room_id).await, StatusCode::NOT_FOUND);
}
