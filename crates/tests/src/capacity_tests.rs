use crate::fixtures::{test_app::TestApp, test_settings};
use axum::http::StatusCode;

#[tokio::test]
async fn second_room_over_max_rooms_is_rejected_then_succeeds_after_stop() {
    let mut settings = test_settings::base();
    settings.limits.max_rooms = 1;
    let app = TestApp::spawn(settings).await;

    let (status, body) = app.create_room("p1", "u1").await;
    assert_eq!(status, StatusCode::CREATED);
    let room_id = body["room_id"].as_str().unwrap().to_string();

    let (status, _) = app.create_room("p2", "u2").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(app.stop_room(&room_id).await, StatusCode::OK);

    let (status, _) = app.create_room("p3", "u3").await;
    assert_eq!(status, StatusCode::CREATED);
}
