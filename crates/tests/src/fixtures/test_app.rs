use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sfu_api::state::AppState;
use sfu_config::Settings;
use sfu_core::RoomRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;

/// A running signaling server plus a ready-to-call control-plane router, for
/// one test. The control plane is exercised in-process via `oneshot`; the
/// signaling endpoint is bound on a real loopback port since WebSocket
/// upgrades need an actual socket.
pub struct TestApp {
    control_router: Router,
    pub ws_addr: SocketAddr,
    pub registry: Arc<RoomRegistry>,
}

impl TestApp {
    pub async fn spawn(settings: Settings) -> Self {
        let state = AppState::new(settings)
            .await
            .expect("failed to build AppState (is a mediasoup worker binary on PATH?)");

        let control_router = sfu_api::build_control_router(state.clone());
        let ws_router = sfu_api::build_signaling_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind signaling listener");
        let ws_addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, ws_router).await;
        });

        Self {
            control_router,
            ws_addr,
            registry: state.registry.clone(),
        }
    }

    pub fn ws_url(&self, room_id: &str, role: &str) -> String {
        format!("ws://{}/room/{}/{}", self.ws_addr, room_id, role)
    }

    pub async fn create_room(&self, post_id: &str, host_user_id: &str) -> (StatusCode, Value) {
        let body = serde_json::json!({ "post_id": post_id, "host_user_id": host_user_id });
        self.post("/room/create", body).await
    }

    pub async fn stop_room(&self, room_id: &str) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/room/{room_id}/stop"))
            .body(Body::empty())
            .unwrap();
        self.control_router.clone().oneshot(request).await.unwrap().status()
    }

    pub async fn room_stats(&self, room_id: &str) -> StatusCode {
        self.room_stats_json(room_id).await.0
    }

    pub async fn room_stats_json(&self, room_id: &str) -> (StatusCode, Value) {
        self.get(&format!("/room/{room_id}/stats")).await
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.respond(request).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.respond(request).await
    }

    async fn respond(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.control_router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}
