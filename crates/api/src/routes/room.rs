use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, state::AppState};

const MAX_FIELD_LEN: usize = 256;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub post_id: String,
    pub host_user_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
    pub websocket_url: String,
    pub status: &'static str,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<CreateRoomResponse>), ApiError> {
    if body.post_id.is_empty() || body.post_id.len() > MAX_FIELD_LEN {
        return Err(ApiError::BadRequest("post_id is required and must be \u{2264}256 bytes".into()));
    }
    if body.host_user_id.is_empty() || body.host_user_id.len() > MAX_FIELD_LEN {
        return Err(ApiError::BadRequest(
            "host_user_id is required and must be \u{2264}256 bytes".into(),
        ));
    }

    let room_id = state
        .registry
        .create_room(body.post_id, body.host_user_id)
        .await
        .map_err(ApiError::from)?;

    let websocket_url = format!(
        "ws://{}:{}/room/{}/host",
        state.settings.app.host, state.settings.signaling.websocket_port, room_id
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            room_id: room_id.to_string(),
            websocket_url,
            status: "created",
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct StopRoomResponse {
    pub status: &'static str,
    pub room_id: String,
}

pub async fn stop(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<StopRoomResponse>, ApiError> {
    let id = room_id.clone().into();
    state.registry.stop_room(&id).map_err(ApiError::from)?;
    Ok(Json(StopRoomResponse {
        status: "stopped",
        room_id,
    }))
}

pub async fn stats(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<sfu_core::registry::RoomStats>, ApiError> {
    let id = room_id.into();
    state
        .registry
        .room_stats(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("room not found".into()))
}

pub async fn server_stats(State(state): State<AppState>) -> Json<sfu_core::registry::ServerStats> {
    Json(state.registry.server_stats())
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
