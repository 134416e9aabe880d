use axum::{
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use sfu_core::signaling::{ClientMessage, PeerSession, ServerMessage};
use sfu_core::{RegistryError, Role, RoomId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_username")]
    pub username: String,
}

fn default_username() -> String {
    "Anonymous".to_string()
}

/// Upgrades `/room/{room_id}/{host|viewer}` into one signaling session. The
/// role comes from the path, not a client-chosen field, so a viewer can
/// never self-elevate to host by lying in a message body. Only capacity is
/// checked before the upgrade completes; invalid role, missing room, and
/// registry failures are reported as a WebSocket close frame from inside
/// the upgrade closure, since the protocol defines no HTTP-level failure
/// mode for them.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Path((room_id, role)): Path<(String, String)>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let peer_count = state.registry.server_stats().peer_count;
    if peer_count >= state.settings.limits.max_connections as usize {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "server is at connection capacity",
        )
            .into_response();
    }

    let room_id: RoomId = room_id.into();
    let user_id = params.user_id.unwrap_or_else(|| nanoid::nanoid!());
    let username = params.username;
    let idle_timeout = Duration::from_secs(state.settings.signaling.idle_timeout_seconds);

    ws.on_upgrade(move |socket| async move {
        let role = match role.as_str() {
            "host" => Role::Host,
            "viewer" => Role::Viewer,
            _ => {
                close_immediately(socket, 1008, "role must be 'host' or 'viewer'").await;
                return;
            }
        };

        let Some(room) = state.registry.get_room(&room_id) else {
            close_immediately(socket, 1008, "room not found").await;
            return;
        };
        let router = room.router.clone();
        drop(room);

        let (peer_id, commands) =
            match state
                .registry
                .register_peer(&room_id, user_id, username, role)
            {
                Ok(pair) => pair,
                Err(RegistryError::NoRoom) => {
                    close_immediately(socket, 1008, "room not found").await;
                    return;
                }
                Err(e) => {
                    close_immediately(socket, 1011, &e.to_string()).await;
                    return;
                }
            };

        let ice_servers = state.settings.ice.servers.clone();
        let session = PeerSession::new(
            peer_id,
            room_id,
            role,
            router,
            state.registry.clone(),
            state.fanout.clone(),
            Arc::new(state.settings.mediasoup.clone()),
            Arc::new(state.settings.media.clone()),
            ice_servers,
        );
        run_session(socket, session, commands, idle_timeout).await;
    })
}

/// Sends a close frame on a socket that was upgraded only to be rejected
/// (invalid role, missing room, or a registry failure at connect time).
async fn close_immediately(mut socket: WebSocket, code: u16, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}

/// What the session loop should do after handling one inbound frame or
/// command.
enum FrameOutcome {
    Continue,
    Close(u16),
}

/// One task per connection: drains inbound WebSocket frames, the peer's own
/// command queue, and a read-idle deadline with a single `select!`, so every
/// mutation of this session happens on this one task and in the order things
/// actually occurred.
async fn run_session(
    socket: WebSocket,
    mut session: PeerSession,
    mut commands: tokio::sync::mpsc::UnboundedReceiver<sfu_core::registry::PeerCommand>,
    idle_timeout: Duration,
) {
    let peer_id = session.peer_id().clone();
    info!(%peer_id, "signaling session opened");

    let (mut sink, mut stream) = socket.split();

    if let Err(e) = send(&mut sink, session.welcome()).await {
        warn!(%peer_id, %e, "failed to send welcome frame");
        session.close().await;
        return;
    }

    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);
    let mut close_code: u16 = 1000;

    loop {
        tokio::select! {
            frame = stream.next() => {
                let Some(frame) = frame else { break };
                idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);
                match frame {
                    Ok(Message::Text(text)) => {
                        match handle_text(&mut session, &mut sink, &text).await {
                            FrameOutcome::Continue => {}
                            FrameOutcome::Close(code) => {
                                close_code = code;
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Ping(data)) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!(%peer_id, %e, "websocket read error");
                        break;
                    }
                }
            }
            command = commands.recv() => {
                let Some(command) = command else { break };
                let effect = session.handle_command(command).await;
                for message in effect.messages {
                    if send(&mut sink, message).await.is_err() {
                        break;
                    }
                }
                if let Some(code) = effect.close_code {
                    close_code = code;
                    break;
                }
            }
            _ = &mut idle => {
                debug!(%peer_id, "closing session after read-idle timeout");
                break;
            }
        }
    }

    session.close().await;
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: close_code,
            reason: close_reason(close_code).into(),
        })))
        .await;
    info!(%peer_id, close_code, "signaling session closed");
}

fn close_reason(code: u16) -> &'static str {
    match code {
        1008 => "invalid path or missing room",
        1011 => "server-side fatal error",
        _ => "session closed",
    }
}

/// Decodes one client frame and runs it through the session state machine.
async fn handle_text(
    session: &mut PeerSession,
    sink: &mut SplitSink<WebSocket, Message>,
    text: &str,
) -> FrameOutcome {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            let _ = send(
                sink,
                ServerMessage::Error {
                    code: "VALIDATION".to_string(),
                    message: format!("malformed message: {e}"),
                },
            )
            .await;
            return FrameOutcome::Continue;
        }
    };

    match session.handle_client(message).await {
        Ok(effect) => {
            for reply in effect.messages {
                if send(sink, reply).await.is_err() {
                    return FrameOutcome::Close(1000);
                }
            }
            match effect.close_code {
                Some(code) => FrameOutcome::Close(code),
                None => FrameOutcome::Continue,
            }
        }
        Err(err) => {
            let fatal = err.is_fatal_to_session();
            let _ = send(
                sink,
                ServerMessage::Error {
                    code: err.code().to_string(),
                    message: err.to_string(),
                },
            )
            .await;
            if fatal {
                FrameOutcome::Close(1011)
            } else {
                FrameOutcome::Continue
            }
        }
    }
}

async fn send(
    sink: &mut SplitSink<WebSocket, Message>,
    message: ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(&message).unwrap_or_default();
    sink.send(Message::text(text)).await
}
