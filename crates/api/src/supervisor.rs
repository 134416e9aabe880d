use sfu_core::RoomId;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use crate::state::AppState;
use crate::{build_control_router, build_signaling_router};

const REAP_INTERVAL: Duration = Duration::from_secs(30);

/// Runs the control plane and signaling listeners side by side, reaps idle
/// rooms on a fixed interval, and exits the process (after a short grace
/// period) the moment any mediasoup worker dies. Boot order follows
/// configuration -> worker pool -> registry -> fan-out -> control plane ->
/// signaling server; shutdown tears the same stack down in reverse.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let control_addr = format!("{}:{}", state.settings.app.host, state.settings.app.port);
    let signaling_addr = format!(
        "{}:{}",
        state.settings.app.host, state.settings.signaling.websocket_port
    );

    let control_listener = tokio::net::TcpListener::bind(&control_addr).await?;
    let signaling_listener = tokio::net::TcpListener::bind(&signaling_addr).await?;
    info!(%control_addr, "control plane listening");
    info!(%signaling_addr, "signaling server listening");

    let control_router = build_control_router(state.clone());
    let signaling_router = build_signaling_router(state.clone());

    let reaper = tokio::spawn(reap_loop(state.clone()));
    let fatal_watch = tokio::spawn(watch_worker_fatal(state.clone()));

    tokio::select! {
        result = axum::serve(control_listener, control_router) => {
            result?;
        }
        result = axum::serve(signaling_listener, signaling_router) => {
            result?;
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, stopping every room");
        }
    }

    reaper.abort();
    fatal_watch.abort();
    shutdown(&state).await;
    Ok(())
}

async fn reap_loop(state: AppState) {
    let timeout = Duration::from_secs(state.settings.signaling.idle_timeout_seconds);
    let mut ticker = tokio::time::interval(REAP_INTERVAL);
    loop {
        ticker.tick().await;
        let reaped = state.registry.reap_idle(timeout);
        if !reaped.is_empty() {
            info!(count = reaped.len(), "reaped idle rooms");
        }
        let stats = state.registry.server_stats();
        if stats.room_count > 0 || stats.peer_count > 0 {
            info!(
                room_count = stats.room_count,
                peer_count = stats.peer_count,
                "server stats"
            );
        }
    }
}

/// A dead mediasoup worker means every router on it is unusable for new
/// operations; rather than leak rooms in an undefined state, exit and let
/// the process supervisor (systemd, k8s) restart cleanly.
async fn watch_worker_fatal(state: AppState) {
    let mut fatal_rx = state.worker_pool.watch_fatal();
    if fatal_rx.changed().await.is_err() {
        return;
    }
    if *fatal_rx.borrow() {
        warn!("mediasoup worker died, exiting after a short grace period");
        tokio::time::sleep(Duration::from_secs(2)).await;
        std::process::exit(1);
    }
}

async fn shutdown(state: &AppState) {
    let room_ids: Vec<RoomId> = state
        .registry
        .server_stats()
        .rooms
        .into_iter()
        .map(|r| r.room_id.into())
        .collect();
    for room_id in room_ids {
        let _ = state.registry.stop_room(&room_id);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let terminate = async {
        if let Ok(mut sig) = signal(SignalKind::terminate()) {
            sig.recv().await;
        }
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
