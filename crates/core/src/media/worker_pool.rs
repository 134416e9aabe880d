use mediasoup::router::{Router, RouterOptions};
use mediasoup::worker::{Worker, WorkerSettings};
use mediasoup::worker_manager::WorkerManager;
use sfu_config::{MediaSettings, MediasoupSettings};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tracing::{error, info};

use super::codecs::media_codecs;

/// Pool of mediasoup workers with round-robin router allocation. Worker
/// death is fatal: the pool never returns a per-operation error for it, it
/// flips `fatal` and lets the supervisor decide how the process exits.
pub struct WorkerPool {
    workers: Vec<Worker>,
    next: AtomicUsize,
    media: MediaSettings,
    fatal_tx: watch::Sender<bool>,
    fatal_rx: watch::Receiver<bool>,
}

impl WorkerPool {
    pub async fn new(settings: &MediasoupSettings, media: MediaSettings) -> anyhow::Result<Self> {
        let worker_manager = WorkerManager::new();
        let num_workers = if settings.num_workers > 0 {
            settings.num_workers
        } else {
            (num_cpus::get().saturating_sub(1)).max(1) as u32
        };

        let mut workers = Vec::with_capacity(num_workers as usize);
        let (fatal_tx, fatal_rx) = watch::channel(false);

        for i in 0..num_workers {
            let mut worker_settings = WorkerSettings::default();
            worker_settings.rtc_port_range = settings.rtc_min_port..=settings.rtc_max_port;

            let worker = worker_manager
                .create_worker(worker_settings)
                .await
                .map_err(|e| anyhow::anyhow!("failed to create mediasoup worker {}: {}", i, e))?;

            let worker_id = worker.id();
            let fatal_tx = fatal_tx.clone();
            worker
                .on_dead(move |reason| {
                    error!(?reason, %worker_id, "mediasoup worker died, marking pool fatal");
                    let _ = fatal_tx.send(true);
                })
                .detach();

            info!(worker_id = %worker.id(), index = i, "mediasoup worker created");
            workers.push(worker);
        }

        Ok(Self {
            workers,
            next: AtomicUsize::new(0),
            media,
            fatal_tx,
            fatal_rx,
        })
    }

    /// Allocates a router on the next worker in round-robin order,
    /// pre-configured with the fixed codec table. Fails only if the pool
    /// has no workers left to try (which in practice means they're all
    /// dead, in which case `watch_fatal` will also have fired).
    pub async fn create_router(&self) -> anyhow::Result<Router> {
        if self.workers.is_empty() {
            anyhow::bail!("no mediasoup workers available");
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        let worker = &self.workers[idx];
        let router_options = RouterOptions::new(media_codecs(&self.media));
        worker
            .create_router(router_options)
            .await
            .map_err(|e| anyhow::anyhow!("failed to create router: {}", e))
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Resolves once a worker has died. The supervisor awaits this and
    /// terminates the process; callers of `create_router` never see a
    /// per-operation "worker died" error.
    pub fn watch_fatal(&self) -> watch::Receiver<bool> {
        self.fatal_rx.clone()
    }

    #[cfg(test)]
    pub(crate) fn trigger_fatal_for_test(&self) {
        let _ = self.fatal_tx.send(true);
    }
}
