use sfu_config::Settings;
use sfu_core::{FanoutCoordinator, RoomRegistry, WorkerPool};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<RoomRegistry>,
    pub fanout: Arc<FanoutCoordinator>,
    pub worker_pool: Arc<WorkerPool>,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let worker_pool = Arc::new(WorkerPool::new(&settings.mediasoup, settings.media.clone()).await?);
        let registry = Arc::new(RoomRegistry::new(worker_pool.clone(), &settings.limits));
        let fanout = Arc::new(FanoutCoordinator::new(registry.clone()));

        Ok(Self {
            settings: Arc::new(settings),
            registry,
            fanout,
            worker_pool,
        })
    }
}
