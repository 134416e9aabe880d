use sfu_api::{state::AppState, supervisor};
use sfu_config::Settings;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "sfu_api={level},sfu_core={level},tower_http={level}",
            level = settings.logging.level
        )
        .into()
    });

    // `_file_guard` flushes the non-blocking file writer on drop; keeping it
    // bound for the lifetime of `main` is what actually makes that happen.
    let _file_guard = if let Some(path) = settings.logging.file.as_ref() {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let console_layer = settings
            .logging
            .console
            .then(|| tracing_subscriber::fmt::layer());
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(console_layer)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        None
    };
    if sfu_config::Environment::current() == sfu_config::Environment::Production {
        if let Err(errors) = settings.validate_production() {
            for error in &errors {
                tracing::error!(%error, "invalid production configuration");
            }
            anyhow::bail!("refusing to start with invalid production configuration");
        }
    }

    info!(
        host = %settings.app.host,
        port = settings.app.port,
        ws_port = settings.signaling.websocket_port,
        "starting signaling server"
    );

    let state = AppState::new(settings).await?;
    supervisor::run(state).await
}
