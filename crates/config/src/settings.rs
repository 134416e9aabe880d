use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::env;

/// Deployment environment, derived from `NODE_ENV`. Only `production` turns
/// on the stricter validation in [`Settings::validate_production`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn current() -> Self {
        match env::var("NODE_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub signaling: SignalingSettings,
    pub limits: LimitsSettings,
    pub ice: IceSettings,
    pub media: MediaSettings,
    pub mediasoup: MediasoupSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignalingSettings {
    pub websocket_port: u16,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsSettings {
    pub max_connections: u32,
    pub max_rooms: u32,
    pub max_viewers_per_room: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IceServerConfig {
    pub urls: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IceSettings {
    #[serde(default)]
    pub servers: Vec<IceServerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoSettings {
    pub codec: String,
    pub max_bitrate_kbps: u32,
    pub min_bitrate_kbps: u32,
    pub target_bitrate_kbps: u32,
    pub max_framerate: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioSettings {
    pub codec: String,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaSettings {
    pub video: VideoSettings,
    pub audio: AudioSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediasoupSettings {
    pub num_workers: u32,
    pub listen_ip: String,
    #[serde(default)]
    pub announced_ip: Option<String>,
    pub rtc_min_port: u16,
    pub rtc_max_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
    pub console: bool,
}

impl Settings {
    /// Loads defaults from `config/default.toml` / `config/local.toml` (both
    /// optional), then layers the flat environment-variable overrides listed
    /// in the external interfaces table on top — those don't share a common
    /// prefix the way a `config::Environment` source expects, so they're
    /// applied by hand in [`Settings::apply_env_overrides`].
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("signaling.websocket_port", 3001)?
            .set_default("signaling.idle_timeout_seconds", 60)?
            .set_default("limits.max_connections", 10_000)?
            .set_default("limits.max_rooms", 1000)?
            .set_default("limits.max_viewers_per_room", 500)?
            .set_default("mediasoup.num_workers", 0)?
            .set_default("mediasoup.listen_ip", "0.0.0.0")?
            .set_default("mediasoup.rtc_min_port", 40000)?
            .set_default("mediasoup.rtc_max_port", 49999)?
            .set_default("media.video.codec", "vp8")?
            .set_default("media.video.max_bitrate_kbps", 2500)?
            .set_default("media.video.min_bitrate_kbps", 100)?
            .set_default("media.video.target_bitrate_kbps", 1000)?
            .set_default("media.video.max_framerate", 30)?
            .set_default("media.audio.codec", "opus")?
            .set_default("media.audio.bitrate_kbps", 64)?
            .set_default("media.audio.sample_rate", 48000)?
            .set_default("logging.level", "info")?
            .set_default("logging.console", true)?
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("HOST") {
            self.app.host = v;
        }
        if let Some(v) = env_parsed::<u16>("PORT") {
            self.app.port = v;
        }
        if let Some(v) = env_parsed::<u16>("WEBSOCKET_PORT") {
            self.signaling.websocket_port = v;
        }
        if let Ok(v) = env::var("ANNOUNCED_IP") {
            self.mediasoup.announced_ip = Some(v);
        }
        if let Ok(stun) = env::var("STUN_URL") {
            self.ice.servers.push(IceServerConfig {
                urls: stun,
                username: None,
                credential: None,
            });
        }
        if let Ok(turn) = env::var("TURN_URL") {
            self.ice.servers.push(IceServerConfig {
                urls: turn,
                username: env::var("TURN_USERNAME").ok(),
                credential: env::var("TURN_CREDENTIAL").ok(),
            });
        }
        if let Some(v) = env_parsed::<u32>("MAX_ROOMS") {
            self.limits.max_rooms = v;
        }
        if let Some(v) = env_parsed::<u32>("MAX_VIEWERS_PER_ROOM") {
            self.limits.max_viewers_per_room = v;
        }
        if let Some(v) = env_parsed::<u64>("IDLE_TIMEOUT_SECONDS") {
            self.signaling.idle_timeout_seconds = v;
        }
        if let Some(v) = env_parsed::<u32>("MAX_CONNECTIONS") {
            self.limits.max_connections = v;
        }
        if let Ok(v) = env::var("VIDEO_CODEC") {
            self.media.video.codec = v;
        }
        if let Some(v) = env_parsed::<u32>("VIDEO_MAX_BITRATE_KBPS") {
            self.media.video.max_bitrate_kbps = v;
        }
        if let Some(v) = env_parsed::<u32>("VIDEO_MIN_BITRATE_KBPS") {
            self.media.video.min_bitrate_kbps = v;
        }
        if let Some(v) = env_parsed::<u32>("VIDEO_TARGET_BITRATE_KBPS") {
            self.media.video.target_bitrate_kbps = v;
        }
        if let Some(v) = env_parsed::<u32>("VIDEO_MAX_FRAMERATE") {
            self.media.video.max_framerate = v;
        }
        if let Ok(v) = env::var("AUDIO_CODEC") {
            self.media.audio.codec = v;
        }
        if let Some(v) = env_parsed::<u32>("AUDIO_BITRATE_KBPS") {
            self.media.audio.bitrate_kbps = v;
        }
        if let Some(v) = env_parsed::<u32>("AUDIO_SAMPLE_RATE") {
            self.media.audio.sample_rate = v;
        }
        if let Ok(v) = env::var("LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Validates the production invariants from the configuration
    /// component's contract, collecting every violation instead of failing
    /// on the first — no partial start is permitted.
    pub fn validate_production(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.mediasoup.announced_ip.as_deref().unwrap_or("").is_empty() {
            errors.push("announced_ip is required in production".to_string());
        }

        if !self.ice.servers.iter().any(|s| s.urls.starts_with("stun:")) {
            errors.push("at least one STUN entry is required in ice_servers".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        if !self.ice.servers.iter().any(|s| s.urls.starts_with("turn:")) {
            tracing::warn!("no TURN server configured in production");
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
