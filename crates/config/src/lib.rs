pub mod settings;

pub use settings::{
    AppSettings, AudioSettings, Environment, IceServerConfig, IceSettings, LimitsSettings,
    LoggingSettings, MediaSettings, MediasoupSettings, Settings, SignalingSettings, VideoSettings,
};
