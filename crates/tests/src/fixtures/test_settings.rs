use sfu_config::{
    AppSettings, AudioSettings, IceSettings, LimitsSettings, LoggingSettings, MediaSettings,
    MediasoupSettings, Settings, SignalingSettings, VideoSettings,
};

/// Settings for a single test server: one mediasoup worker, a tiny RTC port
/// range, and loose enough limits that a test can override just the one
/// field its scenario cares about.
pub fn base() -> Settings {
    Settings {
        app: AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        signaling: SignalingSettings {
            websocket_port: 0,
            idle_timeout_seconds: 60,
        },
        limits: LimitsSettings {
            max_connections: 10_000,
            max_rooms: 1000,
            max_viewers_per_room: 500,
        },
        ice: IceSettings { servers: vec![] },
        media: MediaSettings {
            video: VideoSettings {
                codec: "vp8".to_string(),
                max_bitrate_kbps: 2500,
                min_bitrate_kbps: 100,
                target_bitrate_kbps: 1000,
                max_framerate: 30,
            },
            audio: AudioSettings {
                codec: "opus".to_string(),
                bitrate_kbps: 64,
                sample_rate: 48000,
            },
        },
        mediasoup: MediasoupSettings {
            num_workers: 1,
            listen_ip: "127.0.0.1".to_string(),
            announced_ip: None,
            rtc_min_port: 41000,
            rtc_max_port: 41999,
        },
        logging: LoggingSettings {
            level: "error".to_string(),
            file: None,
            console: false,
        },
    }
}
