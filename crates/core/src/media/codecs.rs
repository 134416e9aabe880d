use mediasoup::types::rtp_parameters::{
    MimeTypeAudio, MimeTypeVideo, RtcpFeedback, RtpCodecCapability, RtpCodecParametersParameters,
};
use sfu_config::MediaSettings;
use std::num::NonZeroU32;
use std::num::NonZeroU8;

/// Fixed codec table every router is configured with: Opus audio, and VP8 /
/// VP9 / H264 video so the viewer's browser can pick whichever it supports.
/// The starting bitrate hint comes from configuration, not from the codec
/// choice itself — all four are always offered.
pub fn media_codecs(media: &MediaSettings) -> Vec<RtpCodecCapability> {
    let start_bitrate = media.video.target_bitrate_kbps;

    vec![
        RtpCodecCapability::Audio {
            mime_type: MimeTypeAudio::Opus,
            preferred_payload_type: None,
            clock_rate: NonZeroU32::new(media.audio.sample_rate).unwrap(),
            channels: NonZeroU8::new(2).unwrap(),
            parameters: RtpCodecParametersParameters::from([("useinbandfec", 1u32.into())]),
            rtcp_feedback: vec![RtcpFeedback::TransportCc],
        },
        RtpCodecCapability::Video {
            mime_type: MimeTypeVideo::Vp8,
            preferred_payload_type: None,
            clock_rate: NonZeroU32::new(90000).unwrap(),
            parameters: RtpCodecParametersParameters::from([(
                "x-google-start-bitrate",
                start_bitrate.into(),
            )]),
            rtcp_feedback: video_feedback(),
        },
        RtpCodecCapability::Video {
            mime_type: MimeTypeVideo::Vp9,
            preferred_payload_type: None,
            clock_rate: NonZeroU32::new(90000).unwrap(),
            parameters: RtpCodecParametersParameters::from([
                ("profile-id", 2u32.into()),
                ("x-google-start-bitrate", start_bitrate.into()),
            ]),
            rtcp_feedback: video_feedback(),
        },
        RtpCodecCapability::Video {
            mime_type: MimeTypeVideo::H264,
            preferred_payload_type: None,
            clock_rate: NonZeroU32::new(90000).unwrap(),
            parameters: RtpCodecParametersParameters::from([
                ("level-asymmetry-allowed", 1u32.into()),
                ("packetization-mode", 1u32.into()),
                ("profile-level-id", "42e01f".into()),
                ("x-google-start-bitrate", start_bitrate.into()),
            ]),
            rtcp_feedback: video_feedback(),
        },
    ]
}

fn video_feedback() -> Vec<RtcpFeedback> {
    vec![
        RtcpFeedback::Nack,
        RtcpFeedback::NackPli,
        RtcpFeedback::CcmFir,
        RtcpFeedback::GoogRemb,
        RtcpFeedback::TransportCc,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfu_config::{AudioSettings, MediaSettings, VideoSettings};

    fn settings() -> MediaSettings {
        MediaSettings {
            video: VideoSettings {
                codec: "vp8".into(),
                max_bitrate_kbps: 2500,
                min_bitrate_kbps: 100,
                target_bitrate_kbps: 1200,
                max_framerate: 30,
            },
            audio: AudioSettings {
                codec: "opus".into(),
                bitrate_kbps: 64,
                sample_rate: 48000,
            },
        }
    }

    #[test]
    fn offers_opus_and_all_three_video_codecs() {
        let caps = media_codecs(&settings());
        assert_eq!(caps.len(), 4);
        assert!(matches!(
            caps[0],
            RtpCodecCapability::Audio {
                mime_type: MimeTypeAudio::Opus,
                ..
            }
        ));
    }

    #[test]
    fn video_codecs_all_use_the_90khz_clock_rate() {
        let caps = media_codecs(&settings());
        for cap in caps.iter().skip(1) {
            assert!(matches!(
                cap,
                RtpCodecCapability::Video { clock_rate, .. }
                    if clock_rate.get() == 90000
            ));
        }
    }
}
