use mediasoup::prelude::*;
use mediasoup::webrtc_transport::{WebRtcTransportListenInfos, WebRtcTransportOptions};
use sfu_config::{MediaSettings, MediasoupSettings};
use std::net::IpAddr;
use tracing::warn;

/// Creates a single WebRtcTransport listening on both UDP and TCP, with an
/// optional announced (public) IP for ICE candidates and an initial
/// outgoing bitrate seeded from configuration. After creation the
/// configured video max caps incoming bitrate.
pub async fn create_webrtc_transport(
    router: &Router,
    settings: &MediasoupSettings,
    media: &MediaSettings,
) -> anyhow::Result<WebRtcTransport> {
    let listen_ip: IpAddr = settings
        .listen_ip
        .parse()
        .unwrap_or_else(|_| "0.0.0.0".parse().unwrap());
    let announced_address = settings.announced_ip.clone();

    let udp_info = ListenInfo {
        protocol: Protocol::Udp,
        ip: listen_ip,
        announced_address: announced_address.clone(),
        port: None,
        port_range: None,
        flags: None,
        send_buffer_size: None,
        recv_buffer_size: None,
        expose_internal_ip: false,
    };
    let tcp_info = ListenInfo {
        protocol: Protocol::Tcp,
        ip: listen_ip,
        announced_address,
        port: None,
        port_range: None,
        flags: None,
        send_buffer_size: None,
        recv_buffer_size: None,
        expose_internal_ip: false,
    };

    let listen_infos = WebRtcTransportListenInfos::new(udp_info).insert(tcp_info);
    let mut transport_options = WebRtcTransportOptions::new(listen_infos);
    transport_options.enable_udp = true;
    transport_options.enable_tcp = true;
    transport_options.prefer_udp = true;
    transport_options.initial_available_outgoing_bitrate = media.video.target_bitrate_kbps * 1000;

    let transport = router
        .create_webrtc_transport(transport_options)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create webrtc transport: {}", e))?;

    let max_incoming_bps = media.video.max_bitrate_kbps * 1000;
    if let Err(e) = transport.set_max_incoming_bitrate(max_incoming_bps).await {
        warn!(%e, "failed to set max incoming bitrate, continuing with default");
    }

    Ok(transport)
}

/// Serializable transport connection details sent to a client over the
/// signaling WebSocket.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransportInfo {
    pub id: String,
    pub ice_parameters: serde_json::Value,
    pub ice_candidates: serde_json::Value,
    pub dtls_parameters: serde_json::Value,
}

pub fn transport_info(transport: &WebRtcTransport) -> TransportInfo {
    TransportInfo {
        id: transport.id().to_string(),
        ice_parameters: serde_json::to_value(transport.ice_parameters()).unwrap_or_default(),
        ice_candidates: serde_json::to_value(transport.ice_candidates()).unwrap_or_default(),
        dtls_parameters: serde_json::to_value(transport.dtls_parameters()).unwrap_or_default(),
    }
}

/// Wraps `router.can_consume` under the name the spec's contract uses.
pub fn router_can_consume(
    router: &Router,
    producer_id: ProducerId,
    rtp_capabilities: &RtpCapabilities,
) -> bool {
    router.can_consume(&producer_id, rtp_capabilities)
}
