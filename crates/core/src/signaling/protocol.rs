use mediasoup::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ids::TransportDirection;
use crate::media::transport::TransportInfo;

/// Incoming frames, represented as a tagged variant over a closed set and
/// decoded once at the session boundary instead of dispatched on a raw
/// `type` string.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "get_router_rtp_capabilities")]
    GetRouterRtpCapabilities,

    #[serde(rename = "get_transport")]
    GetTransport { direction: TransportDirection },

    #[serde(rename = "connect_transport")]
    ConnectTransport {
        direction: TransportDirection,
        dtls_parameters: DtlsParameters,
    },

    #[serde(rename = "produce")]
    Produce {
        kind: MediaKind,
        rtp_parameters: RtpParameters,
        #[serde(default)]
        app_data: Option<serde_json::Value>,
    },

    #[serde(rename = "consume")]
    Consume {
        producer_id: String,
        rtp_capabilities: RtpCapabilities,
    },

    #[serde(rename = "leave")]
    Leave,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "welcome")]
    Welcome {
        peer_id: String,
        role: String,
        router_rtp_capabilities: serde_json::Value,
        ice_servers: serde_json::Value,
    },

    #[serde(rename = "router_rtp_capabilities")]
    RouterRtpCapabilities {
        rtp_capabilities: serde_json::Value,
    },

    #[serde(rename = "transport_created")]
    TransportCreated {
        direction: TransportDirection,
        #[serde(flatten)]
        info: TransportInfo,
    },

    #[serde(rename = "transport_connected")]
    TransportConnected { direction: TransportDirection },

    #[serde(rename = "produced")]
    Produced { producer_id: String },

    #[serde(rename = "consumed")]
    Consumed {
        consumer_id: String,
        producer_id: String,
        kind: String,
        rtp_parameters: serde_json::Value,
    },

    #[serde(rename = "new_producer")]
    NewProducer { producer_id: String, kind: String },

    #[serde(rename = "viewer_joined")]
    ViewerJoined { peer_id: String, username: String },

    #[serde(rename = "viewer_left")]
    ViewerLeft { peer_id: String, username: String },

    #[serde(rename = "error")]
    Error { code: String, message: String },
}
