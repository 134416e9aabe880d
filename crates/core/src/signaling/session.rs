use mediasoup::prelude::*;
use sfu_config::{IceServerConfig, MediaSettings, MediasoupSettings};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SignalingError;
use crate::ids::{PeerId, Role, RoomId, SignalingState, TransportDirection};
use crate::media::transport::{create_webrtc_transport, router_can_consume, transport_info};
use crate::registry::{PeerCommand, RoomRegistry};
use crate::fanout::FanoutCoordinator;

use super::protocol::{ClientMessage, ServerMessage};

/// Zero or more frames to write back to the client, plus the close code to
/// send if this exchange ends the session (`None` means keep it open).
pub struct SessionEffect {
    pub messages: Vec<ServerMessage>,
    pub close_code: Option<u16>,
}

impl SessionEffect {
    fn one(message: ServerMessage) -> Self {
        Self {
            messages: vec![message],
            close_code: None,
        }
    }

    /// A normal, peer- or registry-initiated close (the client left, or the
    /// host leaving cascaded a close to this viewer).
    fn closing(message: Option<ServerMessage>) -> Self {
        Self {
            messages: message.into_iter().collect(),
            close_code: Some(1000),
        }
    }
}

/// The mutable state behind one open WebSocket: the peer's current
/// position in the signaling handshake, and the mediasoup handles it owns.
/// Exactly one task drains this session's inbound frames and the commands
/// pushed to it by the registry/fan-out coordinator, so every mutation here
/// is single-threaded by construction.
pub struct PeerSession {
    peer_id: PeerId,
    room_id: RoomId,
    role: Role,
    router: Router,
    registry: Arc<RoomRegistry>,
    fanout: Arc<FanoutCoordinator>,
    mediasoup_settings: Arc<MediasoupSettings>,
    media_settings: Arc<MediaSettings>,
    ice_servers: Vec<IceServerConfig>,
    state: SignalingState,
    send_transport: Option<WebRtcTransport>,
    recv_transport: Option<WebRtcTransport>,
    producers: HashMap<ProducerId, Producer>,
    consumers: HashMap<ConsumerId, Consumer>,
    consumed_producers: HashSet<ProducerId>,
}

impl PeerSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        peer_id: PeerId,
        room_id: RoomId,
        role: Role,
        router: Router,
        registry: Arc<RoomRegistry>,
        fanout: Arc<FanoutCoordinator>,
        mediasoup_settings: Arc<MediasoupSettings>,
        media_settings: Arc<MediaSettings>,
        ice_servers: Vec<IceServerConfig>,
    ) -> Self {
        Self {
            peer_id,
            room_id,
            role,
            router,
            registry,
            fanout,
            mediasoup_settings,
            media_settings,
            ice_servers,
            state: SignalingState::Opened,
            send_transport: None,
            recv_transport: None,
            producers: HashMap::new(),
            consumers: HashMap::new(),
            consumed_producers: HashSet::new(),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn state(&self) -> SignalingState {
        self.state
    }

    /// Registration already happened in the registry before this session
    /// was constructed (the registry is what allocates `peer_id`); this
    /// just emits the welcome frame and advances local state.
    pub fn welcome(&mut self) -> ServerMessage {
        self.state = SignalingState::Registered;
        let ice_servers = serde_json::to_value(&self.ice_servers).unwrap_or_default();
        ServerMessage::Welcome {
            peer_id: self.peer_id.to_string(),
            role: self.role.to_string(),
            router_rtp_capabilities: serde_json::to_value(self.router.rtp_capabilities())
                .unwrap_or_default(),
            ice_servers,
        }
    }

    pub async fn handle_client(
        &mut self,
        message: ClientMessage,
    ) -> Result<SessionEffect, SignalingError> {
        match message {
            ClientMessage::GetRouterRtpCapabilities => {
                let caps = serde_json::to_value(self.router.rtp_capabilities()).unwrap_or_default();
                Ok(SessionEffect::one(ServerMessage::RouterRtpCapabilities {
                    rtp_capabilities: caps,
                }))
            }
            ClientMessage::GetTransport { direction } => self.get_transport(direction).await,
            ClientMessage::ConnectTransport {
                direction,
                dtls_parameters,
            } => self.connect_transport(direction, dtls_parameters).await,
            ClientMessage::Produce {
                kind,
                rtp_parameters,
                ..
            } => self.produce(kind, rtp_parameters).await,
            ClientMessage::Consume {
                producer_id,
                rtp_capabilities,
            } => self.consume(producer_id, rtp_capabilities).await,
            ClientMessage::Leave => {
                self.close().await;
                Ok(SessionEffect::closing(None))
            }
        }
    }

    /// Translates a registry/fan-out notification into a frame for this
    /// peer's own client, or tears the session down for `Close`.
    pub async fn handle_command(&mut self, command: PeerCommand) -> SessionEffect {
        match command {
            PeerCommand::NewProducer { producer_id, kind } => {
                SessionEffect::one(ServerMessage::NewProducer {
                    producer_id: producer_id.to_string(),
                    kind: kind_str(kind).to_string(),
                })
            }
            PeerCommand::ViewerJoined { peer_id, username } => {
                SessionEffect::one(ServerMessage::ViewerJoined {
                    peer_id: peer_id.to_string(),
                    username,
                })
            }
            PeerCommand::ViewerLeft { peer_id, username } => {
                SessionEffect::one(ServerMessage::ViewerLeft {
                    peer_id: peer_id.to_string(),
                    username,
                })
            }
            PeerCommand::Close => {
                self.close().await;
                SessionEffect::closing(None)
            }
        }
    }

    async fn get_transport(
        &mut self,
        direction: TransportDirection,
    ) -> Result<SessionEffect, SignalingError> {
        match (self.role, direction) {
            (Role::Host, TransportDirection::Recv) => return Err(SignalingError::RoleMismatch),
            (Role::Viewer, TransportDirection::Send) => return Err(SignalingError::RoleMismatch),
            _ => {}
        }

        let existing = match direction {
            TransportDirection::Send => self.send_transport.as_ref(),
            TransportDirection::Recv => self.recv_transport.as_ref(),
        };
        if let Some(transport) = existing {
            return Ok(SessionEffect::one(ServerMessage::TransportCreated {
                direction,
                info: transport_info(transport),
            }));
        }

        let transport = create_webrtc_transport(
            &self.router,
            &self.mediasoup_settings,
            &self.media_settings,
        )
        .await
        .map_err(|e| SignalingError::MediaWorker(format!("transport creation failed: {e}")))?;

        let info = transport_info(&transport);
        match direction {
            TransportDirection::Send => self.send_transport = Some(transport),
            TransportDirection::Recv => self.recv_transport = Some(transport),
        }
        if self.state == SignalingState::Registered || self.state == SignalingState::CapabilitiesReady
        {
            self.state = SignalingState::TransportsRequested;
        }

        Ok(SessionEffect::one(ServerMessage::TransportCreated {
            direction,
            info,
        }))
    }

    async fn connect_transport(
        &mut self,
        direction: TransportDirection,
        dtls_parameters: DtlsParameters,
    ) -> Result<SessionEffect, SignalingError> {
        let transport = match direction {
            TransportDirection::Send => self.send_transport.as_ref(),
            TransportDirection::Recv => self.recv_transport.as_ref(),
        }
        .ok_or(SignalingError::StateError)?;

        transport
            .connect(WebRtcTransportRemoteParameters { dtls_parameters })
            .await
            .map_err(|e| SignalingError::MediaWorker(format!("transport connect failed: {e}")))?;

        if let Some(peer) = self.registry.get_peer(&self.peer_id) {
            peer.mark_transport_connected(direction);
        }
        self.state = SignalingState::TransportsConnected;

        if self.role == Role::Viewer && direction == TransportDirection::Recv {
            self.fanout.on_new_viewer_ready(&self.peer_id).await;
        }

        Ok(SessionEffect::one(ServerMessage::TransportConnected {
            direction,
        }))
    }

    async fn produce(
        &mut self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<SessionEffect, SignalingError> {
        if self.role != Role::Host {
            return Err(SignalingError::RoleMismatch);
        }
        let connected = self
            .registry
            .get_peer(&self.peer_id)
            .map(|p| p.is_transport_connected(TransportDirection::Send))
            .unwrap_or(false);
        if !connected {
            return Err(SignalingError::TransportNotReady);
        }
        let transport = self
            .send_transport
            .as_ref()
            .ok_or(SignalingError::TransportNotReady)?;

        let producer = transport
            .produce(ProducerOptions::new(kind, rtp_parameters))
            .await
            .map_err(|e| SignalingError::MediaWorker(format!("produce failed: {e}")))?;
        let producer_id = producer.id();
        self.producers.insert(producer_id, producer);

        if let Some(peer) = self.registry.get_peer(&self.peer_id) {
            peer.record_producer(producer_id, kind).await;
        }
        self.fanout.on_new_producer(&self.room_id, producer_id, kind);
        self.state = SignalingState::Streaming;

        debug!(peer_id = %self.peer_id, %producer_id, ?kind, "producer created");
        Ok(SessionEffect::one(ServerMessage::Produced {
            producer_id: producer_id.to_string(),
        }))
    }

    async fn consume(
        &mut self,
        producer_id: String,
        rtp_capabilities: RtpCapabilities,
    ) -> Result<SessionEffect, SignalingError> {
        if self.role != Role::Viewer {
            return Err(SignalingError::RoleMismatch);
        }
        let connected = self
            .registry
            .get_peer(&self.peer_id)
            .map(|p| p.is_transport_connected(TransportDirection::Recv))
            .unwrap_or(false);
        if !connected {
            return Err(SignalingError::TransportNotReady);
        }
        let transport = self
            .recv_transport
            .as_ref()
            .ok_or(SignalingError::TransportNotReady)?;

        let producer_id = ProducerId::from_str(&producer_id)
            .map_err(|_| SignalingError::OperationRejected("invalid producer id".into()))?;
        if self.consumed_producers.contains(&producer_id) {
            return Err(SignalingError::AlreadyConsuming);
        }
        if !router_can_consume(&self.router, producer_id, &rtp_capabilities) {
            return Err(SignalingError::OperationRejected(
                "router cannot consume this producer under the given capabilities".into(),
            ));
        }

        let consumer = transport
            .consume(ConsumerOptions::new(producer_id, rtp_capabilities))
            .await
            .map_err(|e| SignalingError::MediaWorker(format!("consume failed: {e}")))?;
        let consumer_id = consumer.id();
        let kind = consumer.kind();
        let rtp_parameters = serde_json::to_value(consumer.rtp_parameters()).unwrap_or_default();
        self.consumed_producers.insert(producer_id);
        self.consumers.insert(consumer_id, consumer);
        self.state = SignalingState::Streaming;

        debug!(peer_id = %self.peer_id, %consumer_id, %producer_id, "consumer created");
        Ok(SessionEffect::one(ServerMessage::Consumed {
            consumer_id: consumer_id.to_string(),
            producer_id: producer_id.to_string(),
            kind: kind_str(kind).to_string(),
            rtp_parameters,
        }))
    }

    /// Closes producers, then consumers, then transports, then removes the
    /// peer from the registry — the exact reverse-of-creation order the
    /// destruction invariant requires. Idempotent: calling this twice (e.g.
    /// a client `leave` racing a registry-triggered `Close`) is harmless
    /// since the registry side is already a no-op on the second call.
    pub async fn close(&mut self) {
        if self.state == SignalingState::Closed {
            return;
        }
        self.producers.clear();
        self.consumers.clear();
        self.send_transport.take();
        self.recv_transport.take();
        self.registry.unregister_peer(&self.peer_id);
        self.fanout.forget_peer(&self.peer_id);
        self.state = SignalingState::Closed;
    }
}

pub fn kind_str(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "audio",
        MediaKind::Video => "video",
    }
}

impl Drop for PeerSession {
    fn drop(&mut self) {
        if self.state != SignalingState::Closed {
            warn!(peer_id = %self.peer_id, "peer session dropped without explicit close");
            self.registry.unregister_peer(&self.peer_id);
        }
    }
}
