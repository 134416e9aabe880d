use dashmap::DashSet;
use mediasoup::prelude::*;
use std::sync::Arc;

use crate::ids::{PeerId, Role, RoomId, TransportDirection};
use crate::registry::{PeerCommand, RoomRegistry};

/// Stateless glue between new producers/viewers and the `new_producer`
/// notifications their counterparts need. All state it does own is
/// idempotence bookkeeping, grounded in the broadcast/pull split the
/// `vulcan-relay` reference example uses for `Room::available_producers`.
pub struct FanoutCoordinator {
    registry: Arc<RoomRegistry>,
    notified: DashSet<(PeerId, ProducerId)>,
}

impl FanoutCoordinator {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self {
            registry,
            notified: DashSet::new(),
        }
    }

    /// A host just produced. Notify every viewer whose receive transport is
    /// already connected; viewers still connecting will pick this producer
    /// up via `on_new_viewer_ready` once their transport is ready, because
    /// the registry already recorded it on the host's peer entry.
    pub fn on_new_producer(&self, room_id: &RoomId, producer_id: ProducerId, kind: MediaKind) {
        let Some(room) = self.registry.get_room(room_id) else {
            return;
        };

        for peer_id in room.peer_ids() {
            let Some(peer) = self.registry.get_peer(&peer_id) else {
                continue;
            };
            if peer.role != Role::Viewer || !peer.is_transport_connected(TransportDirection::Recv)
            {
                continue;
            }
            self.notify_once(&peer_id, producer_id, kind);
        }
    }

    /// A viewer's receive transport just reached the connected state.
    /// Enumerate the host's current producers and notify this viewer of
    /// each, in creation order, exactly once.
    pub async fn on_new_viewer_ready(&self, peer_id: &PeerId) {
        let Some(viewer) = self.registry.get_peer(peer_id) else {
            return;
        };
        let Some(room) = self.registry.get_room(&viewer.room_id) else {
            return;
        };
        let Some(host_id) = room.host_peer_id() else {
            return;
        };
        let Some(host) = self.registry.get_peer(&host_id) else {
            return;
        };

        let producers = host.producers_snapshot().await;
        for (producer_id, kind) in producers {
            self.notify_once(peer_id, producer_id, kind);
        }
    }

    /// Drops idempotence bookkeeping for a peer that is leaving. Without
    /// this a peer id reused far enough in the future (unlikely given
    /// `nanoid`, but not impossible) could see stale suppression.
    pub fn forget_peer(&self, peer_id: &PeerId) {
        self.notified.retain(|(p, _)| p != peer_id);
    }

    fn notify_once(&self, peer_id: &PeerId, producer_id: ProducerId, kind: MediaKind) {
        if !self.notified.insert((peer_id.clone(), producer_id)) {
            return;
        }
        if let Some(peer) = self.registry.get_peer(peer_id) {
            peer.notify(PeerCommand::NewProducer { producer_id, kind });
        }
    }
}
