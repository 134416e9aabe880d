use dashmap::{DashMap, DashSet};
use mediasoup::prelude::*;
use sfu_config::LimitsSettings;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::ids::{PeerId, Role, RoomId, TransportDirection};
use crate::media::worker_pool::WorkerPool;

/// Notification sent from the registry/fan-out into a peer's own signaling
/// actor. The actor is the only writer of its WebSocket, so per-viewer
/// message order is preserved even though many components may push here.
#[derive(Debug, Clone)]
pub enum PeerCommand {
    NewProducer {
        producer_id: ProducerId,
        kind: MediaKind,
    },
    ViewerJoined {
        peer_id: PeerId,
        username: String,
    },
    ViewerLeft {
        peer_id: PeerId,
        username: String,
    },
    Close,
}

/// One live broadcast session. Owns its router handle exclusively; peers
/// reference it only by `room_id`, never by a strong handle, so destroying
/// a room can never leave a dangling peer reference.
pub struct Room {
    pub room_id: RoomId,
    pub post_id: String,
    pub host_user_id: String,
    pub created_at: Instant,
    pub created_at_unix: u64,
    pub viewer_cap: u32,
    pub router: Router,
    host_peer_id: RwLock<Option<PeerId>>,
    peer_ids: DashSet<PeerId>,
}

impl Room {
    pub fn host_peer_id(&self) -> Option<PeerId> {
        self.host_peer_id.read().unwrap().clone()
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peer_ids.iter().map(|p| p.key().clone()).collect()
    }
}

/// One connected client. Owns its transports/producers/consumers in the
/// sense that only its signaling actor ever mutates mediasoup handles for
/// it; this entry is the arena-side metadata the registry and fan-out
/// coordinator need without reaching into actor-private state.
pub struct Peer {
    pub peer_id: PeerId,
    pub room_id: RoomId,
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub created_at: Instant,
    send_connected: AtomicBool,
    recv_connected: AtomicBool,
    producers: AsyncMutex<Vec<(ProducerId, MediaKind)>>,
    commands: mpsc::UnboundedSender<PeerCommand>,
}

impl Peer {
    pub fn mark_transport_connected(&self, direction: TransportDirection) {
        match direction {
            TransportDirection::Send => self.send_connected.store(true, Ordering::SeqCst),
            TransportDirection::Recv => self.recv_connected.store(true, Ordering::SeqCst),
        }
    }

    pub fn is_transport_connected(&self, direction: TransportDirection) -> bool {
        match direction {
            TransportDirection::Send => self.send_connected.load(Ordering::SeqCst),
            TransportDirection::Recv => self.recv_connected.load(Ordering::SeqCst),
        }
    }

    pub async fn record_producer(&self, producer_id: ProducerId, kind: MediaKind) {
        self.producers.lock().await.push((producer_id, kind));
    }

    pub async fn remove_producer(&self, producer_id: &ProducerId) {
        self.producers.lock().await.retain(|(id, _)| id != producer_id);
    }

    pub async fn producers_snapshot(&self) -> Vec<(ProducerId, MediaKind)> {
        self.producers.lock().await.clone()
    }

    pub fn notify(&self, command: PeerCommand) {
        // The actor may already be gone (socket closed, unregistered); a
        // failed send here just means there's nobody left to notify.
        let _ = self.commands.send(command);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomStats {
    pub room_id: String,
    pub post_id: String,
    pub host_user_id: String,
    pub is_active: bool,
    pub viewer_count: u32,
    pub created_at_unix: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    pub room_count: usize,
    pub peer_count: usize,
    pub rooms: Vec<RoomStats>,
}

/// Single owner of all room/peer state. No other component mutates these
/// structures directly; everything else reaches them through this type.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<Room>>,
    peers: DashMap<PeerId, Arc<Peer>>,
    worker_pool: Arc<WorkerPool>,
    max_rooms: u32,
    default_viewer_cap: u32,
}

impl RoomRegistry {
    pub fn new(worker_pool: Arc<WorkerPool>, limits: &LimitsSettings) -> Self {
        Self {
            rooms: DashMap::new(),
            peers: DashMap::new(),
            worker_pool,
            max_rooms: limits.max_rooms,
            default_viewer_cap: limits.max_viewers_per_room,
        }
    }

    pub async fn create_room(
        &self,
        post_id: String,
        host_user_id: String,
    ) -> Result<RoomId, RegistryError> {
        if self.rooms.len() as u32 >= self.max_rooms {
            return Err(RegistryError::Capacity);
        }

        let router = self
            .worker_pool
            .create_router()
            .await
            .map_err(|_| RegistryError::Capacity)?;

        let room_id = RoomId::generate();
        let room = Arc::new(Room {
            room_id: room_id.clone(),
            post_id,
            host_user_id,
            created_at: Instant::now(),
            created_at_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            viewer_cap: self.default_viewer_cap,
            router,
            host_peer_id: RwLock::new(None),
            peer_ids: DashSet::new(),
        });
        self.rooms.insert(room_id.clone(), room);
        info!(room_id = %room_id, "room created");
        Ok(room_id)
    }

    /// Cascades destruction of every peer before the router is dropped
    /// (which closes it). Idempotent: a second call on an already-removed
    /// room returns `NoRoom` without side effects.
    pub fn stop_room(&self, room_id: &RoomId) -> Result<(), RegistryError> {
        let Some((_, room)) = self.rooms.remove(room_id) else {
            return Err(RegistryError::NoRoom);
        };

        for peer_id in room.peer_ids() {
            if let Some((_, peer)) = self.peers.remove(&peer_id) {
                peer.notify(PeerCommand::Close);
            }
        }

        info!(room_id = %room_id, "room stopped");
        // `room` drops here; mediasoup's Router closes on drop of the last
        // strong reference.
        Ok(())
    }

    pub fn register_peer(
        &self,
        room_id: &RoomId,
        user_id: String,
        username: String,
        role: Role,
    ) -> Result<(PeerId, mpsc::UnboundedReceiver<PeerCommand>), RegistryError> {
        let room = self.rooms.get(room_id).ok_or(RegistryError::NoRoom)?;

        if role == Role::Host && room.host_peer_id().is_some() {
            return Err(RegistryError::HostPresent);
        }
        if role == Role::Viewer && self.viewer_count(&room) >= room.viewer_cap {
            return Err(RegistryError::RoomFull);
        }

        let peer_id = PeerId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = Arc::new(Peer {
            peer_id: peer_id.clone(),
            room_id: room_id.clone(),
            user_id,
            username: username.clone(),
            role,
            created_at: Instant::now(),
            send_connected: AtomicBool::new(false),
            recv_connected: AtomicBool::new(false),
            producers: AsyncMutex::new(Vec::new()),
            commands: tx,
        });

        if role == Role::Host {
            *room.host_peer_id.write().unwrap() = Some(peer_id.clone());
        }
        room.peer_ids.insert(peer_id.clone());
        self.peers.insert(peer_id.clone(), peer);

        for other_id in room.peer_ids() {
            if other_id == peer_id {
                continue;
            }
            if let Some(other) = self.peers.get(&other_id) {
                other.notify(PeerCommand::ViewerJoined {
                    peer_id: peer_id.clone(),
                    username: username.clone(),
                });
            }
        }

        debug!(room_id = %room_id, peer_id = %peer_id, %role, "peer registered");
        Ok((peer_id, rx))
    }

    /// Closes producers/consumers/transports in the owning actor, then
    /// removes the peer from its room. Cascades to `stop_room` if the peer
    /// was the host. Idempotent: unregistering twice is a no-op the second
    /// time.
    pub fn unregister_peer(&self, peer_id: &PeerId) {
        let Some((_, peer)) = self.peers.remove(peer_id) else {
            return;
        };

        if let Some(room) = self.rooms.get(&peer.room_id) {
            room.peer_ids.remove(peer_id);
            let is_host = room.host_peer_id() == Some(peer_id.clone());
            if is_host {
                drop(room);
                let _ = self.stop_room(&peer.room_id);
                return;
            }
            for other_id in room.peer_ids() {
                if let Some(other) = self.peers.get(&other_id) {
                    other.notify(PeerCommand::ViewerLeft {
                        peer_id: peer_id.clone(),
                        username: peer.username.clone(),
                    });
                }
            }
        }

        debug!(peer_id = %peer_id, "peer unregistered");
    }

    pub fn get_room(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|r| r.clone())
    }

    pub fn get_peer(&self, peer_id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.get(peer_id).map(|p| p.clone())
    }

    pub fn has_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    fn viewer_count(&self, room: &Room) -> u32 {
        room.peer_ids
            .iter()
            .filter(|id| {
                self.peers
                    .get(id.key())
                    .map(|p| p.role == Role::Viewer)
                    .unwrap_or(false)
            })
            .count() as u32
    }

    pub fn room_stats(&self, room_id: &RoomId) -> Option<RoomStats> {
        let room = self.rooms.get(room_id)?;
        Some(RoomStats {
            room_id: room.room_id.to_string(),
            post_id: room.post_id.clone(),
            host_user_id: room.host_user_id.clone(),
            is_active: room.host_peer_id().is_some(),
            viewer_count: self.viewer_count(&room),
            created_at_unix: room.created_at_unix,
            bytes_sent: 0,
            bytes_received: 0,
        })
    }

    pub fn server_stats(&self) -> ServerStats {
        let rooms: Vec<RoomStats> = self
            .rooms
            .iter()
            .filter_map(|entry| self.room_stats(entry.key()))
            .collect();
        ServerStats {
            room_count: self.rooms.len(),
            peer_count: self.peers.len(),
            rooms,
        }
    }

    /// Removes any room with no host, or with zero viewers whose
    /// `created_at` is older than `timeout`. Returns the ids removed.
    pub fn reap_idle(&self, timeout: Duration) -> Vec<RoomId> {
        let now = Instant::now();
        let candidates: Vec<RoomId> = self
            .rooms
            .iter()
            .filter_map(|entry| {
                let room = entry.value();
                let no_host = room.host_peer_id().is_none();
                let idle_empty =
                    self.viewer_count(room) == 0 && now.duration_since(room.created_at) >= timeout;
                if no_host || idle_empty {
                    Some(room.room_id.clone())
                } else {
                    None
                }
            })
            .collect();

        for room_id in &candidates {
            let _ = self.stop_room(room_id);
        }
        candidates
    }
}
