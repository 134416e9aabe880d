use thiserror::Error;

/// Failures from the Room Registry. The HTTP and WebSocket layers each map
/// these to their own wire representation independently.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("room not found")]
    NoRoom,
    #[error("room is at viewer capacity")]
    RoomFull,
    #[error("a host is already present in this room")]
    HostPresent,
    #[error("server is at room capacity")]
    Capacity,
    #[error("peer not found")]
    PeerNotFound,
}

/// Failures surfaced within a single signaling-session message handler.
/// Each one short-circuits to exactly one `error` frame and leaves the
/// session running, except `MediaWorker` which closes it.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("operation not permitted for this role")]
    RoleMismatch,
    #[error("operation attempted in the wrong session state")]
    StateError,
    #[error("transport not yet connected")]
    TransportNotReady,
    #[error("already consuming this producer")]
    AlreadyConsuming,
    /// The media worker itself rejected the operation (`can_consume` false,
    /// a malformed producer id): no producer/consumer is created, the
    /// session keeps running.
    #[error("media worker rejected the operation: {0}")]
    OperationRejected(String),
    /// An RPC/IPC failure talking to the media worker (transport creation,
    /// connect, produce, or consume failed at the worker itself): the
    /// session's mediasoup state is now unknown and must be torn down.
    #[error("media worker failure: {0}")]
    MediaWorker(String),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl SignalingError {
    pub fn code(&self) -> &'static str {
        match self {
            SignalingError::RoleMismatch => "ROLE_MISMATCH",
            SignalingError::StateError => "STATE_ERROR",
            SignalingError::TransportNotReady => "TRANSPORT_NOT_READY",
            SignalingError::AlreadyConsuming => "ALREADY_CONSUMING",
            SignalingError::OperationRejected(_) => "MEDIA_WORKER",
            SignalingError::MediaWorker(_) => "MEDIA_WORKER",
            SignalingError::Registry(RegistryError::NoRoom) => "NOT_FOUND",
            SignalingError::Registry(RegistryError::PeerNotFound) => "NOT_FOUND",
            SignalingError::Registry(RegistryError::RoomFull) => "CAPACITY",
            SignalingError::Registry(RegistryError::Capacity) => "CAPACITY",
            SignalingError::Registry(RegistryError::HostPresent) => "HOST_PRESENT",
        }
    }

    /// Whether this failure should close the session (1011) rather than
    /// just emit an `error` frame and keep running.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, SignalingError::MediaWorker(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_media_worker_failures_are_fatal_to_the_session() {
        let fatal = SignalingError::MediaWorker("worker crashed".into());
        let non_fatal = [
            SignalingError::RoleMismatch,
            SignalingError::StateError,
            SignalingError::TransportNotReady,
            SignalingError::AlreadyConsuming,
            SignalingError::OperationRejected("can_consume returned false".into()),
            SignalingError::Registry(RegistryError::NoRoom),
        ];

        assert!(fatal.is_fatal_to_session());
        for err in non_fatal {
            assert!(!err.is_fatal_to_session());
        }
    }

    #[test]
    fn operation_rejected_and_media_worker_share_the_same_wire_code() {
        assert_eq!(
            SignalingError::OperationRejected("bad producer id".into()).code(),
            "MEDIA_WORKER"
        );
        assert_eq!(
            SignalingError::MediaWorker("transport.produce failed".into()).code(),
            "MEDIA_WORKER"
        );
    }

    #[test]
    fn registry_errors_map_to_the_documented_wire_codes() {
        assert_eq!(
            SignalingError::Registry(RegistryError::RoomFull).code(),
            "CAPACITY"
        );
        assert_eq!(
            SignalingError::Registry(RegistryError::Capacity).code(),
            "CAPACITY"
        );
        assert_eq!(
            SignalingError::Registry(RegistryError::HostPresent).code(),
            "HOST_PRESENT"
        );
        assert_eq!(
            SignalingError::Registry(RegistryError::NoRoom).code(),
            "NOT_FOUND"
        );
        assert_eq!(SignalingError::RoleMismatch.code(), "ROLE_MISMATCH");
        assert_eq!(SignalingError::AlreadyConsuming.code(), "ALREADY_CONSUMING");
    }
}
