use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                Self(nanoid::nanoid!())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

opaque_id!(RoomId);
opaque_id!(PeerId);

/// Two-variant sum type for peer role — never a string field, so host-only
/// and viewer-only operations are checked by the compiler at their call
/// sites instead of by a runtime string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Host,
    Viewer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => f.write_str("host"),
            Role::Viewer => f.write_str("viewer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportDirection {
    Send,
    Recv,
}

/// Labels on a peer's progress through the signaling handshake. Strictly
/// forward except that any state can transition to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Opened,
    Registered,
    CapabilitiesReady,
    TransportsRequested,
    TransportsConnected,
    Streaming,
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_ids_are_unique_and_round_trip_through_strings() {
        let a = RoomId::generate();
        let b = RoomId::generate();
        assert_ne!(a, b);

        let as_string = a.to_string();
        let back: RoomId = as_string.clone().into();
        assert_eq!(back.as_str(), as_string);
    }

    #[test]
    fn role_serializes_to_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Host).unwrap(), "\"host\"");
        assert_eq!(serde_json::to_string(&Role::Viewer).unwrap(), "\"viewer\"");
    }

    #[test]
    fn role_display_matches_wire_representation() {
        assert_eq!(Role::Host.to_string(), "host");
        assert_eq!(Role::Viewer.to_string(), "viewer");
    }
}
