pub mod error;
pub mod fanout;
pub mod ids;
pub mod media;
pub mod registry;
pub mod signaling;

pub use error::RegistryError;
pub use fanout::FanoutCoordinator;
pub use ids::{PeerId, Role, RoomId};
pub use media::worker_pool::WorkerPool;
pub use registry::RoomRegistry;
