use thiserror::Error;

use peerlink_serde::SerdeErr;

use crate::types::{NetworkId, PeerId};

/// Errors that can occur during entity operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Dirty bit index outside the 32-bit vector
    #[error("Invalid dirty bit index {index}: must be in 0..32")]
    InvalidDirtyBit { index: u32 },

    /// The local peer tried to mutate an entity it does not own
    #[error("Entity {network_id} is not owned by the local peer")]
    NotOwner { network_id: NetworkId },

    /// A remote peer tried to mutate an entity it does not own
    #[error("Authority violation on entity {network_id}: sender {sender} is not the owner ({owner:?})")]
    AuthorityViolation {
        network_id: NetworkId,
        sender: PeerId,
        owner: Option<PeerId>,
    },

    /// The entity has already been spawned onto the network
    #[error("Entity {network_id} has already been spawned")]
    AlreadySpawned { network_id: NetworkId },

    /// Another entity is registered under the same id
    #[error("Entity {network_id} is already registered")]
    AlreadyRegistered { network_id: NetworkId },

    /// A spawn packet declared more children than the template provides
    #[error("Entity {network_id} declares {declared} children but its template allows {allowed}")]
    ChildCountMismatch {
        network_id: NetworkId,
        declared: i32,
        allowed: usize,
    },

    /// Entity state could not be read from a packet
    #[error("Malformed entity data: {0}")]
    Malformed(#[from] SerdeErr),
}
