use thiserror::Error;

use peerlink_serde::SerdeErr;

use crate::{
    connection::packet_tag::PacketTag,
    transport::TransportError,
    types::{NetworkId, PeerId, PrefabId, RpcCode},
    world::{entity::error::EntityError, error::IdPoolError},
};

/// Everything that can go wrong while dispatching replication traffic.
///
/// Inbound failures are recovered inside the dispatcher: they are logged and
/// reported through `ErrorEvent`, never returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// An operation needs a session but none is active
    #[error("No active session")]
    NoActiveSession,

    /// No id block was free for a new root
    #[error(transparent)]
    PoolExhausted(#[from] IdPoolError),

    /// A spawn referenced a prefab id with no registered template
    #[error("Unknown prefab id {}", .prefab_id.get())]
    UnknownPrefab { prefab_id: PrefabId },

    /// A spawn was requested for an entity kind with no registered template
    #[error("Entity kind {type_name} is not registered as a prefab")]
    UnregisteredPrefabType { type_name: &'static str },

    /// A sync, despawn or RPC came from a peer that does not own the target
    #[error("Authority violation on entity {network_id}: sender {sender} is not the owner ({owner:?})")]
    AuthorityViolation {
        network_id: NetworkId,
        sender: PeerId,
        owner: Option<PeerId>,
    },

    /// The target entity never appeared within the wait window
    #[error("Entity {network_id} not found within wait window, dropped {tag:?} packet from {sender}")]
    EntityNotFoundTimeout {
        network_id: NetworkId,
        sender: PeerId,
        tag: PacketTag,
    },

    /// A packet was empty or could not be read
    #[error("Malformed packet from {sender}: {source}")]
    MalformedPacket { sender: PeerId, source: SerdeErr },

    /// A packet carried a tag this peer does not know
    #[error("Unknown packet tag {tag} from {sender}")]
    UnknownTag { sender: PeerId, tag: u8 },

    /// A session RPC code has no handler
    #[error("Unknown RPC code {code} from {sender}")]
    UnknownRpcCode { sender: PeerId, code: RpcCode },

    /// A spawn targeted an id that is already registered
    #[error("Entity {network_id} already exists")]
    EntityAlreadyExists { network_id: NetworkId },

    /// A child was despawned directly instead of through its root
    #[error("Entity {network_id} is a child and can only be despawned with its root")]
    ChildDespawnRejected { network_id: NetworkId },

    /// The local peer tried to act on an entity it does not own
    #[error("Entity {network_id} is not owned by the local peer")]
    NotOwner { network_id: NetworkId },

    /// No entity is registered under the id
    #[error("Entity {network_id} not found")]
    EntityNotFound { network_id: NetworkId },

    #[error(transparent)]
    Entity(EntityError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DispatchError {
    /// Attributes an entity failure to the peer whose packet caused it.
    pub(crate) fn from_entity(sender: PeerId, error: EntityError) -> Self {
        match error {
            EntityError::Malformed(source) => DispatchError::MalformedPacket { sender, source },
            other => other.into(),
        }
    }
}

impl From<EntityError> for DispatchError {
    fn from(error: EntityError) -> Self {
        match error {
            EntityError::AuthorityViolation {
                network_id,
                sender,
                owner,
            } => DispatchError::AuthorityViolation {
                network_id,
                sender,
                owner,
            },
            EntityError::AlreadyRegistered { network_id } => {
                DispatchError::EntityAlreadyExists { network_id }
            }
            EntityError::NotOwner { network_id } => DispatchError::NotOwner { network_id },
            other => DispatchError::Entity(other),
        }
    }
}
