use thiserror::Error;

use crate::types::RpcCode;

/// Errors that can occur during protocol operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Protocol is locked and cannot be modified
    #[error("Protocol is already locked and cannot be modified. Protocol.lock() has been called and no further changes are allowed")]
    AlreadyLocked,

    /// Prefab id 0 is reserved for entities that cannot be spawned remotely
    #[error("Prefab id 0 is reserved and cannot be registered")]
    ReservedPrefabId,

    /// Another template is already registered under this prefab id
    #[error("Prefab id {prefab_id} is already registered")]
    DuplicatePrefabId { prefab_id: u8 },

    /// This entity kind already has a prefab id
    #[error("Entity kind {type_name} is already registered as a prefab")]
    DuplicatePrefabType { type_name: &'static str },

    /// Another session RPC handler already claims this code
    #[error("Session RPC code {code} is already claimed by another handler")]
    DuplicateRpcCode { code: RpcCode },
}
