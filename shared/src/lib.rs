//! # Peerlink Shared
//! Peer-to-peer entity replication and RPC dispatch for small groups of
//! directly connected peers with no authoritative server.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use peerlink_serde::{
    ByteCounter, OwnedPacketReader, PacketPool, PacketReader, PacketWrite, PacketWriter,
    PooledWriter, Serde, SerdeErr, UnsignedVariableInteger,
};

mod config;
mod connection;
mod constants;
mod dispatcher;
mod interpolation;
mod packets;
mod protocol;
mod rpc;
mod session;
mod transport;
mod types;
mod world;

pub use config::DispatcherConfig;
pub use connection::{
    packet_channel::{PacketChannel, Reliability},
    packet_tag::PacketTag,
};
pub use constants::{
    DEFAULT_HOST_ID_RANGE, DEFAULT_PEER_ID_RANGE, ENTITY_WAIT_TIMEOUT, MAX_CHILDREN,
    MAX_PACKETS_PER_TICK, PACKET_POOL_CAPACITY,
};
pub use dispatcher::{
    DespawnEntityEvent, DispatchError, Dispatcher, EntityRpcEvent, ErrorEvent, Event, Events,
    PeerCloseEvent, PeerHandshakeEvent, RpcEvent, SpawnEntityEvent, UpdateEntityEvent,
};
pub use interpolation::PositionInterpolator;
pub use packets::{
    despawn_packet::DespawnPacket,
    rpc_packet::{EntityRpcPacketHeader, RpcPacketHeader},
    spawn_packet::{write_spawn, SpawnPacketHeader},
    sync_packet::SyncPacketHeader,
};
pub use protocol::{Protocol, ProtocolError};
pub use rpc::{
    rpc_handler::{RpcContext, RpcHandler},
    rpc_table::RpcTable,
};
pub use session::Session;
pub use transport::{Transport, TransportError};
pub use types::{NetworkId, PeerId, PrefabId, RpcCode};
pub use world::{
    entity::{
        dirty_bits::DirtyBits,
        error::EntityError,
        network_entity::{EntityState, NetworkEntity},
        replicate::{AsAny, Replicate, SerializeMode},
    },
    entity_registry::EntityRegistry,
    error::IdPoolError,
    network_id_pool::NetworkIdPool,
    prefab_registry::PrefabRegistry,
    remote::entity_waitlist::{EntityWaitlist, InScopeEntities, WaitlistHandle, WaitlistStore},
};
