pub mod despawn_packet;
pub mod rpc_packet;
pub mod spawn_packet;
pub mod sync_packet;
