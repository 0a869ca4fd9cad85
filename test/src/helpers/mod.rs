pub mod test_peer;

pub use packet_exchange::{start_mesh, start_mesh_with_config, tick_all};
pub use test_peer::TestPeer;
