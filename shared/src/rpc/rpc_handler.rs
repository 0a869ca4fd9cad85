use peerlink_serde::{PacketReader, SerdeErr};

use crate::{
    session::Session,
    types::{PeerId, RpcCode},
    world::entity_registry::EntityRegistry,
};

/// Read access to replication state for session RPC handlers, used to
/// resolve entity references carried in a payload.
pub struct RpcContext<'a> {
    pub session: &'a Session,
    pub entities: &'a EntityRegistry,
}

/// A handler for one session-wide RPC code.
pub trait RpcHandler {
    fn rpc_code(&self) -> RpcCode;

    fn handle(
        &self,
        context: &RpcContext,
        sender: PeerId,
        reader: &mut PacketReader,
    ) -> Result<(), SerdeErr>;
}
