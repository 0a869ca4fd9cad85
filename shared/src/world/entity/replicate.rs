use std::any::Any;

use peerlink_serde::{PacketReader, PacketWrite, SerdeErr};

use super::dirty_bits::DirtyBits;
use crate::types::{NetworkId, PeerId, RpcCode};

/// Which fields a serialize or deserialize call covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializeMode {
    /// The one-time spawn configuration of the entity kind
    Init,
    /// Only the field groups whose bit is set, in bit order
    Update(DirtyBits),
}

impl SerializeMode {
    pub fn is_init(&self) -> bool {
        matches!(self, SerializeMode::Init)
    }

    /// Whether field group `index` is part of an update.
    pub fn includes(&self, index: u32) -> bool {
        match self {
            SerializeMode::Init => false,
            SerializeMode::Update(bits) => bits.is_set(index),
        }
    }
}

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A replicated entity kind.
///
/// `deserialize` must read back exactly what `serialize` wrote for the same
/// mode, in the same order.
pub trait Replicate: AsAny + 'static {
    fn serialize(&self, writer: &mut dyn PacketWrite, mode: SerializeMode);

    fn deserialize(&mut self, reader: &mut PacketReader, mode: SerializeMode)
        -> Result<(), SerdeErr>;

    /// Handles an RPC scoped to this entity. Codes are private to the kind.
    /// The sender has already been checked against the owner.
    fn handle_rpc(
        &mut self,
        _sender: PeerId,
        _code: RpcCode,
        _reader: &mut PacketReader,
    ) -> Result<(), SerdeErr> {
        Ok(())
    }

    /// Child entities every instance of this kind is created with, in the
    /// order that fixes their id offsets.
    fn template_children(&self) -> Vec<Box<dyn Replicate>> {
        Vec::new()
    }

    fn on_spawn(&mut self, _network_id: NetworkId) {}

    fn on_despawn(&mut self) {}
}
