use peerlink_serde::{PacketReader, PacketWrite, Serde, SerdeErr};

use crate::{
    types::NetworkId,
    world::entity::{dirty_bits::DirtyBits, replicate::SerializeMode},
};

/// `[network id: u32][dirty bits: u32][init: bool]`, followed by the fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncPacketHeader {
    pub network_id: NetworkId,
    pub dirty_bits: DirtyBits,
    pub init: bool,
}

impl SyncPacketHeader {
    pub fn mode(&self) -> SerializeMode {
        if self.init {
            SerializeMode::Init
        } else {
            SerializeMode::Update(self.dirty_bits)
        }
    }
}

impl Serde for SyncPacketHeader {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.network_id.ser(writer);
        self.dirty_bits.ser(writer);
        self.init.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            network_id: NetworkId::de(reader)?,
            dirty_bits: DirtyBits::de(reader)?,
            init: bool::de(reader)?,
        })
    }
}
