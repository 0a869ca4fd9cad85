use peerlink_serde::{PacketReader, PacketWrite, Serde, SerdeErr};

use crate::types::NetworkId;

/// `[network id: u32]`. Children go with their root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DespawnPacket {
    pub network_id: NetworkId,
}

impl Serde for DespawnPacket {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.network_id.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            network_id: NetworkId::de(reader)?,
        })
    }
}
