use peerlink_serde::{PacketReader, PacketWrite, Serde, SerdeErr};

use crate::types::{NetworkId, RpcCode};

/// `[code: u8]`, followed by the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpcPacketHeader {
    pub code: RpcCode,
}

impl Serde for RpcPacketHeader {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.code.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            code: RpcCode::de(reader)?,
        })
    }
}

/// `[code: u8][network id: u32]`, followed by the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityRpcPacketHeader {
    pub code: RpcCode,
    pub network_id: NetworkId,
}

impl Serde for EntityRpcPacketHeader {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.code.ser(writer);
        self.network_id.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            code: RpcCode::de(reader)?,
            network_id: NetworkId::de(reader)?,
        })
    }
}
