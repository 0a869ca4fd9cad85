// The outer category of every packet, written as its first byte

use peerlink_serde::{PacketReader, PacketWrite, Serde, SerdeErr};

use super::packet_channel::PacketChannel;

#[derive(Copy, Debug, Clone, Eq, PartialEq, Hash)]
pub enum PacketTag {
    // Carries nothing; ignored on receipt
    None,
    // Sent once a peer-to-peer link is established
    P2PHandshake,
    // Sent by a peer leaving the session
    P2PClose,
    // A session RPC: [code][payload]
    Rpc,
    // Creation of a root entity and its children
    EntitySpawn,
    // Destruction of a root entity and its children
    EntityDespawn,
    // Dirty fields of an entity
    EntitySync,
    // An RPC scoped to one entity: [code][network id][payload]
    EntityRpc,
}

impl PacketTag {
    const ALL: [PacketTag; 8] = [
        PacketTag::None,
        PacketTag::P2PHandshake,
        PacketTag::P2PClose,
        PacketTag::Rpc,
        PacketTag::EntitySpawn,
        PacketTag::EntityDespawn,
        PacketTag::EntitySync,
        PacketTag::EntityRpc,
    ];

    pub fn to_byte(self) -> u8 {
        match self {
            PacketTag::None => 0,
            PacketTag::P2PHandshake => 1,
            PacketTag::P2PClose => 2,
            PacketTag::Rpc => 3,
            PacketTag::EntitySpawn => 4,
            PacketTag::EntityDespawn => 5,
            PacketTag::EntitySync => 6,
            PacketTag::EntityRpc => 7,
        }
    }

    pub fn from_byte(byte: u8) -> Option<PacketTag> {
        Self::ALL.get(byte as usize).copied()
    }

    /// The channel a packet of this category always travels on.
    pub fn channel(self) -> PacketChannel {
        match self {
            PacketTag::EntitySpawn | PacketTag::EntitySync => PacketChannel::Buffered,
            PacketTag::Rpc | PacketTag::EntityRpc => PacketChannel::Rpc,
            PacketTag::None
            | PacketTag::P2PHandshake
            | PacketTag::P2PClose
            | PacketTag::EntityDespawn => PacketChannel::Main,
        }
    }
}

impl Serde for PacketTag {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        writer.write_byte(self.to_byte());
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        let value = reader.read_byte()?;
        // Unknown tags come from newer peers. Surface them instead of panicking.
        Self::from_byte(value).ok_or(SerdeErr::InvalidDiscriminant {
            type_name: "PacketTag",
            value,
        })
    }

    fn byte_length(&self) -> usize {
        1
    }
}
