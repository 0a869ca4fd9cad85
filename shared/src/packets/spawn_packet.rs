use peerlink_serde::{PacketReader, PacketWrite, Serde, SerdeErr};

use crate::{
    types::{NetworkId, PeerId, PrefabId},
    world::entity::{network_entity::NetworkEntity, replicate::SerializeMode},
};

/// Fixed front of a spawn packet.
///
/// Full layout:
/// `[owner: u64][network id: u32][prefab id: u8][root init...][child count: i32]{[child init...]}*`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnPacketHeader {
    pub owner: PeerId,
    pub network_id: NetworkId,
    pub prefab_id: PrefabId,
}

impl Serde for SpawnPacketHeader {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.owner.ser(writer);
        self.network_id.ser(writer);
        self.prefab_id.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            owner: PeerId::de(reader)?,
            network_id: NetworkId::de(reader)?,
            prefab_id: PrefabId::de(reader)?,
        })
    }
}

/// Writes a root and its children. Child ids are not sent; the receiver
/// derives them from the root id and the child order.
pub fn write_spawn(
    writer: &mut dyn PacketWrite,
    owner: PeerId,
    root: &NetworkEntity,
    children: &[&NetworkEntity],
) {
    SpawnPacketHeader {
        owner,
        network_id: root.network_id(),
        prefab_id: root.prefab_id(),
    }
    .ser(writer);
    root.write(writer, SerializeMode::Init);

    (children.len() as i32).ser(writer);
    for child in children {
        child.write(writer, SerializeMode::Init);
    }
}
