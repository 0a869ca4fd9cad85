use log::warn;

use peerlink_serde::{PacketReader, PacketWrite};

use super::{
    dirty_bits::DirtyBits,
    error::EntityError,
    replicate::{Replicate, SerializeMode},
};
use crate::types::{NetworkId, PeerId, PrefabId, RpcCode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityState {
    Unspawned,
    OnNetwork,
    Despawning,
    Destroyed,
}

/// A replicated entity: network identity, ownership and change tracking
/// wrapped around the kind-specific state.
pub struct NetworkEntity {
    network_id: NetworkId,
    owner: Option<PeerId>,
    prefab_id: PrefabId,
    state: EntityState,
    dirty_bits: DirtyBits,
    parent: Option<NetworkId>,
    pending_children: Vec<NetworkEntity>,
    child_ids: Vec<NetworkId>,
    has_authority: bool,
    replica: Box<dyn Replicate>,
}

impl NetworkEntity {
    pub fn new(prefab_id: PrefabId, replica: Box<dyn Replicate>) -> Self {
        Self {
            network_id: NetworkId::UNASSIGNED,
            owner: None,
            prefab_id,
            state: EntityState::Unspawned,
            dirty_bits: DirtyBits::NONE,
            parent: None,
            pending_children: Vec::new(),
            child_ids: Vec::new(),
            has_authority: false,
            replica,
        }
    }

    pub fn network_id(&self) -> NetworkId {
        self.network_id
    }

    pub fn owner(&self) -> Option<PeerId> {
        self.owner
    }

    pub fn prefab_id(&self) -> PrefabId {
        self.prefab_id
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn is_on_network(&self) -> bool {
        self.state == EntityState::OnNetwork
    }

    /// Whether the local peer owns this entity.
    pub fn has_authority(&self) -> bool {
        self.has_authority
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    pub fn parent(&self) -> Option<NetworkId> {
        self.parent
    }

    /// Ids of this root's children in declaration order. Empty until spawned.
    pub fn child_ids(&self) -> &[NetworkId] {
        &self.child_ids
    }

    /// Children attached before spawn, not yet on the network.
    pub fn pending_children(&self) -> &[NetworkEntity] {
        &self.pending_children
    }

    pub fn dirty_bits(&self) -> DirtyBits {
        self.dirty_bits
    }

    /// Attaches a child. Only possible before spawn, which fixes each
    /// child's id offset for the lifetime of the root.
    pub fn add_child(&mut self, child: NetworkEntity) -> bool {
        if self.state != EntityState::Unspawned {
            warn!(
                "Ignoring add_child on entity {}: children are fixed once spawned",
                self.network_id
            );
            return false;
        }
        self.pending_children.push(child);
        true
    }

    /// Flags field group `index` for the next sync.
    pub fn mark_dirty(&mut self, index: u32) -> Result<(), EntityError> {
        if self.state == EntityState::OnNetwork && !self.has_authority {
            return Err(EntityError::NotOwner {
                network_id: self.network_id,
            });
        }
        self.dirty_bits.set(index)
    }

    pub fn replica(&self) -> &dyn Replicate {
        self.replica.as_ref()
    }

    pub fn replica_mut(&mut self) -> &mut dyn Replicate {
        self.replica.as_mut()
    }

    /// Downcasts the replicated state to its concrete kind.
    pub fn component<R: Replicate>(&self) -> Option<&R> {
        self.replica.as_ref().as_any().downcast_ref::<R>()
    }

    pub fn component_mut<R: Replicate>(&mut self) -> Option<&mut R> {
        self.replica.as_mut().as_any_mut().downcast_mut::<R>()
    }

    pub fn write(&self, writer: &mut dyn PacketWrite, mode: SerializeMode) {
        self.replica.serialize(writer, mode);
    }

    /// Applies owner-originated state. Rejects any sender but the owner.
    pub fn apply_update(
        &mut self,
        sender: PeerId,
        reader: &mut PacketReader,
        mode: SerializeMode,
    ) -> Result<(), EntityError> {
        self.check_sender(sender)?;
        self.replica.deserialize(reader, mode)?;
        Ok(())
    }

    /// Dispatches an entity RPC. Rejects any sender but the owner.
    pub fn handle_rpc(
        &mut self,
        sender: PeerId,
        code: RpcCode,
        reader: &mut PacketReader,
    ) -> Result<(), EntityError> {
        self.check_sender(sender)?;
        self.replica.handle_rpc(sender, code, reader)?;
        Ok(())
    }

    pub fn check_sender(&self, sender: PeerId) -> Result<(), EntityError> {
        if self.owner != Some(sender) {
            return Err(EntityError::AuthorityViolation {
                network_id: self.network_id,
                sender,
                owner: self.owner,
            });
        }
        Ok(())
    }

    // Crate-internal lifecycle

    pub(crate) fn read_init(&mut self, reader: &mut PacketReader) -> Result<(), EntityError> {
        self.replica.deserialize(reader, SerializeMode::Init)?;
        Ok(())
    }

    pub(crate) fn assign(
        &mut self,
        network_id: NetworkId,
        owner: PeerId,
        has_authority: bool,
        parent: Option<NetworkId>,
    ) {
        self.network_id = network_id;
        self.owner = Some(owner);
        self.has_authority = has_authority;
        self.parent = parent;
    }

    pub(crate) fn take_pending_children(&mut self) -> Vec<NetworkEntity> {
        std::mem::take(&mut self.pending_children)
    }

    pub(crate) fn set_child_ids(&mut self, child_ids: Vec<NetworkId>) {
        self.child_ids = child_ids;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty_bits.clear();
    }

    pub(crate) fn on_spawn(&mut self) {
        self.state = EntityState::OnNetwork;
        self.replica.on_spawn(self.network_id);
    }

    pub(crate) fn on_despawn(&mut self) {
        self.state = EntityState::Despawning;
        self.replica.on_despawn();
        self.dirty_bits.clear();
        self.state = EntityState::Destroyed;
    }
}
