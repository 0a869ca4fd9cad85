use std::collections::BTreeMap;

use log::debug;

use crate::{
    types::{NetworkId, PeerId},
    world::{
        entity::{error::EntityError, network_entity::NetworkEntity},
        remote::entity_waitlist::InScopeEntities,
    },
};

/// Every entity currently on the network, keyed by id.
///
/// Only the dispatcher registers and deregisters; everyone else reads.
/// Iteration is in id order, so every walk over the registry is deterministic.
#[derive(Default)]
pub struct EntityRegistry {
    entities: BTreeMap<NetworkId, NetworkEntity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
        }
    }

    pub fn get(&self, network_id: &NetworkId) -> Option<&NetworkEntity> {
        self.entities.get(network_id)
    }

    pub fn get_mut(&mut self, network_id: &NetworkId) -> Option<&mut NetworkEntity> {
        self.entities.get_mut(network_id)
    }

    pub fn contains(&self, network_id: &NetworkId) -> bool {
        self.entities.contains_key(network_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkEntity> {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = NetworkId> + '_ {
        self.entities.keys().copied()
    }

    /// Root entities, in id order.
    pub fn roots(&self) -> impl Iterator<Item = &NetworkEntity> {
        self.entities.values().filter(|entity| !entity.is_child())
    }

    /// Roots owned by `peer`, in id order.
    pub fn roots_owned_by(&self, peer: PeerId) -> Vec<NetworkId> {
        self.roots()
            .filter(|entity| entity.owner() == Some(peer))
            .map(|entity| entity.network_id())
            .collect()
    }

    pub(crate) fn register(&mut self, mut entity: NetworkEntity) -> Result<(), EntityError> {
        let network_id = entity.network_id();
        if self.entities.contains_key(&network_id) {
            return Err(EntityError::AlreadyRegistered { network_id });
        }
        entity.on_spawn();
        debug!("Registered entity {} (owner {:?})", network_id, entity.owner());
        self.entities.insert(network_id, entity);
        Ok(())
    }

    pub(crate) fn deregister(&mut self, network_id: &NetworkId) -> Option<NetworkEntity> {
        let mut entity = self.entities.remove(network_id)?;
        entity.on_despawn();
        debug!("Deregistered entity {}", network_id);
        Some(entity)
    }

    /// Deregisters everything, children before their roots.
    pub(crate) fn clear(&mut self) -> Vec<NetworkId> {
        let mut children = Vec::new();
        let mut roots = Vec::new();
        for entity in self.entities.values() {
            if entity.is_child() {
                children.push(entity.network_id());
            } else {
                roots.push(entity.network_id());
            }
        }
        let mut removed = Vec::with_capacity(self.entities.len());
        for network_id in children.into_iter().chain(roots) {
            if self.deregister(&network_id).is_some() {
                removed.push(network_id);
            }
        }
        removed
    }
}

impl InScopeEntities for EntityRegistry {
    fn has_entity(&self, network_id: &NetworkId) -> bool {
        self.entities.contains_key(network_id)
    }
}
