use std::{
    any::{type_name, TypeId},
    collections::HashMap,
};

use crate::{
    protocol::ProtocolError,
    types::PrefabId,
    world::entity::{network_entity::NetworkEntity, replicate::Replicate},
};

type PrefabFactory = Box<dyn Fn() -> Box<dyn Replicate>>;

/// Templates that remote spawn packets are instantiated from.
#[derive(Default)]
pub struct PrefabRegistry {
    factories: HashMap<PrefabId, PrefabFactory>,
    kinds: HashMap<TypeId, PrefabId>,
}

impl PrefabRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            kinds: HashMap::new(),
        }
    }

    pub fn add<R: Replicate, F: Fn() -> R + 'static>(
        &mut self,
        prefab_id: PrefabId,
        factory: F,
    ) -> Result<(), ProtocolError> {
        if prefab_id.is_none() {
            return Err(ProtocolError::ReservedPrefabId);
        }
        if self.factories.contains_key(&prefab_id) {
            return Err(ProtocolError::DuplicatePrefabId {
                prefab_id: prefab_id.get(),
            });
        }
        let type_id = TypeId::of::<R>();
        if self.kinds.contains_key(&type_id) {
            return Err(ProtocolError::DuplicatePrefabType {
                type_name: type_name::<R>(),
            });
        }

        self.kinds.insert(type_id, prefab_id);
        self.factories.insert(
            prefab_id,
            Box::new(move || -> Box<dyn Replicate> { Box::new(factory()) }),
        );
        Ok(())
    }

    pub fn contains(&self, prefab_id: &PrefabId) -> bool {
        self.factories.contains_key(prefab_id)
    }

    pub fn prefab_id_of<R: Replicate>(&self) -> Option<PrefabId> {
        self.kinds.get(&TypeId::of::<R>()).copied()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Builds a fresh, unspawned instance with its template children attached.
    pub fn instantiate(&self, prefab_id: &PrefabId) -> Option<NetworkEntity> {
        let factory = self.factories.get(prefab_id)?;
        let replica = factory();
        let children = replica.template_children();

        let mut root = NetworkEntity::new(*prefab_id, replica);
        for child in children {
            root.add_child(NetworkEntity::new(PrefabId::NONE, child));
        }
        Some(root)
    }
}
