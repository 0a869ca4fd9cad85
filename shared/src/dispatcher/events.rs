use std::{mem, vec::IntoIter};

use log::warn;

use crate::{
    dispatcher::error::DispatchError,
    types::{NetworkId, PeerId, RpcCode},
};

/// What happened during one tick of inbound processing.
pub struct Events {
    handshakes: Vec<PeerId>,
    closes: Vec<PeerId>,
    errors: Vec<DispatchError>,
    rpcs: Vec<(PeerId, RpcCode)>,
    spawns: Vec<(PeerId, NetworkId)>,
    despawns: Vec<(PeerId, NetworkId)>,
    updates: Vec<(PeerId, NetworkId)>,
    entity_rpcs: Vec<(PeerId, NetworkId, RpcCode)>,
    empty: bool,
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

impl Events {
    pub(crate) fn new() -> Self {
        Self {
            handshakes: Vec::new(),
            closes: Vec::new(),
            errors: Vec::new(),
            rpcs: Vec::new(),
            spawns: Vec::new(),
            despawns: Vec::new(),
            updates: Vec::new(),
            entity_rpcs: Vec::new(),
            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: Event>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: Event>(&self) -> bool {
        V::has(self)
    }

    // Crate-public

    pub(crate) fn push_handshake(&mut self, peer: PeerId) {
        self.handshakes.push(peer);
        self.empty = false;
    }

    pub(crate) fn push_close(&mut self, peer: PeerId) {
        self.closes.push(peer);
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: DispatchError) {
        self.errors.push(error);
        self.empty = false;
    }

    pub(crate) fn push_rpc(&mut self, sender: PeerId, code: RpcCode) {
        self.rpcs.push((sender, code));
        self.empty = false;
    }

    pub(crate) fn push_spawn(&mut self, owner: PeerId, network_id: NetworkId) {
        self.spawns.push((owner, network_id));
        self.empty = false;
    }

    pub(crate) fn push_despawn(&mut self, sender: PeerId, network_id: NetworkId) {
        self.despawns.push((sender, network_id));
        self.empty = false;
    }

    pub(crate) fn push_update(&mut self, sender: PeerId, network_id: NetworkId) {
        self.updates.push((sender, network_id));
        self.empty = false;
    }

    pub(crate) fn push_entity_rpc(&mut self, sender: PeerId, network_id: NetworkId, code: RpcCode) {
        self.entity_rpcs.push((sender, network_id, code));
        self.empty = false;
    }
}

impl Drop for Events {
    fn drop(&mut self) {
        if !self.spawns.is_empty() {
            warn!("Dropped Spawn Entity Event(s)! Make sure to handle these through `events.read::<SpawnEntityEvent>()`.");
        }
        if !self.despawns.is_empty() {
            warn!("Dropped Despawn Entity Event(s)! Make sure to handle these through `events.read::<DespawnEntityEvent>()`.");
        }
    }
}

// Event Trait
pub trait Event {
    type Iter;

    fn iter(events: &mut Events) -> Self::Iter;

    fn has(events: &Events) -> bool;
}

// PeerHandshakeEvent
pub struct PeerHandshakeEvent;
impl Event for PeerHandshakeEvent {
    type Iter = IntoIter<PeerId>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.handshakes).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.handshakes.is_empty()
    }
}

// PeerCloseEvent
pub struct PeerCloseEvent;
impl Event for PeerCloseEvent {
    type Iter = IntoIter<PeerId>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.closes).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.closes.is_empty()
    }
}

// ErrorEvent
pub struct ErrorEvent;
impl Event for ErrorEvent {
    type Iter = IntoIter<DispatchError>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.errors).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.errors.is_empty()
    }
}

// RpcEvent
pub struct RpcEvent;
impl Event for RpcEvent {
    type Iter = IntoIter<(PeerId, RpcCode)>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.rpcs).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.rpcs.is_empty()
    }
}

// SpawnEntityEvent
pub struct SpawnEntityEvent;
impl Event for SpawnEntityEvent {
    type Iter = IntoIter<(PeerId, NetworkId)>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.spawns).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.spawns.is_empty()
    }
}

// DespawnEntityEvent
pub struct DespawnEntityEvent;
impl Event for DespawnEntityEvent {
    type Iter = IntoIter<(PeerId, NetworkId)>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.despawns).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.despawns.is_empty()
    }
}

// UpdateEntityEvent
pub struct UpdateEntityEvent;
impl Event for UpdateEntityEvent {
    type Iter = IntoIter<(PeerId, NetworkId)>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.updates).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.updates.is_empty()
    }
}

// EntityRpcEvent
pub struct EntityRpcEvent;
impl Event for EntityRpcEvent {
    type Iter = IntoIter<(PeerId, NetworkId, RpcCode)>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.entity_rpcs).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.entity_rpcs.is_empty()
    }
}
