use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    time::{Duration, Instant},
};

use log::debug;

use crate::types::NetworkId;

pub type WaitlistHandle = u64;

pub trait InScopeEntities {
    fn has_entity(&self, network_id: &NetworkId) -> bool;
}

/// Parks inbound work whose target entity has not been spawned yet.
///
/// Handles are issued in arrival order and items are always released in
/// handle order, so two packets for the same entity are applied in the order
/// they were received. An item that waits longer than the ttl expires.
pub struct EntityWaitlist {
    next_handle: WaitlistHandle,
    handle_to_required_entity: HashMap<WaitlistHandle, NetworkId>,
    waiting_entity_to_handles: HashMap<NetworkId, BTreeSet<WaitlistHandle>>,
    ready_handles: BTreeSet<WaitlistHandle>,
    expired_handles: BTreeSet<WaitlistHandle>,
    handle_ttls: VecDeque<(Instant, WaitlistHandle)>,
    handle_ttl: Duration,
}

impl EntityWaitlist {
    pub fn new(handle_ttl: Duration) -> Self {
        Self {
            next_handle: 0,
            handle_to_required_entity: HashMap::new(),
            waiting_entity_to_handles: HashMap::new(),
            ready_handles: BTreeSet::new(),
            expired_handles: BTreeSet::new(),
            handle_ttls: VecDeque::new(),
            handle_ttl,
        }
    }

    pub fn queue<T>(
        &mut self,
        in_scope_entities: &dyn InScopeEntities,
        entity: NetworkId,
        waitlist_store: &mut WaitlistStore<T>,
        item: T,
        now: Instant,
    ) -> WaitlistHandle {
        let new_handle = self.next_handle;
        self.next_handle += 1;
        waitlist_store.queue(new_handle, item);

        // Later items for an entity must not overtake earlier ones still waiting
        if in_scope_entities.has_entity(&entity) && !self.is_waiting_on(&entity) {
            self.ready_handles.insert(new_handle);
            return new_handle;
        }

        debug!("Entity {} is not in scope yet, waiting", entity);
        self.waiting_entity_to_handles
            .entry(entity)
            .or_default()
            .insert(new_handle);
        self.handle_to_required_entity.insert(new_handle, entity);
        self.handle_ttls.push_back((now, new_handle));

        new_handle
    }

    /// Releases every item waiting on `entity`.
    pub fn add_entity(&mut self, entity: &NetworkId) {
        let Some(handles) = self.waiting_entity_to_handles.remove(entity) else {
            return;
        };
        for handle in handles {
            self.handle_to_required_entity.remove(&handle);
            self.remove_ttl(&handle);
            self.ready_handles.insert(handle);
        }
    }

    pub fn collect_ready_items<T>(
        &mut self,
        waitlist_store: &mut WaitlistStore<T>,
    ) -> Option<Vec<T>> {
        if self.ready_handles.is_empty() {
            return None;
        }
        waitlist_store.collect_items(&mut self.ready_handles)
    }

    /// Drops every item that has waited at least the ttl as of `now`,
    /// returning them so the caller can report the timeout.
    pub fn collect_expired_items<T>(
        &mut self,
        now: &Instant,
        waitlist_store: &mut WaitlistStore<T>,
    ) -> Option<Vec<T>> {
        self.check_handle_ttls(now);
        if self.expired_handles.is_empty() {
            return None;
        }
        waitlist_store.collect_items(&mut self.expired_handles)
    }

    pub fn is_waiting_on(&self, entity: &NetworkId) -> bool {
        self.waiting_entity_to_handles.contains_key(entity)
    }

    pub fn waiting_count(&self) -> usize {
        self.handle_to_required_entity.len()
    }

    /// Cancels everything, waiting or ready.
    pub fn clear<T>(&mut self, waitlist_store: &mut WaitlistStore<T>) {
        self.handle_to_required_entity.clear();
        self.waiting_entity_to_handles.clear();
        self.ready_handles.clear();
        self.expired_handles.clear();
        self.handle_ttls.clear();
        waitlist_store.clear();
    }

    fn remove_waiting_handle(&mut self, handle: &WaitlistHandle) {
        let Some(entity) = self.handle_to_required_entity.remove(handle) else {
            return;
        };
        let mut remove = false;
        if let Some(handles) = self.waiting_entity_to_handles.get_mut(&entity) {
            handles.remove(handle);
            remove = handles.is_empty();
        }
        if remove {
            self.waiting_entity_to_handles.remove(&entity);
        }
    }

    fn remove_ttl(&mut self, handle: &WaitlistHandle) {
        if let Some(ttl_index) = self
            .handle_ttls
            .iter()
            .position(|(_, ttl_handle)| ttl_handle == handle)
        {
            self.handle_ttls.remove(ttl_index);
        }
    }

    fn check_handle_ttls(&mut self, now: &Instant) {
        loop {
            let Some((queued_at, _)) = self.handle_ttls.front() else {
                break;
            };
            if now.saturating_duration_since(*queued_at) < self.handle_ttl {
                break;
            }
            let Some((_, handle)) = self.handle_ttls.pop_front() else {
                break;
            };
            self.remove_waiting_handle(&handle);
            self.expired_handles.insert(handle);
        }
    }
}

pub struct WaitlistStore<T> {
    items: BTreeMap<WaitlistHandle, T>,
}

impl<T> Default for WaitlistStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WaitlistStore<T> {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    pub fn queue(&mut self, handle: WaitlistHandle, item: T) {
        self.items.insert(handle, item);
    }

    /// Removes the items for `handles`, in handle order.
    pub fn collect_items(&mut self, handles: &mut BTreeSet<WaitlistHandle>) -> Option<Vec<T>> {
        let mut output = Vec::new();
        for handle in std::mem::take(handles) {
            if let Some(item) = self.items.remove(&handle) {
                output.push(item);
            }
        }
        if output.is_empty() {
            return None;
        }
        Some(output)
    }

    pub fn remove(&mut self, handle: &WaitlistHandle) -> Option<T> {
        self.items.remove(handle)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
