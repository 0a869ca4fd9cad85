use std::{any::type_name, iter, time::Instant};

use log::{debug, info, trace, warn};

use peerlink_serde::{
    OwnedPacketReader, PacketPool, PacketReader, PacketWriter, PooledWriter, Serde,
    SerdeErr,
};

use crate::{
    config::DispatcherConfig,
    connection::{packet_channel::PacketChannel, packet_tag::PacketTag},
    dispatcher::{error::DispatchError, events::Events},
    packets::{
        despawn_packet::DespawnPacket,
        rpc_packet::{EntityRpcPacketHeader, RpcPacketHeader},
        spawn_packet::{write_spawn, SpawnPacketHeader},
        sync_packet::SyncPacketHeader,
    },
    protocol::Protocol,
    rpc::rpc_handler::RpcContext,
    session::Session,
    transport::{Transport, TransportError},
    types::{NetworkId, PeerId, RpcCode},
    world::{
        entity::{
            dirty_bits::DirtyBits,
            error::EntityError,
            network_entity::{EntityState, NetworkEntity},
            replicate::{Replicate, SerializeMode},
        },
        entity_registry::EntityRegistry,
        network_id_pool::NetworkIdPool,
        remote::entity_waitlist::{EntityWaitlist, WaitlistStore},
    },
};

enum PendingKind {
    Despawn,
    Sync(SyncPacketHeader),
    EntityRpc(RpcCode),
}

/// An inbound packet whose target entity may not exist yet.
struct PendingPacket {
    sender: PeerId,
    network_id: NetworkId,
    kind: PendingKind,
    body: OwnedPacketReader,
}

impl PendingPacket {
    fn tag(&self) -> PacketTag {
        match self.kind {
            PendingKind::Despawn => PacketTag::EntityDespawn,
            PendingKind::Sync(_) => PacketTag::EntitySync,
            PendingKind::EntityRpc(_) => PacketTag::EntityRpc,
        }
    }
}

/// Routes replication traffic between the local simulation and the transport.
///
/// All work happens on the caller's thread, once per tick: read inbound
/// packets with [`Dispatcher::receive_all_packets`], expire stale waits with
/// [`Dispatcher::process_timeouts`], flush dirty entities with
/// [`Dispatcher::send_all_updates`] and collect what happened with
/// [`Dispatcher::take_events`]. [`Dispatcher::tick`] does all four.
pub struct Dispatcher {
    config: DispatcherConfig,
    protocol: Protocol,
    transport: Box<dyn Transport>,
    session: Option<Session>,
    entities: EntityRegistry,
    host_ids: NetworkIdPool,
    peer_ids: NetworkIdPool,
    waitlist: EntityWaitlist,
    pending: WaitlistStore<PendingPacket>,
    packet_pool: PacketPool,
    events: Events,
}

impl Dispatcher {
    /// Create a new Dispatcher. The protocol is locked if it is not already.
    pub fn new<T: Transport + 'static>(
        config: DispatcherConfig,
        mut protocol: Protocol,
        transport: T,
    ) -> Self {
        if !protocol.is_locked() {
            protocol.lock();
        }

        let host_ids = Self::host_pool(&config);
        let peer_ids = Self::peer_pool(&config);
        let waitlist = EntityWaitlist::new(config.entity_wait_timeout);
        let packet_pool = PacketPool::new(config.packet_pool_capacity);

        Self {
            config,
            protocol,
            transport: Box::new(transport),
            session: None,
            entities: EntityRegistry::new(),
            host_ids,
            peer_ids,
            waitlist,
            pending: WaitlistStore::new(),
            packet_pool,
            events: Events::new(),
        }
    }

    // Session

    /// Joins a session with fresh id pools and greets every remote peer.
    pub fn start_session(&mut self, session: Session) {
        if self.session.is_some() {
            warn!("Starting a new session while one is active, ending the old one first");
            self.end_session();
        }

        self.host_ids = Self::host_pool(&self.config);
        self.peer_ids = Self::peer_pool(&self.config);

        info!(
            "Session started as {} (host {}, {} peer(s))",
            session.local(),
            session.host(),
            session.peer_count()
        );
        self.session = Some(session);

        let packet = self.begin_packet(PacketTag::P2PHandshake);
        self.broadcast(PacketTag::P2PHandshake, packet.as_bytes());
    }

    /// Leaves the session: tells peers, cancels every pending wait and tears
    /// down all replicated entities.
    pub fn end_session(&mut self) {
        if self.session.is_none() {
            return;
        }

        let packet = self.begin_packet(PacketTag::P2PClose);
        self.broadcast(PacketTag::P2PClose, packet.as_bytes());

        self.waitlist.clear(&mut self.pending);
        let removed = self.entities.clear();
        self.host_ids = Self::host_pool(&self.config);
        self.peer_ids = Self::peer_pool(&self.config);

        self.session = None;
        info!("Session ended, {} entities torn down", removed.len());
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Adds a member and brings it up to date: every root on the network is
    /// replayed to it as a spawn, and the roots this peer owns follow with a
    /// full-state sync. Send failures are reported as error events and the
    /// replay carries on.
    pub fn add_peer(&mut self, peer: PeerId) -> Result<(), DispatchError> {
        let session = self.session.as_mut().ok_or(DispatchError::NoActiveSession)?;
        if !session.add_peer(peer) {
            debug!("{} is already a session member", peer);
        }

        let greeting = self.begin_packet(PacketTag::P2PHandshake);
        self.deliver(peer, PacketTag::P2PHandshake, greeting.as_bytes());

        let roots: Vec<(NetworkId, bool)> = self
            .entities
            .roots()
            .filter(|entity| entity.is_on_network())
            .map(|entity| (entity.network_id(), entity.has_authority()))
            .collect();

        for (root_id, owned) in roots {
            if let Some(packet) = self.spawn_packet(&root_id) {
                self.deliver(peer, PacketTag::EntitySpawn, packet.as_bytes());
            }
            if !owned {
                continue;
            }
            let child_ids = self
                .entities
                .get(&root_id)
                .map(|root| root.child_ids().to_vec())
                .unwrap_or_default();
            for network_id in iter::once(root_id).chain(child_ids) {
                if let Some(packet) = self.full_sync_packet(&network_id) {
                    self.deliver(peer, PacketTag::EntitySync, packet.as_bytes());
                }
            }
        }

        info!("{} joined the session", peer);
        Ok(())
    }

    /// Removes a member and locally despawns every root it owned. Returns
    /// the despawned root ids.
    pub fn remove_peer(&mut self, peer: PeerId) -> Vec<NetworkId> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        session.remove_peer(peer);

        let roots = self.entities.roots_owned_by(peer);
        for root_id in &roots {
            for network_id in self.despawn_local(root_id) {
                self.events.push_despawn(peer, network_id);
            }
        }

        info!("{} left the session, {} root(s) despawned", peer, roots.len());
        roots
    }

    // Entities

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn entity(&self, network_id: &NetworkId) -> Option<&NetworkEntity> {
        self.entities.get(network_id)
    }

    pub fn entity_mut(&mut self, network_id: &NetworkId) -> Option<&mut NetworkEntity> {
        self.entities.get_mut(network_id)
    }

    pub fn component<R: Replicate>(&self, network_id: &NetworkId) -> Option<&R> {
        self.entities.get(network_id)?.component::<R>()
    }

    pub fn component_mut<R: Replicate>(&mut self, network_id: &NetworkId) -> Option<&mut R> {
        self.entities.get_mut(network_id)?.component_mut::<R>()
    }

    pub fn host_id_pool(&self) -> &NetworkIdPool {
        &self.host_ids
    }

    pub fn peer_id_pool(&self) -> &NetworkIdPool {
        &self.peer_ids
    }

    pub fn packet_pool(&self) -> &PacketPool {
        &self.packet_pool
    }

    /// Inbound packets parked until their target entity is spawned.
    pub fn waiting_count(&self) -> usize {
        self.waitlist.waiting_count()
    }

    /// A fresh, unspawned instance of `R` built from its template.
    pub fn instantiate<R: Replicate>(&self) -> Result<NetworkEntity, DispatchError> {
        let prefab_id = self.protocol.prefabs.prefab_id_of::<R>().ok_or(
            DispatchError::UnregisteredPrefabType {
                type_name: type_name::<R>(),
            },
        )?;
        self.protocol
            .prefabs
            .instantiate(&prefab_id)
            .ok_or(DispatchError::UnknownPrefab { prefab_id })
    }

    /// Spawns a new `R`, returning `None` if it could not be spawned.
    pub fn spawn<R: Replicate>(
        &mut self,
        configure: impl FnOnce(&mut R),
        owner: Option<PeerId>,
    ) -> Option<NetworkId> {
        match self.try_spawn(configure, owner) {
            Ok(network_id) => Some(network_id),
            Err(err) => {
                warn!("Failed to spawn {}: {}", type_name::<R>(), err);
                None
            }
        }
    }

    /// Clones the template of `R`, applies `configure`, assigns `owner`
    /// (the local peer if `None`) and a fresh id, registers the entity and
    /// its children, and broadcasts the spawn.
    pub fn try_spawn<R: Replicate>(
        &mut self,
        configure: impl FnOnce(&mut R),
        owner: Option<PeerId>,
    ) -> Result<NetworkId, DispatchError> {
        let mut entity = self.instantiate::<R>()?;
        if let Some(replica) = entity.component_mut::<R>() {
            configure(replica);
        }
        self.try_spawn_entity(entity, owner)
    }

    pub fn spawn_entity(&mut self, entity: NetworkEntity, owner: Option<PeerId>) -> Option<NetworkId> {
        match self.try_spawn_entity(entity, owner) {
            Ok(network_id) => Some(network_id),
            Err(err) => {
                warn!("Failed to spawn entity: {}", err);
                None
            }
        }
    }

    /// Spawns a prepared entity, such as one from [`Dispatcher::instantiate`]
    /// with extra children attached.
    pub fn try_spawn_entity(
        &mut self,
        mut entity: NetworkEntity,
        owner: Option<PeerId>,
    ) -> Result<NetworkId, DispatchError> {
        let session = self.session.as_ref().ok_or(DispatchError::NoActiveSession)?;
        if entity.state() != EntityState::Unspawned {
            return Err(EntityError::AlreadySpawned {
                network_id: entity.network_id(),
            }
            .into());
        }
        let prefab_id = entity.prefab_id();
        if prefab_id.is_none() || !self.protocol.prefabs.contains(&prefab_id) {
            return Err(DispatchError::UnknownPrefab { prefab_id });
        }

        let local = session.local();
        let owner = owner.unwrap_or(local);
        let pool = if session.am_host() {
            &mut self.host_ids
        } else {
            &mut self.peer_ids
        };
        let network_id = pool.allocate()?;

        let mut children = entity.take_pending_children();
        let max_children = (pool.block_size() - 1) as usize;
        if children.len() > max_children {
            warn!(
                "Entity {} has {} children, only the first {} are replicated",
                network_id,
                children.len(),
                max_children
            );
            children.truncate(max_children);
        }

        let child_ids: Vec<NetworkId> = (0..children.len())
            .map(|index| network_id.child(index))
            .collect();
        if let Some(taken) = iter::once(&network_id)
            .chain(child_ids.iter())
            .find(|id| self.entities.contains(id))
        {
            let taken = *taken;
            pool.release(network_id);
            return Err(DispatchError::EntityAlreadyExists { network_id: taken });
        }

        let has_authority = owner == local;
        entity.assign(network_id, owner, has_authority, None);
        entity.set_child_ids(child_ids.clone());
        entity.clear_dirty();
        self.entities.register(entity)?;
        for (child, child_id) in children.into_iter().zip(child_ids) {
            let mut child = child;
            child.assign(child_id, owner, has_authority, Some(network_id));
            child.clear_dirty();
            self.entities.register(child)?;
        }

        info!(
            "Spawned entity {} (prefab {}, owner {})",
            network_id,
            prefab_id.get(),
            owner
        );

        if let Some(packet) = self.spawn_packet(&network_id) {
            self.broadcast(PacketTag::EntitySpawn, packet.as_bytes());
        }
        Ok(network_id)
    }

    /// Despawns a root this peer owns. Returns `false` without effect if the
    /// entity is unknown, a child, or owned by another peer.
    pub fn despawn(&mut self, network_id: NetworkId, notify_network: bool) -> bool {
        match self.try_despawn(network_id, notify_network) {
            Ok(()) => true,
            Err(err) => {
                debug!("Ignoring despawn of {}: {}", network_id, err);
                false
            }
        }
    }

    pub fn try_despawn(
        &mut self,
        network_id: NetworkId,
        notify_network: bool,
    ) -> Result<(), DispatchError> {
        let entity = self
            .entities
            .get(&network_id)
            .ok_or(DispatchError::EntityNotFound { network_id })?;
        if entity.is_child() {
            return Err(DispatchError::ChildDespawnRejected { network_id });
        }
        if !entity.has_authority() {
            return Err(DispatchError::NotOwner { network_id });
        }

        let removed = self.despawn_local(&network_id);
        info!("Despawned entity {} ({} total)", network_id, removed.len());

        if notify_network {
            let mut packet = self.begin_packet(PacketTag::EntityDespawn);
            packet.write(&DespawnPacket { network_id });
            self.broadcast(PacketTag::EntityDespawn, packet.as_bytes());
        }
        Ok(())
    }

    /// Flags field group `index` of an owned entity for the next sync.
    pub fn mark_dirty(&mut self, network_id: &NetworkId, index: u32) -> Result<(), DispatchError> {
        let network_id = *network_id;
        self.entities
            .get_mut(&network_id)
            .ok_or(DispatchError::EntityNotFound { network_id })?
            .mark_dirty(index)?;
        Ok(())
    }

    // Outgoing

    /// Broadcasts one sync packet per dirty, locally owned entity, in id
    /// order. Dirty bits are cleared once the packet is built.
    pub fn send_all_updates(&mut self) {
        if self.session.is_none() {
            return;
        }

        let dirty: Vec<NetworkId> = self
            .entities
            .iter()
            .filter(|entity| {
                entity.is_on_network() && entity.has_authority() && !entity.dirty_bits().is_clean()
            })
            .map(|entity| entity.network_id())
            .collect();

        for network_id in dirty {
            let mut packet = self.begin_packet(PacketTag::EntitySync);
            let Some(entity) = self.entities.get_mut(&network_id) else {
                continue;
            };
            let dirty_bits = entity.dirty_bits();
            packet.write(&SyncPacketHeader {
                network_id,
                dirty_bits,
                init: false,
            });
            entity.write(&mut *packet, SerializeMode::Update(dirty_bits));
            entity.clear_dirty();

            self.broadcast(PacketTag::EntitySync, packet.as_bytes());
        }
    }

    /// Broadcasts a session RPC. With `receive_locally` the local handler
    /// also runs, with the local peer as sender.
    pub fn send_rpc(
        &mut self,
        code: RpcCode,
        payload: Option<&PacketWriter>,
        receive_locally: bool,
    ) -> Result<(), DispatchError> {
        let local = self
            .session
            .as_ref()
            .ok_or(DispatchError::NoActiveSession)?
            .local();

        let mut packet = self.begin_packet(PacketTag::Rpc);
        packet.write(&RpcPacketHeader { code });
        if let Some(payload) = payload {
            packet.append(payload.as_bytes());
        }
        self.broadcast(PacketTag::Rpc, packet.as_bytes());

        if receive_locally {
            let bytes = payload.map(|payload| payload.as_bytes()).unwrap_or(&[]);
            self.invoke_rpc(local, code, &mut PacketReader::new(bytes))?;
        }
        Ok(())
    }

    /// Broadcasts an RPC scoped to an entity this peer owns.
    pub fn send_entity_rpc(
        &mut self,
        network_id: NetworkId,
        code: RpcCode,
        payload: Option<&PacketWriter>,
    ) -> Result<(), DispatchError> {
        if self.session.is_none() {
            return Err(DispatchError::NoActiveSession);
        }
        let entity = self
            .entities
            .get(&network_id)
            .ok_or(DispatchError::EntityNotFound { network_id })?;
        if !entity.has_authority() {
            return Err(DispatchError::NotOwner { network_id });
        }

        let mut packet = self.begin_packet(PacketTag::EntityRpc);
        packet.write(&EntityRpcPacketHeader { code, network_id });
        if let Some(payload) = payload {
            packet.append(payload.as_bytes());
        }
        self.broadcast(PacketTag::EntityRpc, packet.as_bytes());
        Ok(())
    }

    /// Sends a tagged packet to exactly one peer.
    pub fn send_packet_to(
        &mut self,
        peer: PeerId,
        tag: PacketTag,
        payload: &[u8],
    ) -> Result<(), DispatchError> {
        if self.session.is_none() {
            return Err(DispatchError::NoActiveSession);
        }
        let mut packet = self.begin_packet(tag);
        packet.append(payload);
        self.send_to(peer, tag, packet.as_bytes())?;
        Ok(())
    }

    // Incoming

    /// Reads up to `max_packets_per_tick` packets from each channel and
    /// dispatches them.
    pub fn receive_all_packets(&mut self, now: &Instant) {
        if self.session.is_none() {
            return;
        }

        for channel in PacketChannel::ALL {
            for _ in 0..self.config.max_packets_per_tick {
                if self.transport.packet_available(channel).is_none() {
                    break;
                }
                match self.transport.receive(channel) {
                    Ok(Some((sender, payload))) => {
                        trace!(
                            "Received packet from {} on {:?} channel: {} bytes",
                            sender,
                            channel,
                            payload.len()
                        );
                        self.process_packet(now, sender, &payload);
                    }
                    Ok(None) => break,
                    Err(err) => {
                        self.record_error(err.into());
                        break;
                    }
                }
            }
        }
    }

    /// Drops packets that waited for their entity longer than the timeout.
    pub fn process_timeouts(&mut self, now: &Instant) {
        let Some(expired) = self.waitlist.collect_expired_items(now, &mut self.pending) else {
            return;
        };
        for item in expired {
            self.record_error(DispatchError::EntityNotFoundTimeout {
                network_id: item.network_id,
                sender: item.sender,
                tag: item.tag(),
            });
        }
    }

    pub fn take_events(&mut self) -> Events {
        std::mem::take(&mut self.events)
    }

    /// One full step: receive, expire, flush updates, and report.
    pub fn tick(&mut self, now: &Instant) -> Events {
        self.receive_all_packets(now);
        self.process_timeouts(now);
        self.send_all_updates();
        self.take_events()
    }

    fn process_packet(&mut self, now: &Instant, sender: PeerId, bytes: &[u8]) {
        let mut reader = PacketReader::new(bytes);
        let tag_byte = match reader.read_byte() {
            Ok(tag_byte) => tag_byte,
            Err(source) => {
                self.record_error(DispatchError::MalformedPacket { sender, source });
                return;
            }
        };
        let Some(tag) = PacketTag::from_byte(tag_byte) else {
            self.record_error(DispatchError::UnknownTag {
                sender,
                tag: tag_byte,
            });
            return;
        };

        let result = match tag {
            PacketTag::None => Ok(()),
            PacketTag::P2PHandshake => {
                info!("P2P session established with {}", sender);
                self.events.push_handshake(sender);
                Ok(())
            }
            PacketTag::P2PClose => {
                self.events.push_close(sender);
                self.remove_peer(sender);
                Ok(())
            }
            PacketTag::Rpc => self.receive_rpc(sender, &mut reader),
            PacketTag::EntitySpawn => self.receive_spawn(sender, &mut reader),
            PacketTag::EntityDespawn | PacketTag::EntitySync | PacketTag::EntityRpc => {
                self.receive_entity_packet(now, sender, tag, &mut reader)
            }
        };

        if let Err(err) = result {
            self.record_error(err);
        }
    }

    fn receive_rpc(&mut self, sender: PeerId, reader: &mut PacketReader) -> Result<(), DispatchError> {
        let header = RpcPacketHeader::de(reader)
            .map_err(|source| DispatchError::MalformedPacket { sender, source })?;
        debug!("Received RPC {} from {}", header.code, sender);
        self.invoke_rpc(sender, header.code, reader)
    }

    fn invoke_rpc(
        &mut self,
        sender: PeerId,
        code: RpcCode,
        reader: &mut PacketReader,
    ) -> Result<(), DispatchError> {
        let session = self.session.as_ref().ok_or(DispatchError::NoActiveSession)?;
        let handler = self
            .protocol
            .rpc_handlers
            .get(code)
            .ok_or(DispatchError::UnknownRpcCode { sender, code })?;
        let context = RpcContext {
            session,
            entities: &self.entities,
        };
        handler
            .handle(&context, sender, reader)
            .map_err(|source| DispatchError::MalformedPacket { sender, source })?;

        self.events.push_rpc(sender, code);
        Ok(())
    }

    fn receive_spawn(&mut self, sender: PeerId, reader: &mut PacketReader) -> Result<(), DispatchError> {
        let malformed = move |source| DispatchError::MalformedPacket { sender, source };

        let header = SpawnPacketHeader::de(reader).map_err(malformed)?;
        let network_id = header.network_id;
        if !network_id.is_assigned() {
            return Err(malformed(SerdeErr::InvalidValue {
                type_name: "NetworkId",
                value: 0,
            }));
        }
        if header.prefab_id.is_none() {
            return Err(DispatchError::UnknownPrefab {
                prefab_id: header.prefab_id,
            });
        }
        let mut root = self.protocol.prefabs.instantiate(&header.prefab_id).ok_or(
            DispatchError::UnknownPrefab {
                prefab_id: header.prefab_id,
            },
        )?;
        if self.entities.contains(&network_id) {
            return Err(DispatchError::EntityAlreadyExists { network_id });
        }

        root.read_init(reader)
            .map_err(|err| DispatchError::from_entity(sender, err))?;

        let declared = i32::de(reader).map_err(malformed)?;
        let mut children = root.take_pending_children();
        let allowed = children.len().min(self.max_children());
        if declared < 0 || declared as usize > allowed {
            return Err(EntityError::ChildCountMismatch {
                network_id,
                declared,
                allowed,
            }
            .into());
        }
        children.truncate(declared as usize);

        let has_authority = self
            .session
            .as_ref()
            .is_some_and(|session| session.local() == header.owner);

        // Read everything before registering anything, so a bad packet
        // leaves no partial hierarchy behind
        let mut child_ids = Vec::with_capacity(children.len());
        for (index, child) in children.iter_mut().enumerate() {
            let Some(child_id) = network_id.checked_child(index) else {
                return Err(malformed(SerdeErr::InvalidValue {
                    type_name: "NetworkId",
                    value: u64::from(network_id.get()),
                }));
            };
            if self.entities.contains(&child_id) {
                return Err(DispatchError::EntityAlreadyExists {
                    network_id: child_id,
                });
            }
            child.assign(child_id, header.owner, has_authority, Some(network_id));
            child
                .read_init(reader)
                .map_err(|err| DispatchError::from_entity(sender, err))?;
            child_ids.push(child_id);
        }

        root.assign(network_id, header.owner, has_authority, None);
        root.set_child_ids(child_ids.clone());

        // Keep our pools from handing out a block a remote peer now holds
        if !self.host_ids.reserve(network_id) {
            self.peer_ids.reserve(network_id);
        }

        self.entities.register(root)?;
        for child in children {
            self.entities.register(child)?;
        }

        for spawned_id in iter::once(network_id).chain(child_ids) {
            self.waitlist.add_entity(&spawned_id);
            self.events.push_spawn(header.owner, spawned_id);
        }
        info!(
            "Entity {} spawned by {} (prefab {}, owner {})",
            network_id,
            sender,
            header.prefab_id.get(),
            header.owner
        );

        self.apply_ready_packets();
        Ok(())
    }

    /// Despawn, sync and entity RPC packets all wait for their target.
    fn receive_entity_packet(
        &mut self,
        now: &Instant,
        sender: PeerId,
        tag: PacketTag,
        reader: &mut PacketReader,
    ) -> Result<(), DispatchError> {
        let malformed = move |source| DispatchError::MalformedPacket { sender, source };

        let (network_id, kind) = match tag {
            PacketTag::EntityDespawn => {
                let packet = DespawnPacket::de(reader).map_err(malformed)?;
                (packet.network_id, PendingKind::Despawn)
            }
            PacketTag::EntitySync => {
                let header = SyncPacketHeader::de(reader).map_err(malformed)?;
                (header.network_id, PendingKind::Sync(header))
            }
            _ => {
                let header = EntityRpcPacketHeader::de(reader).map_err(malformed)?;
                (header.network_id, PendingKind::EntityRpc(header.code))
            }
        };

        let item = PendingPacket {
            sender,
            network_id,
            kind,
            body: reader.to_owned(),
        };
        self.waitlist
            .queue(&self.entities, network_id, &mut self.pending, item, *now);
        self.apply_ready_packets();
        Ok(())
    }

    fn apply_ready_packets(&mut self) {
        let Some(items) = self.waitlist.collect_ready_items(&mut self.pending) else {
            return;
        };
        for item in items {
            if let Err(err) = self.apply_pending(item) {
                self.record_error(err);
            }
        }
    }

    fn apply_pending(&mut self, item: PendingPacket) -> Result<(), DispatchError> {
        let PendingPacket {
            sender,
            network_id,
            kind,
            body,
        } = item;

        if let PendingKind::Despawn = kind {
            return self.apply_despawn(sender, network_id);
        }

        let Some(entity) = self.entities.get_mut(&network_id) else {
            debug!("Entity {} was despawned before its packet applied", network_id);
            return Ok(());
        };
        let mut reader = body.borrow();

        match kind {
            PendingKind::Sync(header) => {
                entity
                    .apply_update(sender, &mut reader, header.mode())
                    .map_err(|err| DispatchError::from_entity(sender, err))?;
                self.events.push_update(sender, network_id);
            }
            PendingKind::EntityRpc(code) => {
                entity
                    .handle_rpc(sender, code, &mut reader)
                    .map_err(|err| DispatchError::from_entity(sender, err))?;
                self.events.push_entity_rpc(sender, network_id, code);
            }
            PendingKind::Despawn => {}
        }
        Ok(())
    }

    fn apply_despawn(&mut self, sender: PeerId, network_id: NetworkId) -> Result<(), DispatchError> {
        let Some(entity) = self.entities.get(&network_id) else {
            return Ok(());
        };
        entity.check_sender(sender)?;
        if entity.is_child() {
            return Err(DispatchError::ChildDespawnRejected { network_id });
        }

        for removed_id in self.despawn_local(&network_id) {
            self.events.push_despawn(sender, removed_id);
        }
        info!("Entity {} despawned by {}", network_id, sender);
        Ok(())
    }

    // Internal

    /// Deregisters a root's children and then the root, and returns its id
    /// block. Returns every removed id, children first.
    fn despawn_local(&mut self, root_id: &NetworkId) -> Vec<NetworkId> {
        let child_ids = self
            .entities
            .get(root_id)
            .map(|root| root.child_ids().to_vec())
            .unwrap_or_default();

        let mut removed = Vec::with_capacity(child_ids.len() + 1);
        for child_id in child_ids {
            if self.entities.deregister(&child_id).is_some() {
                removed.push(child_id);
            }
        }
        if self.entities.deregister(root_id).is_some() {
            removed.push(*root_id);
        }

        // Each pool ignores ids it never issued
        self.host_ids.release(*root_id);
        self.peer_ids.release(*root_id);
        removed
    }

    fn spawn_packet(&self, root_id: &NetworkId) -> Option<PooledWriter> {
        let root = self.entities.get(root_id)?;
        let owner = root.owner()?;
        let children: Vec<&NetworkEntity> = root
            .child_ids()
            .iter()
            .filter_map(|child_id| self.entities.get(child_id))
            .collect();

        let mut packet = self.begin_packet(PacketTag::EntitySpawn);
        write_spawn(&mut *packet, owner, root, &children);
        Some(packet)
    }

    fn full_sync_packet(&self, network_id: &NetworkId) -> Option<PooledWriter> {
        let entity = self.entities.get(network_id)?;
        let mut packet = self.begin_packet(PacketTag::EntitySync);
        packet.write(&SyncPacketHeader {
            network_id: *network_id,
            dirty_bits: DirtyBits::ALL,
            init: false,
        });
        entity.write(&mut *packet, SerializeMode::Update(DirtyBits::ALL));
        Some(packet)
    }

    fn begin_packet(&self, tag: PacketTag) -> PooledWriter {
        let mut packet = self.packet_pool.acquire();
        packet.write(&tag);
        packet
    }

    fn broadcast(&mut self, tag: PacketTag, packet: &[u8]) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let peers: Vec<PeerId> = session.remote_peers().collect();
        for peer in peers {
            self.deliver(peer, tag, packet);
        }
    }

    /// Sends to one peer, reporting a failure as an error event.
    fn deliver(&mut self, peer: PeerId, tag: PacketTag, packet: &[u8]) {
        if let Err(err) = self.send_to(peer, tag, packet) {
            self.record_error(err.into());
        }
    }

    fn send_to(&mut self, peer: PeerId, tag: PacketTag, packet: &[u8]) -> Result<(), TransportError> {
        let channel = tag.channel();
        trace!(
            "Sending {:?} packet to {} on {:?} channel: {} bytes",
            tag,
            peer,
            channel,
            packet.len()
        );
        self.transport
            .send(peer, packet, channel, channel.reliability())
    }

    fn record_error(&mut self, error: DispatchError) {
        warn!("{}", error);
        self.events.push_error(error);
    }

    fn max_children(&self) -> usize {
        (self.config.id_block_size.max(1) - 1) as usize
    }

    fn host_pool(config: &DispatcherConfig) -> NetworkIdPool {
        NetworkIdPool::with_block_size(
            *config.host_id_range.start(),
            *config.host_id_range.end(),
            config.id_block_size,
        )
    }

    fn peer_pool(config: &DispatcherConfig) -> NetworkIdPool {
        NetworkIdPool::with_block_size(
            *config.peer_id_range.start(),
            *config.peer_id_range.end(),
            config.id_block_size,
        )
    }
}
