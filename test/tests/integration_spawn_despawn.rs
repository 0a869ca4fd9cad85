//! Integration tests for entity spawn and despawn replication
//! These tests verify id assignment, child hierarchies and teardown across peers

use std::time::Instant;

use peerlink_shared::{
    DespawnEntityEvent, DespawnPacket, DispatchError, DispatcherConfig, EntityError,
    EntityState, NetworkEntity, NetworkId, PacketChannel, PacketReader, PacketTag,
    PacketWriter, PeerId, PrefabId, Replicate, Serde, SerdeErr, SerializeMode,
    SpawnPacketHeader,
};
use peerlink_test::{
    assert_no_errors, assert_single_error,
    helpers::assertions::{errors, spawned_ids},
    start_mesh,
    start_mesh_with_config, tick_all, AnimationController, Armor, LoopbackHub, Plant, Zombie,
    ZOMBIE_PREFAB,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn host_range_from(start: u32) -> impl Fn() -> DispatcherConfig {
    move || DispatcherConfig {
        host_id_range: start..=999,
        ..DispatcherConfig::default()
    }
}

/// Hand-built zombie spawn from peer 1 declaring `declared` children, with
/// init data written for only the first `written` of them.
fn zombie_spawn(network_id: u32, declared: i32, written: usize) -> PacketWriter {
    let mut packet = PacketWriter::new();
    packet.write(&PacketTag::EntitySpawn);
    packet.write(&SpawnPacketHeader {
        owner: PeerId::new(1),
        network_id: NetworkId::new(network_id),
        prefab_id: ZOMBIE_PREFAB,
    });
    Zombie::default().serialize(&mut packet, SerializeMode::Init);
    packet.write(&declared);
    if written > 0 {
        AnimationController::default().serialize(&mut packet, SerializeMode::Init);
    }
    if written > 1 {
        Armor::default().serialize(&mut packet, SerializeMode::Init);
    }
    packet
}

/// A root with two children is spawned at 100 and its children land at 101
/// and 102 on every peer
#[test]
fn spawn_registers_root_and_children_on_remote_peer() {
    init_logger();
    let hub = LoopbackHub::new();
    let mut peers = start_mesh_with_config(&hub, &[1, 2], 1, host_range_from(100));
    let now = Instant::now();
    tick_all(&mut peers, &now);

    let root_id = peers[0]
        .try_spawn::<Zombie>(
            |zombie| {
                zombie.zombie_type = 3;
                zombie.pos_x = 700.0;
            },
            None,
        )
        .expect("spawn should succeed");
    assert_eq!(root_id, NetworkId::new(100));

    let mut events = peers[1].tick(&now);
    assert_no_errors!(events);
    assert_eq!(
        spawned_ids(&mut events),
        vec![NetworkId::new(100), NetworkId::new(101), NetworkId::new(102)]
    );

    let remote = &peers[1];
    let root = remote.entity(&root_id).expect("root should be registered");
    assert_eq!(root.owner(), Some(PeerId::new(1)));
    assert_eq!(root.prefab_id(), ZOMBIE_PREFAB);
    assert_eq!(root.state(), EntityState::OnNetwork);
    assert!(!root.has_authority());
    assert_eq!(root.child_ids(), &[NetworkId::new(101), NetworkId::new(102)]);

    let zombie = remote.component::<Zombie>(&root_id).unwrap();
    assert_eq!(zombie.zombie_type, 3);
    assert_eq!(zombie.pos_x, 700.0);
    assert_eq!(zombie.spawned_as, Some(root_id));

    let animation = remote.entity(&NetworkId::new(101)).unwrap();
    assert!(animation.is_child());
    assert_eq!(animation.parent(), Some(root_id));
    assert!(animation.component::<AnimationController>().is_some());
    assert!(remote
        .component::<Armor>(&NetworkId::new(102))
        .is_some());
}

#[test]
fn spawn_packet_declares_child_count() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh_with_config(&hub, &[1, 2], 1, host_range_from(100));
    hub.clear_sent();

    peers[0].spawn::<Zombie>(|_| {}, None).unwrap();

    let spawn = hub
        .sent_from(PeerId::new(1))
        .into_iter()
        .find(|packet| packet.tag_byte() == Some(PacketTag::EntitySpawn.to_byte()))
        .expect("a spawn packet should be sent");
    assert_eq!(spawn.channel, PacketChannel::Buffered);

    let mut reader = PacketReader::new(&spawn.payload);
    assert_eq!(PacketTag::de(&mut reader), Ok(PacketTag::EntitySpawn));
    let header = SpawnPacketHeader::de(&mut reader).unwrap();
    assert_eq!(header.owner, PeerId::new(1));
    assert_eq!(header.network_id, NetworkId::new(100));
    assert_eq!(header.prefab_id, ZOMBIE_PREFAB);

    let mut root = Zombie::default();
    root.deserialize(&mut reader, SerializeMode::Init).unwrap();
    assert_eq!(i32::de(&mut reader), Ok(2));
}

#[test]
fn peers_draw_from_separate_id_ranges() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);

    let host_id = peers[0].spawn::<Plant>(|_| {}, None).unwrap();
    let peer_id = peers[1].spawn::<Plant>(|_| {}, None).unwrap();

    assert_eq!(host_id, NetworkId::new(10));
    assert_eq!(peer_id, NetworkId::new(500_000));

    let now = Instant::now();
    let mut events = tick_all(&mut peers, &now);
    for peer_events in events.iter_mut() {
        assert!(errors(peer_events).is_empty());
    }
    assert!(peers[0].entity(&peer_id).is_some());
    assert!(peers[1].entity(&host_id).is_some());
}

#[test]
fn spawn_on_behalf_of_another_peer_gives_it_authority() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();

    let plant_id = peers[0]
        .spawn::<Plant>(|_| {}, Some(PeerId::new(2)))
        .unwrap();
    assert!(!peers[0].entity(&plant_id).unwrap().has_authority());

    tick_all(&mut peers, &now);
    let remote = peers[1].entity(&plant_id).unwrap();
    assert_eq!(remote.owner(), Some(PeerId::new(2)));
    assert!(remote.has_authority());
}

#[test]
fn spawn_without_session_fails() {
    let hub = LoopbackHub::new();
    let mut peer = peerlink_test::TestPeer::new(&hub, PeerId::new(1));

    let result = peer.try_spawn::<Plant>(|_| {}, None);

    assert_eq!(result, Err(DispatchError::NoActiveSession));
    assert!(peer.spawn::<Plant>(|_| {}, None).is_none());
}

#[test]
fn dynamic_entity_without_prefab_cannot_spawn() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);

    let entity = NetworkEntity::new(PrefabId::NONE, Box::new(Plant::default()));
    let result = peers[0].try_spawn_entity(entity, None);

    assert_eq!(
        result,
        Err(DispatchError::UnknownPrefab {
            prefab_id: PrefabId::NONE
        })
    );
    assert_eq!(peers[0].host_id_pool().available_count(), 49_999);
}

#[test]
fn unknown_prefab_from_remote_is_rejected() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();
    tick_all(&mut peers, &now);

    let mut packet = PacketWriter::new();
    packet.write(&PacketTag::EntitySpawn);
    packet.write(&SpawnPacketHeader {
        owner: PeerId::new(2),
        network_id: NetworkId::new(500_000),
        prefab_id: PrefabId::new(77),
    });
    hub.inject(
        PeerId::new(2),
        PeerId::new(1),
        PacketChannel::Buffered,
        packet.as_bytes(),
    );

    let mut events = peers[0].tick(&now);
    assert_single_error!(events, DispatchError::UnknownPrefab { .. });
    assert!(peers[0].entities().is_empty());
}

#[test]
fn duplicate_spawn_is_rejected() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();

    peers[0].spawn::<Plant>(|_| {}, None).unwrap();
    let spawn = hub
        .sent_from(PeerId::new(1))
        .into_iter()
        .find(|packet| packet.tag_byte() == Some(PacketTag::EntitySpawn.to_byte()))
        .unwrap();
    hub.inject(
        PeerId::new(1),
        PeerId::new(2),
        PacketChannel::Buffered,
        &spawn.payload,
    );

    let mut events = peers[1].tick(&now);
    assert_single_error!(
        events,
        DispatchError::EntityAlreadyExists { network_id } if network_id == NetworkId::new(10)
    );
    assert_eq!(spawned_ids(&mut events), vec![NetworkId::new(10)]);
}

#[test]
fn despawn_removes_hierarchy_everywhere_and_frees_the_block() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();

    let root_id = peers[0].spawn::<Zombie>(|_| {}, None).unwrap();
    tick_all(&mut peers, &now);
    assert_eq!(peers[1].entities().len(), 3);

    assert!(peers[0].despawn(root_id, true));
    assert!(peers[0].entities().is_empty());

    let mut events = peers[1].tick(&now);
    assert_no_errors!(events);
    let despawned: Vec<NetworkId> = events
        .read::<DespawnEntityEvent>()
        .map(|(_, network_id)| network_id)
        .collect();
    assert_eq!(
        despawned,
        vec![root_id.child(0), root_id.child(1), root_id]
    );
    assert!(peers[1].entities().is_empty());

    let next_id = peers[0].spawn::<Zombie>(|_| {}, None).unwrap();
    assert_eq!(next_id, root_id);
}

#[test]
fn despawn_is_idempotent() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);

    let root_id = peers[0].spawn::<Plant>(|_| {}, None).unwrap();
    hub.clear_sent();

    assert!(peers[0].despawn(root_id, true));
    assert!(!peers[0].despawn(root_id, true));
    assert_eq!(
        peers[0].try_despawn(root_id, true),
        Err(DispatchError::EntityNotFound {
            network_id: root_id
        })
    );

    let despawns = hub
        .sent_from(PeerId::new(1))
        .into_iter()
        .filter(|packet| packet.tag_byte() == Some(PacketTag::EntityDespawn.to_byte()))
        .count();
    assert_eq!(despawns, 1);
}

#[test]
fn local_only_despawn_sends_nothing() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();

    let root_id = peers[0].spawn::<Plant>(|_| {}, None).unwrap();
    tick_all(&mut peers, &now);
    hub.clear_sent();

    assert!(peers[0].despawn(root_id, false));

    assert!(hub.sent().is_empty());
    tick_all(&mut peers, &now);
    assert!(peers[1].entity(&root_id).is_some());
}

#[test]
fn child_cannot_be_despawned_directly() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);

    let root_id = peers[0].spawn::<Zombie>(|_| {}, None).unwrap();
    let child_id = root_id.child(0);

    assert_eq!(
        peers[0].try_despawn(child_id, true),
        Err(DispatchError::ChildDespawnRejected {
            network_id: child_id
        })
    );
    assert!(peers[0].entity(&child_id).is_some());
}

#[test]
fn non_owner_cannot_despawn() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();

    let root_id = peers[0].spawn::<Plant>(|_| {}, None).unwrap();
    tick_all(&mut peers, &now);

    assert_eq!(
        peers[1].try_despawn(root_id, true),
        Err(DispatchError::NotOwner {
            network_id: root_id
        })
    );
    assert!(peers[1].entity(&root_id).is_some());
}

#[test]
fn forged_despawn_is_an_authority_violation() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();

    let root_id = peers[0].spawn::<Plant>(|_| {}, None).unwrap();
    tick_all(&mut peers, &now);

    let mut payload = PacketWriter::new();
    payload.write(&DespawnPacket {
        network_id: root_id,
    });
    peers[1]
        .send_packet_to(PeerId::new(1), PacketTag::EntityDespawn, payload.as_bytes())
        .unwrap();

    let mut events = peers[0].tick(&now);
    assert_single_error!(events, DispatchError::AuthorityViolation { .. });
    assert!(peers[0].entity(&root_id).is_some());
}

#[test]
fn packet_buffers_are_returned_to_the_pool() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2, 3], 1);
    let now = Instant::now();

    for _ in 0..4 {
        peers[0].spawn::<Zombie>(|_| {}, None).unwrap();
    }
    tick_all(&mut peers, &now);

    for peer in peers.iter() {
        assert_eq!(peer.packet_pool().outstanding(), 0);
    }
}

#[test]
fn hand_built_spawn_matches_the_wire_layout() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();
    tick_all(&mut peers, &now);

    let packet = zombie_spawn(100, 2, 2);
    hub.inject(
        PeerId::new(1),
        PeerId::new(2),
        PacketChannel::Buffered,
        packet.as_bytes(),
    );

    let mut events = peers[1].tick(&now);
    assert_no_errors!(events);
    assert_eq!(
        spawned_ids(&mut events),
        vec![NetworkId::new(100), NetworkId::new(101), NetworkId::new(102)]
    );
}

#[test]
fn children_past_the_id_space_are_malformed() {
    init_logger();
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();
    tick_all(&mut peers, &now);

    let packet = zombie_spawn(u32::MAX, 1, 1);
    hub.inject(
        PeerId::new(1),
        PeerId::new(2),
        PacketChannel::Buffered,
        packet.as_bytes(),
    );

    let mut events = peers[1].tick(&now);
    assert_single_error!(
        events,
        DispatchError::MalformedPacket {
            source: SerdeErr::InvalidValue { type_name: "NetworkId", .. },
            ..
        }
    );
    assert!(spawned_ids(&mut events).is_empty());
    assert!(peers[1].entities().is_empty());
}

#[test]
fn unassigned_spawn_id_is_malformed() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();
    tick_all(&mut peers, &now);

    let packet = zombie_spawn(0, 0, 0);
    hub.inject(
        PeerId::new(1),
        PeerId::new(2),
        PacketChannel::Buffered,
        packet.as_bytes(),
    );

    let mut events = peers[1].tick(&now);
    assert_single_error!(
        events,
        DispatchError::MalformedPacket {
            source: SerdeErr::InvalidValue { value: 0, .. },
            ..
        }
    );
    assert!(peers[1].entities().is_empty());
}

#[test]
fn truncated_child_init_leaves_no_partial_hierarchy() {
    init_logger();
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();
    tick_all(&mut peers, &now);

    // Two children declared, the armor's init is missing
    let packet = zombie_spawn(100, 2, 1);
    hub.inject(
        PeerId::new(1),
        PeerId::new(2),
        PacketChannel::Buffered,
        packet.as_bytes(),
    );

    let mut events = peers[1].tick(&now);
    assert_single_error!(
        events,
        DispatchError::MalformedPacket {
            source: SerdeErr::UnexpectedEnd { .. },
            ..
        }
    );
    assert!(spawned_ids(&mut events).is_empty());
    assert_eq!(peers[1].entities().len(), 0);
    assert!(!peers[1].host_id_pool().is_in_use(NetworkId::new(100)));
}

#[test]
fn negative_child_count_is_rejected() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();
    tick_all(&mut peers, &now);

    let packet = zombie_spawn(100, -1, 0);
    hub.inject(
        PeerId::new(1),
        PeerId::new(2),
        PacketChannel::Buffered,
        packet.as_bytes(),
    );

    let mut events = peers[1].tick(&now);
    assert_single_error!(
        events,
        DispatchError::Entity(EntityError::ChildCountMismatch {
            declared: -1,
            allowed: 2,
            ..
        })
    );
    assert!(peers[1].entities().is_empty());
}

#[test]
fn child_count_above_the_prefab_is_rejected() {
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();
    tick_all(&mut peers, &now);

    let packet = zombie_spawn(100, 3, 2);
    hub.inject(
        PeerId::new(1),
        PeerId::new(2),
        PacketChannel::Buffered,
        packet.as_bytes(),
    );

    let mut events = peers[1].tick(&now);
    assert_single_error!(
        events,
        DispatchError::Entity(EntityError::ChildCountMismatch { network_id, declared: 3, allowed: 2 })
            if network_id == NetworkId::new(100)
    );
    assert!(peers[1].entities().is_empty());
}

#[test]
fn despawn_that_overtakes_its_spawn_waits_then_applies() {
    init_logger();
    let hub = LoopbackHub::new();
    let mut peers = start_mesh(&hub, &[1, 2], 1);
    let now = Instant::now();
    tick_all(&mut peers, &now);

    // Spawns travel on the buffered channel, despawns on main
    hub.pause(PeerId::new(2), PacketChannel::Buffered);
    let root_id = peers[0].spawn::<Zombie>(|_| {}, None).unwrap();
    assert!(peers[0].despawn(root_id, true));

    let mut events = peers[1].tick(&now);
    assert_no_errors!(events);
    assert!(peers[1].entities().is_empty());
    assert_eq!(peers[1].waiting_count(), 1);

    hub.resume(PeerId::new(2), PacketChannel::Buffered);
    let mut events = peers[1].tick(&now);
    assert_no_errors!(events);
    assert_eq!(
        spawned_ids(&mut events),
        vec![root_id, root_id.child(0), root_id.child(1)]
    );
    let despawned: Vec<NetworkId> = events
        .read::<DespawnEntityEvent>()
        .map(|(_, network_id)| network_id)
        .collect();
    assert_eq!(
        despawned,
        vec![root_id.child(0), root_id.child(1), root_id]
    );
    assert!(peers[1].entities().is_empty());
    assert_eq!(peers[1].waiting_count(), 0);
    assert!(!peers[1].host_id_pool().is_in_use(root_id));
}
