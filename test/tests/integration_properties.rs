//! Property tests run across a two-peer mesh

use std::{collections::HashSet, time::Instant};

use proptest::prelude::*;

use peerlink_shared::NetworkId;
use peerlink_test::{start_mesh, tick_all, LoopbackHub, Plant, Zombie};

proptest! {
    #[test]
    fn synced_state_matches_owner(
        pos_x in -1_000.0f32..1_000.0,
        health in any::<i32>(),
        state in "[a-z]{0,12}",
        dirty in 1u32..8,
    ) {
        let hub = LoopbackHub::new();
        let mut peers = start_mesh(&hub, &[1, 2], 1);
        let now = Instant::now();

        let zombie_id = peers[0].spawn::<Zombie>(|_| {}, None).unwrap();
        tick_all(&mut peers, &now);

        {
            let zombie = peers[0].component_mut::<Zombie>(&zombie_id).unwrap();
            zombie.pos_x = pos_x;
            zombie.health = health;
            zombie.state = state.clone();
        }
        for index in 0..3 {
            if dirty & (1 << index) != 0 {
                peers[0].mark_dirty(&zombie_id, index).unwrap();
            }
        }
        tick_all(&mut peers, &now);

        let owner = peers[0].component::<Zombie>(&zombie_id).unwrap();
        let remote = peers[1].component::<Zombie>(&zombie_id).unwrap();
        let defaults = Zombie::default();

        let expected_pos_x = if dirty & (1 << Zombie::POS_X) != 0 { owner.pos_x } else { defaults.pos_x };
        let expected_health = if dirty & (1 << Zombie::HEALTH) != 0 { owner.health } else { defaults.health };
        let expected_state = if dirty & (1 << Zombie::STATE) != 0 { owner.state.clone() } else { defaults.state };

        prop_assert_eq!(remote.pos_x, expected_pos_x);
        prop_assert_eq!(remote.health, expected_health);
        prop_assert_eq!(&remote.state, &expected_state);
    }

    #[test]
    fn roots_never_share_id_blocks(host_spawns in 0usize..20, peer_spawns in 0usize..20) {
        let hub = LoopbackHub::new();
        let mut peers = start_mesh(&hub, &[1, 2], 1);
        let now = Instant::now();

        let mut roots: Vec<NetworkId> = Vec::new();
        for _ in 0..host_spawns {
            roots.push(peers[0].spawn::<Zombie>(|_| {}, None).unwrap());
        }
        for _ in 0..peer_spawns {
            roots.push(peers[1].spawn::<Plant>(|_| {}, None).unwrap());
        }
        tick_all(&mut peers, &now);

        let blocks: HashSet<u32> = roots.iter().map(|id| id.get() / 10).collect();
        prop_assert_eq!(blocks.len(), roots.len());
        for peer in peers.iter() {
            prop_assert_eq!(peer.entities().len(), host_spawns * 3 + peer_spawns);
        }
    }
}
