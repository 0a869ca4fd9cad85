use std::{ops::RangeInclusive, time::Duration};

/// Id block reserved per root entity. Also bounds the children sent in a spawn
/// packet to `MAX_CHILDREN - 1`.
pub const MAX_CHILDREN: u32 = 10;

/// Id space for entities spawned by the session host.
pub const DEFAULT_HOST_ID_RANGE: RangeInclusive<u32> = 10..=499_990;

/// Id space shared by every non-host peer.
pub const DEFAULT_PEER_ID_RANGE: RangeInclusive<u32> = 500_000..=999_990;

/// How long an inbound packet may wait for its target entity to be spawned.
pub const ENTITY_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Packets read per channel per tick.
pub const MAX_PACKETS_PER_TICK: usize = 5;

/// Idle packet buffers kept for reuse.
pub const PACKET_POOL_CAPACITY: usize = 32;
