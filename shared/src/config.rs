use std::{default::Default, ops::RangeInclusive, time::Duration};

use crate::constants::{
    DEFAULT_HOST_ID_RANGE, DEFAULT_PEER_ID_RANGE, ENTITY_WAIT_TIMEOUT, MAX_CHILDREN,
    MAX_PACKETS_PER_TICK, PACKET_POOL_CAPACITY,
};

/// Contains Config properties which will be used by a Dispatcher
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Ids handed out for roots spawned by the session host
    pub host_id_range: RangeInclusive<u32>,
    /// Ids handed out for roots spawned by any other peer
    pub peer_id_range: RangeInclusive<u32>,
    /// Size of the id block reserved for each root and its children
    pub id_block_size: u32,
    /// How long a sync, despawn or entity RPC may wait for its target entity
    /// to arrive before it is dropped
    pub entity_wait_timeout: Duration,
    /// Maximum number of packets read from each channel in one tick
    pub max_packets_per_tick: usize,
    /// Number of idle packet buffers retained for reuse
    pub packet_pool_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            host_id_range: DEFAULT_HOST_ID_RANGE,
            peer_id_range: DEFAULT_PEER_ID_RANGE,
            id_block_size: MAX_CHILDREN,
            entity_wait_timeout: ENTITY_WAIT_TIMEOUT,
            max_packets_per_tick: MAX_PACKETS_PER_TICK,
            packet_pool_capacity: PACKET_POOL_CAPACITY,
        }
    }
}
