use std::collections::BTreeSet;

use log::trace;

use crate::{constants::MAX_CHILDREN, types::NetworkId, world::error::IdPoolError};

/// Hands out root ids from a bounded range, one block per root.
///
/// Ids are issued lowest first. A released id only returns to the pool if it
/// was issued by this pool and sits on a block boundary, so releasing a child
/// offset or an id owned by another pool leaves the pool unchanged.
pub struct NetworkIdPool {
    start: u32,
    end: u32,
    block_size: u32,
    available: BTreeSet<u32>,
    in_use: BTreeSet<u32>,
}

impl NetworkIdPool {
    pub fn new(start: u32, end: u32) -> Self {
        Self::with_block_size(start, end, MAX_CHILDREN)
    }

    pub fn with_block_size(start: u32, end: u32, block_size: u32) -> Self {
        let block_size = block_size.max(1);
        let mut available = BTreeSet::new();
        if start <= end {
            // Blocks whose children would run past the id space are left out
            available.extend(
                (start..=end)
                    .step_by(block_size as usize)
                    .take_while(|id| id.checked_add(block_size - 1).is_some()),
            );
        }
        Self {
            start,
            end,
            block_size,
            available,
            in_use: BTreeSet::new(),
        }
    }

    pub fn allocate(&mut self) -> Result<NetworkId, IdPoolError> {
        let Some(id) = self.available.pop_first() else {
            return Err(IdPoolError::PoolExhausted {
                start: self.start,
                end: self.end,
            });
        };
        self.in_use.insert(id);
        trace!("Allocated network id {}", id);
        Ok(NetworkId::new(id))
    }

    /// Returns `true` if the id went back into the pool.
    pub fn release(&mut self, id: NetworkId) -> bool {
        let id = id.get();
        if !self.in_use.contains(&id) || !self.is_block_start(id) {
            return false;
        }
        self.in_use.remove(&id);
        self.available.insert(id);
        trace!("Released network id {}", id);
        true
    }

    /// Marks a block as taken by a remote peer drawing from the same range,
    /// so this pool will not hand it out while that entity lives.
    pub fn reserve(&mut self, id: NetworkId) -> bool {
        if !self.available.remove(&id.get()) {
            return false;
        }
        self.in_use.insert(id.get());
        true
    }

    pub fn is_in_use(&self, id: NetworkId) -> bool {
        self.in_use.contains(&id.get())
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    fn is_block_start(&self, id: u32) -> bool {
        id >= self.start && (id - self.start) % self.block_size == 0
    }
}
