use std::{
    cell::RefCell,
    ops::{Deref, DerefMut},
    rc::Rc,
};

use log::trace;

use crate::packet_writer::PacketWriter;

struct PoolInner {
    free: Vec<Vec<u8>>,
    capacity: usize,
    outstanding: usize,
}

/// Recycles packet buffers between ticks.
///
/// [`PacketPool::acquire`] hands out a [`PooledWriter`] which gives its
/// buffer back when dropped, so a buffer is returned on every exit path
/// including `?` and early `break`. At most `capacity` idle buffers are kept.
#[derive(Clone)]
pub struct PacketPool {
    inner: Rc<RefCell<PoolInner>>,
}

impl PacketPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PoolInner {
                free: Vec::with_capacity(capacity),
                capacity,
                outstanding: 0,
            })),
        }
    }

    pub fn acquire(&self) -> PooledWriter {
        let mut inner = self.inner.borrow_mut();
        inner.outstanding += 1;
        let buffer = inner.free.pop().unwrap_or_default();
        PooledWriter {
            writer: PacketWriter::from_buffer(buffer),
            pool: self.inner.clone(),
        }
    }

    /// Idle buffers ready to be handed out.
    pub fn available(&self) -> usize {
        self.inner.borrow().free.len()
    }

    /// Buffers currently acquired and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.inner.borrow().outstanding
    }

    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity
    }
}

/// A [`PacketWriter`] on loan from a [`PacketPool`].
pub struct PooledWriter {
    writer: PacketWriter,
    pool: Rc<RefCell<PoolInner>>,
}

impl Deref for PooledWriter {
    type Target = PacketWriter;

    fn deref(&self) -> &Self::Target {
        &self.writer
    }
}

impl DerefMut for PooledWriter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.writer
    }
}

impl Drop for PooledWriter {
    fn drop(&mut self) {
        let mut buffer = std::mem::take(&mut self.writer).into_buffer();
        buffer.clear();

        let mut inner = self.pool.borrow_mut();
        inner.outstanding -= 1;
        if inner.free.len() < inner.capacity {
            inner.free.push(buffer);
        } else {
            trace!("Packet pool full, dropping returned buffer");
        }
    }
}
