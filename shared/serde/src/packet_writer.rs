use crate::{integer::UnsignedVariableInteger, serde::Serde};

pub trait PacketWrite {
    fn write_byte(&mut self, byte: u8);

    fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_byte(*byte);
        }
    }

    fn is_counter(&self) -> bool;
}

/// A growable byte buffer that replication packets are written into.
///
/// Multi-byte values are little-endian. Nested payloads are written with
/// [`PacketWriter::write_sub_packet`], which prefixes them with their length
/// so a reader can skip or isolate them.
#[derive(Default, Debug, Clone)]
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Reuses an existing allocation. The buffer is cleared first.
    pub fn from_buffer(mut buffer: Vec<u8>) -> Self {
        buffer.clear();
        Self { buffer }
    }

    pub fn write<T: Serde>(&mut self, value: &T) {
        value.ser(self);
    }

    /// Appends raw bytes with no length prefix.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes `other` as a length-prefixed nested packet.
    pub fn write_sub_packet(&mut self, other: &PacketWriter) {
        UnsignedVariableInteger::new(other.len() as u32).ser(self);
        self.append(other.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn to_bytes(&self) -> Box<[u8]> {
        self.buffer.clone().into_boxed_slice()
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

impl PacketWrite for PacketWriter {
    fn write_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    fn is_counter(&self) -> bool {
        false
    }
}

/// Measures how many bytes a value would occupy without allocating.
#[derive(Default)]
pub struct ByteCounter {
    count: usize,
}

impl ByteCounter {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl PacketWrite for ByteCounter {
    fn write_byte(&mut self, _byte: u8) {
        self.count += 1;
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.count += bytes.len();
    }

    fn is_counter(&self) -> bool {
        true
    }
}
