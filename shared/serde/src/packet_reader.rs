use crate::{error::SerdeErr, integer::UnsignedVariableInteger, serde::Serde};

/// Cursor over a received packet.
pub struct PacketReader<'b> {
    buffer: &'b [u8],
    cursor: usize,
}

impl<'b> PacketReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn read<T: Serde>(&mut self) -> Result<T, SerdeErr> {
        T::de(self)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], SerdeErr> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(SerdeErr::UnexpectedEnd {
                needed: count,
                remaining,
            });
        }
        let start = self.cursor;
        self.cursor += count;
        Ok(&self.buffer[start..self.cursor])
    }

    /// Reads a length-prefixed nested packet and advances past it.
    pub fn read_sub_packet(&mut self) -> Result<PacketReader<'b>, SerdeErr> {
        let length = UnsignedVariableInteger::de(self)?.get() as usize;
        let bytes = self.read_bytes(length)?;
        Ok(PacketReader::new(bytes))
    }

    /// The unread tail of the packet, without advancing.
    pub fn remaining_bytes(&self) -> &'b [u8] {
        &self.buffer[self.cursor..]
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Copies the unread tail so it can outlive the receive buffer.
    pub fn to_owned(&self) -> OwnedPacketReader {
        OwnedPacketReader::new(self.remaining_bytes().into())
    }
}

/// An owned copy of packet bytes, used when a packet must be parked
/// across ticks before it can be applied.
#[derive(Debug, Clone)]
pub struct OwnedPacketReader {
    buffer: Box<[u8]>,
}

impl OwnedPacketReader {
    pub fn new(buffer: Box<[u8]>) -> Self {
        Self { buffer }
    }

    pub fn borrow(&self) -> PacketReader<'_> {
        PacketReader::new(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
