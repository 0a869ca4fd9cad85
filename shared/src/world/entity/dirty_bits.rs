use peerlink_serde::{PacketReader, PacketWrite, Serde, SerdeErr};

use super::error::EntityError;

pub const DIRTY_BIT_COUNT: u32 = u32::BITS;

/// One bit per field group. A set bit means the group changed since the last
/// sync and must be resent by the owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirtyBits(u32);

impl DirtyBits {
    pub const NONE: DirtyBits = DirtyBits(0);
    pub const ALL: DirtyBits = DirtyBits(u32::MAX);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn set(&mut self, index: u32) -> Result<(), EntityError> {
        Self::check_index(index)?;
        self.0 |= 1 << index;
        Ok(())
    }

    pub fn unset(&mut self, index: u32) -> Result<(), EntityError> {
        Self::check_index(index)?;
        self.0 &= !(1 << index);
        Ok(())
    }

    /// Out-of-range indices are never set.
    pub fn is_set(&self, index: u32) -> bool {
        index < DIRTY_BIT_COUNT && self.0 & (1 << index) != 0
    }

    pub fn is_clean(&self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    fn check_index(index: u32) -> Result<(), EntityError> {
        if index >= DIRTY_BIT_COUNT {
            return Err(EntityError::InvalidDirtyBit { index });
        }
        Ok(())
    }
}

impl Serde for DirtyBits {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }
}
