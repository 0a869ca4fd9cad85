use crate::{error::SerdeErr, packet_reader::PacketReader, packet_writer::PacketWrite, serde::Serde};

const CONTINUE_BIT: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7F;
const MAX_BYTES: usize = 5;

/// A u32 written 7 bits per byte, low group first. The high bit of each byte
/// says another byte follows. Used for lengths, which are almost always small.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct UnsignedVariableInteger {
    value: u32,
}

impl UnsignedVariableInteger {
    pub fn new(value: u32) -> Self {
        Self { value }
    }

    pub fn get(&self) -> u32 {
        self.value
    }
}

impl From<u32> for UnsignedVariableInteger {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl Serde for UnsignedVariableInteger {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        let mut value = self.value;
        loop {
            let group = (value as u8) & PAYLOAD_MASK;
            value >>= 7;
            if value == 0 {
                writer.write_byte(group);
                return;
            }
            writer.write_byte(group | CONTINUE_BIT);
        }
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        let mut output: u64 = 0;
        for index in 0..MAX_BYTES {
            let byte = reader.read_byte()?;
            output |= ((byte & PAYLOAD_MASK) as u64) << (7 * index);
            if byte & CONTINUE_BIT == 0 {
                return u32::try_from(output)
                    .map(Self::new)
                    .map_err(|_| SerdeErr::VarIntOverflow);
            }
        }
        Err(SerdeErr::VarIntOverflow)
    }
}
