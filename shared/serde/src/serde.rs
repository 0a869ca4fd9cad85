use crate::{
    error::SerdeErr,
    integer::UnsignedVariableInteger,
    packet_reader::PacketReader,
    packet_writer::{ByteCounter, PacketWrite},
};

/// A type that can be written to and read back from a packet.
///
/// `de` must consume exactly the bytes `ser` produced.
pub trait Serde: Sized {
    fn ser(&self, writer: &mut dyn PacketWrite);

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr>;

    fn byte_length(&self) -> usize {
        let mut counter = ByteCounter::new();
        self.ser(&mut counter);
        counter.count()
    }
}

macro_rules! impl_serde_for_number {
    ($($ty:ty),*) => {
        $(
            impl Serde for $ty {
                fn ser(&self, writer: &mut dyn PacketWrite) {
                    writer.write_bytes(&self.to_le_bytes());
                }

                fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
                    const SIZE: usize = std::mem::size_of::<$ty>();
                    let mut bytes = [0_u8; SIZE];
                    bytes.copy_from_slice(reader.read_bytes(SIZE)?);
                    Ok(<$ty>::from_le_bytes(bytes))
                }

                fn byte_length(&self) -> usize {
                    std::mem::size_of::<$ty>()
                }
            }
        )*
    };
}

impl_serde_for_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Serde for bool {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        writer.write_byte(u8::from(*self));
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(SerdeErr::InvalidBool { value }),
        }
    }

    fn byte_length(&self) -> usize {
        1
    }
}

impl Serde for String {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        UnsignedVariableInteger::new(self.len() as u32).ser(writer);
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        let length = UnsignedVariableInteger::de(reader)?.get() as usize;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr::InvalidUtf8)
    }
}

impl Serde for Vec<u8> {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        UnsignedVariableInteger::new(self.len() as u32).ser(writer);
        writer.write_bytes(self);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        let length = UnsignedVariableInteger::de(reader)?.get() as usize;
        Ok(reader.read_bytes(length)?.to_vec())
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.is_some().ser(writer);
        if let Some(value) = self {
            value.ser(writer);
        }
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        if bool::de(reader)? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}
