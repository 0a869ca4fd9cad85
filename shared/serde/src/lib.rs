mod error;
mod integer;
mod packet_reader;
mod packet_writer;
mod pool;
mod serde;

pub use error::SerdeErr;
pub use integer::UnsignedVariableInteger;
pub use packet_reader::{OwnedPacketReader, PacketReader};
pub use packet_writer::{ByteCounter, PacketWrite, PacketWriter};
pub use pool::{PacketPool, PooledWriter};
pub use serde::Serde;
