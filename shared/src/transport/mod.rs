mod error;

pub use error::TransportError;

use crate::{
    connection::packet_channel::{PacketChannel, Reliability},
    types::PeerId,
};

/// The peer-to-peer link the dispatcher sends and receives through.
///
/// Within one channel, packets from the same sender must arrive in send
/// order. No ordering is assumed across channels.
pub trait Transport {
    /// Sends `payload` to exactly one peer.
    fn send(
        &mut self,
        peer: PeerId,
        payload: &[u8],
        channel: PacketChannel,
        reliability: Reliability,
    ) -> Result<(), TransportError>;

    /// Size of the next packet waiting on `channel`, if any.
    fn packet_available(&mut self, channel: PacketChannel) -> Option<usize>;

    /// Takes the next packet waiting on `channel`.
    fn receive(
        &mut self,
        channel: PacketChannel,
    ) -> Result<Option<(PeerId, Box<[u8]>)>, TransportError>;
}
