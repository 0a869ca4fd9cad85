use thiserror::Error;

use crate::{connection::packet_channel::PacketChannel, types::PeerId};

/// Errors reported by a [`Transport`](super::Transport) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport could not hand a packet to the given peer
    #[error("Failed to send packet to {peer} on {channel:?} channel")]
    SendFailed { peer: PeerId, channel: PacketChannel },

    /// A packet was reported available but could not be read
    #[error("Failed to read packet from {channel:?} channel")]
    ReceiveFailed { channel: PacketChannel },
}
