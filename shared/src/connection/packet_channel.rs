/// Logical transport channels. Indices match the transport's integer channels.
#[derive(Copy, Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum PacketChannel {
    /// Low-latency, reliable and ordered
    Main,
    /// Reliable and ordered, but may be queued or delayed
    Buffered,
    /// Reliable. Carries session and entity RPCs
    Rpc,
}

impl PacketChannel {
    pub const ALL: [PacketChannel; 3] = [
        PacketChannel::Main,
        PacketChannel::Buffered,
        PacketChannel::Rpc,
    ];

    pub fn index(self) -> usize {
        match self {
            PacketChannel::Main => 0,
            PacketChannel::Buffered => 1,
            PacketChannel::Rpc => 2,
        }
    }

    pub fn reliability(self) -> Reliability {
        match self {
            PacketChannel::Buffered => Reliability::ReliableWithBuffering,
            PacketChannel::Main | PacketChannel::Rpc => Reliability::Reliable,
        }
    }
}

/// Delivery guarantee requested from the transport for a send.
#[derive(Copy, Debug, Clone, Eq, PartialEq, Hash)]
pub enum Reliability {
    Reliable,
    ReliableWithBuffering,
}
