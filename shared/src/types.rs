use std::fmt;

use peerlink_serde::{PacketReader, PacketWrite, Serde, SerdeErr};

pub type RpcCode = u8;

/// Identifies one member of a session. Stable for the lifetime of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl PeerId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

impl Serde for PeerId {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self(u64::de(reader)?))
    }
}

/// Network-wide identity of a replicated entity.
///
/// A root at id `N` owns the block `N .. N + MAX_CHILDREN`; its children sit
/// at `N + 1`, `N + 2`, ... in declaration order. `0` means unassigned, and
/// doubles as the "no entity" value when an id is sent as a reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NetworkId(u32);

impl NetworkId {
    pub const UNASSIGNED: NetworkId = NetworkId(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }

    /// Id of the child at `index` (0-based) under this root.
    ///
    /// # Panics
    ///
    /// Panics if the child id does not fit in a `u32`. Ids read off the wire
    /// go through [`NetworkId::checked_child`] instead.
    pub fn child(&self, index: usize) -> NetworkId {
        match self.checked_child(index) {
            Some(child) => child,
            None => panic!("child {} of {} overflows the id space", index, self),
        }
    }

    /// Id of the child at `index`, or `None` if it would overflow.
    pub fn checked_child(&self, index: usize) -> Option<NetworkId> {
        let offset = u32::try_from(index).ok()?.checked_add(1)?;
        self.0.checked_add(offset).map(NetworkId)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Serde for NetworkId {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }
}

/// Template identifier used to instantiate an entity kind on a remote peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefabId(u8);

impl PrefabId {
    /// Reserved. Entities without a template cannot be spawned remotely.
    pub const NONE: PrefabId = PrefabId(0);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl Serde for PrefabId {
    fn ser(&self, writer: &mut dyn PacketWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self(u8::de(reader)?))
    }
}
