use std::collections::BTreeSet;

use crate::types::PeerId;

/// Membership of the group this peer is replicating with.
///
/// The session host is the peer whose roots draw ids from the host range.
/// Every other peer draws from the shared peer range.
#[derive(Clone, Debug)]
pub struct Session {
    local: PeerId,
    host: PeerId,
    peers: BTreeSet<PeerId>,
}

impl Session {
    pub fn new(local: PeerId, host: PeerId) -> Self {
        let mut peers = BTreeSet::new();
        peers.insert(local);
        peers.insert(host);
        Self { local, host, peers }
    }

    pub fn with_peer(mut self, peer: PeerId) -> Self {
        self.peers.insert(peer);
        self
    }

    pub fn local(&self) -> PeerId {
        self.local
    }

    pub fn host(&self) -> PeerId {
        self.host
    }

    pub fn is_host(&self, peer: PeerId) -> bool {
        self.host == peer
    }

    pub fn am_host(&self) -> bool {
        self.local == self.host
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.peers.contains(&peer)
    }

    /// Every member other than the local peer, in id order.
    pub fn remote_peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.peers.iter().copied().filter(move |peer| *peer != self.local)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub(crate) fn add_peer(&mut self, peer: PeerId) -> bool {
        self.peers.insert(peer)
    }

    pub(crate) fn remove_peer(&mut self, peer: PeerId) -> bool {
        if peer == self.local {
            return false;
        }
        self.peers.remove(&peer)
    }
}
