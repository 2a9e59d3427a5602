use rand::seq::SliceRandom;
use rand::Rng;
use std::net::SocketAddr;

/// Fixed set of peers this replica gossips with. Established at startup, never changes.
#[derive(Clone, Debug)]
pub struct Neighbors {
    addrs: Vec<SocketAddr>,
}

impl Neighbors {
    /// Duplicates and our own address are dropped, keeping the original order otherwise.
    pub fn new(my_addr: SocketAddr, addrs: Vec<SocketAddr>) -> Self {
        let mut unique = Vec::with_capacity(addrs.len());
        for addr in addrs {
            if addr != my_addr && !unique.contains(&addr) {
                unique.push(addr);
            }
        }

        Neighbors { addrs: unique }
    }

    pub fn all(&self) -> &[SocketAddr] {
        &self.addrs
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Uniformly random neighbor, or None if we have no neighbors.
    pub(crate) fn random<R: Rng>(&self, rng: &mut R) -> Option<SocketAddr> {
        self.addrs.choose(rng).copied()
    }
}
