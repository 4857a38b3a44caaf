use std::collections::BTreeSet;

/// Known peer base URLs.
///
/// Kept ordered so that every pass over the peers (consensus, announcement)
/// visits them in ascending address order.
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
}

impl PeerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer. Returns `false` if it was already known or the address is blank.
    pub fn insert(&mut self, address: &str) -> bool {
        let address = normalize(address);
        if address.is_empty() {
            return false;
        }
        let added = self.peers.insert(address.to_owned());
        if added {
            tracing::info!(peer = address, "added peer");
        }
        added
    }

    /// Add every address except `own_address`. Returns how many were new.
    pub fn extend<I, S>(&mut self, addresses: I, own_address: Option<&str>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let own = own_address.map(normalize);
        addresses
            .into_iter()
            .filter(|a| Some(normalize(a.as_ref())) != own)
            .filter(|a| self.insert(a.as_ref()))
            .count()
    }

    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.peers.contains(normalize(address))
    }

    /// Snapshot of the addresses in ascending order.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }
}

/// Peers are compared without surrounding whitespace or trailing slashes.
#[must_use]
pub fn normalize(address: &str) -> &str {
    address.trim().trim_end_matches('/')
}
