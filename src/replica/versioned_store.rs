use crate::replica::Version;
use crate::wire::VersionMap;
use std::collections::HashMap;

/// VersionedStore tracks, per key, the version of the value currently sitting in this replica's
/// storage. It is only ever touched from the replica event loop.
#[derive(Default)]
pub(crate) struct VersionedStore {
    versions: HashMap<String, Version>,
}

impl VersionedStore {
    pub(crate) fn new() -> Self {
        VersionedStore::default()
    }

    /// Returns `Version::unseen()` for keys we've never accepted.
    pub(crate) fn version_of(&self, key: &str) -> Version {
        self.versions.get(key).copied().unwrap_or_else(Version::unseen)
    }

    /// Overwrites unconditionally. Callers must have already checked the new version is larger.
    pub(crate) fn record(&mut self, key: &str, version: Version) {
        debug_assert!(
            version >= self.version_of(key),
            "Version of {:?} can only ratchet forward. Current={:?}, New={:?}",
            key,
            self.version_of(key),
            version
        );
        self.versions.insert(key.to_string(), version);
    }

    pub(crate) fn snapshot(&self) -> VersionMap {
        self.versions
            .iter()
            .map(|(key, version)| (key.clone(), *version))
            .collect()
    }
}
