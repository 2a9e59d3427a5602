use std::fmt;

/// Version of a key's value. Versions of a key only ever move forward, and 0 means "never seen".
#[derive(Copy, Clone, PartialOrd, Ord, PartialEq, Eq, Hash, Default)]
pub struct Version(u64);

impl Version {
    /// Highest version a replica will hold. Version attributes on the wire are signed 64-bit.
    pub const MAX: Version = Version(i64::MAX as u64);

    pub fn new(version: u64) -> Self {
        Version(version)
    }

    /// None if `version` is above `Version::MAX`.
    pub(crate) fn bounded(version: u64) -> Option<Self> {
        if version <= Self::MAX.0 {
            Some(Version(version))
        } else {
            None
        }
    }

    pub fn unseen() -> Self {
        Version(0)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_unseen(&self) -> bool {
        self.0 == 0
    }

    /// None once the key has reached `Version::MAX`.
    pub(crate) fn next(&self) -> Option<Version> {
        self.0.checked_add(1).and_then(Version::bounded)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// A value together with the version it was written at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue {
    pub version: Version,
    pub value: String,
}
