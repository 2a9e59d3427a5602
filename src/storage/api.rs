use std::io;

/// Storage is the replica's local value store. It knows nothing about versions; the replica keeps
/// those in its own `VersionedStore` and only calls `put()` after an update has been accepted.
///
/// Both methods are called synchronously from the replica event loop, so implementations should be
/// quick. A failed `put()` means the update is not accepted.
pub trait Storage {
    /// Read the value currently stored for `key`. `Ok(None)` if we've never stored it.
    fn get(&self, key: &str) -> Result<Option<String>, io::Error>;

    /// Overwrite the value stored for `key`.
    fn put(&mut self, key: &str, value: &str) -> Result<(), io::Error>;
}
