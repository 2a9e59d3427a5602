use crate::storage::Storage;
use std::collections::HashMap;
use std::io;

// Handy for tests, and for replicas that don't care about surviving a restart.
#[derive(Default)]
pub struct InMemoryStorage {
    values: HashMap<String, String>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage::default()
    }
}

impl Storage for InMemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, io::Error> {
        Ok(self.values.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), io::Error> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites() {
        let mut storage = InMemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);

        storage.put("k", "v1").unwrap();
        storage.put("k", "v2").unwrap();

        assert_eq!(storage.get("k").unwrap(), Some("v2".to_string()));
        assert_eq!(storage.get("other").unwrap(), None);
    }
}
