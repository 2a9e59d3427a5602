use crate::storage::Storage;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// FileStorage keeps one file per key inside a directory: `{directory}/{key}` holds the raw value.
///
/// Keys become file names, so keys which aren't a single plain path component are rejected with
/// `ErrorKind::InvalidInput`. Writes are staged in `{directory}/.staging/`, and that name is
/// reserved as well.
pub struct FileStorage {
    directory: PathBuf,
    staging: PathBuf,
}

const STAGING_DIR: &str = ".staging";

impl FileStorage {
    /// Creates the directory (and parents) if it doesn't exist yet.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self, io::Error> {
        let directory = directory.as_ref().to_path_buf();
        let staging = directory.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;

        Ok(FileStorage { directory, staging })
    }

    fn check_key(key: &str) -> Result<(), io::Error> {
        let is_plain_component = !key.is_empty()
            && key != "."
            && key != ".."
            && key != STAGING_DIR
            && !key.contains('/')
            && !key.contains('\\')
            && !key.contains('\0');
        if !is_plain_component {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("Key {:?} can't be used as a file name", key),
            ));
        }

        Ok(())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, io::Error> {
        Self::check_key(key)?;
        Ok(self.directory.join(key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, io::Error> {
        let path = self.path_for(key)?;
        match fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), io::Error> {
        let path = self.path_for(key)?;

        // Readers never see a partially written value. No key can name a file under staging.
        let staged = self.staging.join(key);
        fs::write(&staged, value)?;
        fs::rename(staged, path)
    }
}
