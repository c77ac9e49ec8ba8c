use log::{debug, trace};
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

const FILE_EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "json.tmp";

/// A key-value blob store that an `ExpenseStore` persists itself into.
///
/// Implementations are expected to be fast and synchronous; every mutation of the
/// store rewrites its whole blob.
pub trait Storage {
    /// Returns the blob stored under `key`, or `None` if nothing has been written yet
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replaces the blob stored under `key`
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage key '{0}' is not valid")]
    InvalidKey(String),
    #[error("storage is unavailable")]
    Unavailable,
    #[error("could not encode expenses")]
    Encode(#[source] serde_json::Error),
    #[error("could not access '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Keeps blobs in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: HashMap<String, Vec<u8>>,
    fail_writes: bool,
}

/// Keeps each blob in its own JSON file under a root directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `write` fail with `StorageError::Unavailable`
    pub fn fail_writes(&mut self, fail: bool) -> &mut Self {
        self.fail_writes = fail;
        self
    }

    /// Store a blob directly, bypassing `fail_writes`
    pub fn insert<K: Into<String>>(&mut self, key: K, bytes: Vec<u8>) -> &mut Self {
        self.blobs.insert(key.into(), bytes);
        self
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.blobs.get(key).map(|b| b.as_slice())
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable);
        }

        self.blobs.insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FileStorage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file that holds the blob for `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        // Keys become file names, so they must not be able to escape the root directory
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(|c: char| c == '/' || c == '\\');
        if !valid {
            return Err(StorageError::InvalidKey(key.into()));
        }

        Ok(self.root.join(format!("{}.{}", key, FILE_EXTENSION)))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;

        match fs::read(&path) {
            Ok(bytes) => {
                trace!("read {} bytes from {}", bytes.len(), path.display());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        write_atomic(&path, bytes)?;
        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

// Write to a sibling temp file, then rename over the target. A crash mid-write leaves
// the previous blob intact.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let tmp_path = path.with_extension(TMP_EXTENSION);
    let mut file = File::create(&tmp_path).map_err(io_error(&tmp_path))?;
    file.write_all(bytes).map_err(io_error(&tmp_path))?;
    file.sync_all().map_err(io_error(&tmp_path))?;

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        StorageError::Io {
            path: path.to_owned(),
            source,
        }
    })
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError {
    let path = path.to_owned();
    move |source| StorageError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_storage_read_missing() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read("Items").unwrap(), None);
    }

    #[test]
    fn memory_storage_write_read() {
        let mut storage = MemoryStorage::new();
        storage.write("Items", b"[]").unwrap();
        assert_eq!(storage.read("Items").unwrap(), Some(b"[]".to_vec()));
        assert_eq!(storage.get("Items"), Some(&b"[]"[..]));
    }

    #[test]
    fn memory_storage_fail_writes() {
        let mut storage = MemoryStorage::new();
        storage.insert("Items", b"[1]".to_vec()).fail_writes(true);

        let result = storage.write("Items", b"[2]");
        assert!(matches!(result, Err(StorageError::Unavailable)));
        assert_eq!(storage.get("Items"), Some(&b"[1]"[..]));
    }

    #[test]
    fn file_storage_read_missing() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        assert_eq!(storage.read("Items").unwrap(), None);
    }

    #[test]
    fn file_storage_write_read() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested"));

        storage.write("Items", b"[\"a\"]").unwrap();
        storage.write("Items", b"[\"b\"]").unwrap();

        assert_eq!(storage.read("Items").unwrap(), Some(b"[\"b\"]".to_vec()));
        assert!(dir.path().join("nested").join("Items.json").exists());
        assert!(!dir.path().join("nested").join("Items.json.tmp").exists());
    }

    #[test]
    fn file_storage_invalid_key() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path());

        for key in &["", "..", "../Items", "a/b", "a\\b"] {
            let result = storage.write(key, b"[]");
            assert!(
                matches!(result, Err(StorageError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }
}
