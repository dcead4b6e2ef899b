//! Read-only file access used by the asset load pass.
//!
//! The registry never opens files itself; it asks a [`TitleStorage`] whether a
//! path exists and then reads it in one go. Paths are always forward-slash
//! relative paths such as `textures/brick.png`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::AssetError;

/// Byte access to the application's bundled files.
pub trait TitleStorage {
    fn exists(&self, path: &str) -> bool;

    /// Size in bytes, or `None` when the file does not exist.
    fn size(&self, path: &str) -> Option<u64>;

    /// Reads the whole file.
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError>;

    /// Reads the whole file as UTF-8 text.
    fn read_to_string(&self, path: &str) -> Result<String, AssetError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|err| AssetError::Io {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
        })
    }
}

/// Storage rooted at a directory on disk.
#[derive(Clone, Debug)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory every path is resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl TitleStorage for DirectoryStorage {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn size(&self, path: &str) -> Option<u64> {
        std::fs::metadata(self.resolve(path))
            .ok()
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full = self.resolve(path);
        if !self.exists(path) {
            return Err(AssetError::MissingFile {
                path: full.display().to_string(),
            });
        }
        std::fs::read(&full).map_err(|source| AssetError::Io {
            path: full.display().to_string(),
            source,
        })
    }
}

/// Storage backed by an in-memory map of path to bytes.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }
}

impl TitleStorage for MemoryStorage {
    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn size(&self, path: &str) -> Option<u64> {
        self.files.get(path).map(|bytes| bytes.len() as u64)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::MissingFile {
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_reports_missing_files() {
        let storage = MemoryStorage::new().with("a.txt", b"hello".to_vec());

        assert!(storage.exists("a.txt"));
        assert_eq!(storage.size("a.txt"), Some(5));
        assert_eq!(storage.read_to_string("a.txt").unwrap(), "hello");

        assert!(!storage.exists("b.txt"));
        assert_eq!(storage.size("b.txt"), None);
        assert!(matches!(
            storage.read("b.txt"),
            Err(AssetError::MissingFile { path }) if path == "b.txt"
        ));
    }

    #[test]
    fn invalid_utf8_is_an_io_error() {
        let storage = MemoryStorage::new().with("bad.wgsl", vec![0xff, 0xfe]);
        assert!(matches!(
            storage.read_to_string("bad.wgsl"),
            Err(AssetError::Io { .. })
        ));
    }

    #[test]
    fn directory_storage_reads_relative_paths() {
        let root = std::env::temp_dir().join(format!("atrium-storage-{}", std::process::id()));
        std::fs::create_dir_all(root.join("shaders")).unwrap();
        std::fs::write(root.join("shaders/x.wgsl"), "fn main() {}").unwrap();

        let storage = DirectoryStorage::new(&root);
        assert!(storage.exists("shaders/x.wgsl"));
        assert_eq!(storage.size("shaders/x.wgsl"), Some(12));
        assert_eq!(storage.read_to_string("shaders/x.wgsl").unwrap(), "fn main() {}");
        assert!(!storage.exists("shaders"));
        assert!(matches!(
            storage.read("missing.obj"),
            Err(AssetError::MissingFile { .. })
        ));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
