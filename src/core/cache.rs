//! Small persisted key/value memory, scoped to one project.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;

pub trait Cache {
    fn fetch(&self, key: &str) -> Option<String>;
    fn store(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process cache, used by tests and one-off runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: BTreeMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl Cache for MemoryCache {
    fn fetch(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file under the global cache directory, named after the project root
/// so separate runs against the same project share it.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileCache {
    pub fn for_project(root: &Path) -> Result<Self> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let digest = Sha256::digest(root.to_string_lossy().as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        Ok(Self::open(paths::cache()?.join(format!("{}.json", name))))
    }

    /// Open a cache file; a missing or unreadable file starts empty.
    pub fn open(path: PathBuf) -> Self {
        let entries = io::read_file(&path, "read cache")
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Cache for FileCache {
    fn fetch(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());

        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize cache".to_string())))?;
        io::write_file_atomic(&self.path, &content, "write cache")?;

        debug!(key, value, path = %self.path.display(), "cache stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("project.json");

        let mut cache = FileCache::open(path.clone());
        cache.store("config-detector", "wordpress").unwrap();

        let reopened = FileCache::open(path);
        assert_eq!(reopened.fetch("config-detector").as_deref(), Some("wordpress"));
    }

    #[test]
    fn corrupt_cache_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(FileCache::open(path).fetch("config-detector"), None);
    }

    #[test]
    fn memory_cache_overwrites() {
        let mut cache = MemoryCache::new().with_entry("config-detector", "dotenv");
        cache.store("config-detector", "json").unwrap();
        assert_eq!(cache.fetch("config-detector").as_deref(), Some("json"));
    }
}
