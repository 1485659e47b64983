use crate::domain::model::ObjectListing;
use crate::domain::ports::ObjectStore;
use crate::utils::error::{EtlError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

/// Object store over a directory tree. Keys are `/`-separated paths
/// relative to the root.
///
/// A listing from the start walks the tree once; calls that resume after a
/// key page through that sorted snapshot until the next fresh listing or
/// the next write through this store (or a clone of it).
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    snapshot: Arc<Mutex<Option<Arc<Vec<String>>>>>,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            snapshot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(EtlError::storage("resolve", key, "key must be a relative path"));
        }
        Ok(self.root.join(relative))
    }

    fn all_keys(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(|e| {
                EtlError::storage("ListObjects", &self.root.display().to_string(), e)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| EtlError::storage("ListObjects", &entry.path().display().to_string(), e))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }

        // S3 依位元組順序列出 key
        keys.sort();
        Ok(keys)
    }

    fn listed_keys(&self, fresh: bool) -> Result<Arc<Vec<String>>> {
        let mut snapshot = self.snapshot.lock().map_err(|_| {
            let root = self.root.display().to_string();
            EtlError::storage("ListObjects", &root, "listing snapshot poisoned")
        })?;
        if !fresh {
            if let Some(keys) = snapshot.as_ref() {
                return Ok(Arc::clone(keys));
            }
        }

        let keys = Arc::new(self.all_keys()?);
        *snapshot = Some(Arc::clone(&keys));
        Ok(keys)
    }

    fn invalidate_listing(&self) {
        if let Ok(mut snapshot) = self.snapshot.lock() {
            *snapshot = None;
        }
    }
}

impl ObjectStore for LocalStore {
    async fn list_keys(&self, start_after: Option<&str>, max_keys: usize) -> Result<ObjectListing> {
        let keys = self.listed_keys(start_after.is_none())?;
        let start = match start_after {
            Some(after) => keys.partition_point(|k| k.as_str() <= after),
            None => 0,
        };
        let end = start.saturating_add(max_keys).min(keys.len());

        Ok(ObjectListing {
            keys: keys[start..end].to_vec(),
            is_truncated: end < keys.len(),
        })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        fs::read(&path).map_err(|e| EtlError::storage("GetObject", key, e))
    }

    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data).map_err(|e| EtlError::storage("PutObject", key, e))?;
        self.invalidate_listing();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_keys_walks_tree_in_key_order() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        store.put_object("b.json", b"{}").await.unwrap();
        store.put_object("a/2.json", b"{}").await.unwrap();
        store.put_object("a/1.json", b"{}").await.unwrap();

        let listing = store.list_keys(None, 10).await.unwrap();
        assert_eq!(listing.keys, vec!["a/1.json", "a/2.json", "b.json"]);
        assert!(!listing.is_truncated);

        let listing = store.list_keys(Some("a/1.json"), 1).await.unwrap();
        assert_eq!(listing.keys, vec!["a/2.json"]);
        assert!(listing.is_truncated);
    }

    #[tokio::test]
    async fn test_resumed_listing_pages_through_one_walk() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        for key in ["k1.json", "k2.json", "k3.json"] {
            store.put_object(key, b"{}").await.unwrap();
        }

        let first = store.list_keys(None, 1).await.unwrap();
        assert_eq!(first.keys, vec!["k1.json"]);

        // 繞過 store 直接寫入，續頁時不會重新走訪目錄
        std::fs::write(dir.path().join("k15.json"), b"{}").unwrap();
        let rest = store.list_keys(Some("k1.json"), 10).await.unwrap();
        assert_eq!(rest.keys, vec!["k2.json", "k3.json"]);
        assert!(!rest.is_truncated);

        let fresh = store.list_keys(None, 10).await.unwrap();
        assert_eq!(fresh.keys, vec!["k1.json", "k15.json", "k2.json", "k3.json"]);
    }

    #[tokio::test]
    async fn test_write_through_clone_refreshes_listing() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        store.put_object("a.json", b"{}").await.unwrap();
        assert_eq!(store.list_keys(None, 1).await.unwrap().keys, vec!["a.json"]);

        store.clone().put_object("b.json", b"{}").await.unwrap();
        let listing = store.list_keys(Some("a.json"), 10).await.unwrap();
        assert_eq!(listing.keys, vec!["b.json"]);
    }

    #[tokio::test]
    async fn test_missing_root_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("absent"));
        let listing = store.list_keys(None, 10).await.unwrap();
        assert!(listing.keys.is_empty());
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("root"));

        assert!(store.put_object("../outside.json", b"{}").await.is_err());
        assert!(store.get_object("/etc/hosts").await.is_err());
        assert!(!dir.path().join("outside.json").exists());
    }

    #[tokio::test]
    async fn test_get_missing_object_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        let err = store.get_object("nope.json").await.unwrap_err();
        assert!(matches!(err, EtlError::StorageError { .. }));
    }
}
