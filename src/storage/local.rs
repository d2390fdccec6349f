use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ObjectStore;
use crate::error::{Error, Result};

/// Stores objects as files beneath a root directory, keyed by relative path.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        if key.split('/').any(|part| part == "..") || key.starts_with('/') {
            return Err(Error::Storage(format!("invalid object key '{key}'")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<()> {
        let target = self.resolve(key)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local_path, &target).await?;
        debug!(key, target = %target.display(), "Stored object");
        Ok(())
    }

    async fn download(&self, key: &str, local_path: &Path) -> Result<PathBuf> {
        let source = self.resolve(key)?;
        if !tokio::fs::try_exists(&source).await? {
            return Err(Error::Storage(format!("object '{key}' not found")));
        }
        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&source, local_path).await?;
        Ok(local_path.to_path_buf())
    }

    async fn put_bytes(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<()> {
        let target = self.resolve(key)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let root = temp_dir("late_bus_tracker_test_store");
        let store = LocalObjectStore::new(root.join("bucket"));

        let src = root.join("src.csv");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(&src, "a,b\n1,2\n").unwrap();

        store.upload(&src, "live_location/snap.csv").await.unwrap();
        assert!(root.join("bucket/live_location/snap.csv").exists());

        let dst = root.join("out/snap.csv");
        let got = store.download("live_location/snap.csv", &dst).await.unwrap();
        assert_eq!(got, dst);
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "a,b\n1,2\n");

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_missing_object_is_storage_error() {
        let root = temp_dir("late_bus_tracker_test_store_missing");
        let store = LocalObjectStore::new(&root);

        let err = store
            .download("late_buses/none.csv", &root.join("x.csv"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "storage_error");
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let store = LocalObjectStore::new(temp_dir("late_bus_tracker_test_store_escape"));
        assert!(store.put_bytes("../etc/passwd", vec![], "text/plain").await.is_err());
        assert!(store.put_bytes("/abs", vec![], "text/plain").await.is_err());
    }
}
