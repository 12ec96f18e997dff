use async_trait::async_trait;
use rand::Rng;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::core::store::{validate_key, KeyValueStore, StoreError};

/// One file per key under a root directory. Keys are validated so they can
/// never leave the root.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;

        // Write then rename so readers never see a half-written file. Each
        // write gets its own temp name so concurrent puts to one key cannot
        // rename each other's file away.
        let nonce: u64 = rand::thread_rng().gen();
        let tmp = self.root.join(format!(".{}.{:016x}.tmp", key, nonce));
        if let Err(e) = tokio::fs::write(&tmp, value).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_round_trip_creates_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("cache");
        let store = FileStore::new(&root);

        store.put("course_1_export.zip", b"PK").await.unwrap();

        assert!(root.join("course_1_export.zip").exists());
        assert_eq!(
            store.get("course_1_export.zip").await.unwrap(),
            Some(b"PK".to_vec())
        );
    }

    #[tokio::test]
    async fn test_missing_key_and_delete() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert_eq!(store.get("token.json").await.unwrap(), None);
        store.put("token.json", b"{}").await.unwrap();
        store.delete("token.json").await.unwrap();
        store.delete("token.json").await.unwrap();
        assert_eq!(store.get("token.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.put("token.json", b"one").await.unwrap();
        store.put("token.json", b"two").await.unwrap();

        assert_eq!(store.get("token.json").await.unwrap(), Some(b"two".to_vec()));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_to_one_key_all_succeed() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(FileStore::new(dir.path()));

        let mut handles = Vec::new();
        for task in 0..8u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    store.put("token.json", &[task]).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let value = store.get("token.json").await.unwrap().unwrap();
        assert_eq!(value.len(), 1);
        assert!(value[0] < 8);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("token.json")]);
    }

    #[tokio::test]
    async fn test_invalid_key_never_touches_disk() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        assert!(store.put("../outside", b"x").await.is_err());
        assert!(!dir.path().join("outside").exists());
    }
}
