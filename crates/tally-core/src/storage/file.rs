//! File-backed key-value storage
//!
//! Each key is stored as its own JSON file in the data directory.
//! Uses atomic writes (write to temp file, then rename) to prevent corruption.
//!
//! Storage location: `~/.local/share/tally/` (configurable via `Config`)
//!
//! Files (default namespace):
//! - `expense_tracker_users.json`
//! - `expense_tracker_current_user.json`
//! - `expense_tracker_expenses.json`
//! - `expense_tracker_categories.json`
//! - `expense_tracker_quick_expenses.json`

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::{StorageError, StorageResult};
use super::kv::KeyValueStore;

/// Key-value store persisting one file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the stored files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let name = file_name_for(key).ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;

        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::ReadError {
                key: key.to_string(),
                path,
                source,
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        atomic_write(&path, value.as_bytes()).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_io(e, path)),
        }
    }
}

/// Map a storage key to a file name
///
/// `@expense_tracker_users` becomes `expense_tracker_users.json`. Characters
/// outside `[A-Za-z0-9_.-]` are replaced with `_`.
fn file_name_for(key: &str) -> Option<String> {
    let stem: String = key
        .trim_start_matches('@')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        None
    } else {
        Some(format!("{}.json", stem))
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
async fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    // Temp file in the same directory keeps the rename atomic
    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path)
        .await
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .await
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.sync_all()
        .await
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|source| StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_for() {
        assert_eq!(
            file_name_for("@expense_tracker_users").as_deref(),
            Some("expense_tracker_users.json")
        );
        assert_eq!(file_name_for("a/b c").as_deref(), Some("a_b_c.json"));
        assert!(file_name_for("@").is_none());
        assert!(file_name_for("..").is_none());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        // Initially nothing stored
        assert!(store.get("@t_users").await.unwrap().is_none());

        store.set("@t_users", r#"[{"id":"user-1"}]"#).await.unwrap();

        let loaded = store.get("@t_users").await.unwrap().unwrap();
        assert_eq!(loaded, r#"[{"id":"user-1"}]"#);
        assert!(temp_dir.path().join("t_users.json").exists());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.set("@t_expenses", "[]").await.unwrap();
        store.set("@t_expenses", "[1]").await.unwrap();

        assert_eq!(store.get("@t_expenses").await.unwrap().as_deref(), Some("[1]"));
        assert!(!temp_dir.path().join("t_expenses.tmp").exists());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.set("@t_current_user", "null").await.unwrap();
        store.remove("@t_current_user").await.unwrap();
        assert!(store.get("@t_current_user").await.unwrap().is_none());

        store.remove("@t_current_user").await.unwrap();
    }

    #[tokio::test]
    async fn test_creates_missing_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let store = FileStore::new(&nested);

        store.set("@t_categories", "[]").await.unwrap();

        assert!(nested.join("t_categories.json").exists());
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        let err = store.set("@", "[]").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
