//! File-based module store
//!
//! Each installed module is exactly one `<name>.<extension>` file in a flat
//! directory. Writes go to a hidden temp file in the same directory and are
//! renamed into place.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::application::errors::StorageError;
use crate::domain::entities::module::is_bare_name;
use crate::domain::traits::ModuleStore;

/// Directory-backed module store
pub struct FsModuleStore {
    base_path: PathBuf,
    extension: String,
}

impl FsModuleStore {
    pub fn new(base_path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            extension: extension.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    /// Path of the file backing `name`
    pub fn module_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if !is_bare_name(name) {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(format!("{}.{}", name, self.extension)))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!(
            ".{}.{}.{}.tmp",
            name,
            self.extension,
            uuid::Uuid::new_v4().simple()
        ))
    }

    async fn write_temp(&self, temp: &Path, content: &[u8]) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::File::create(temp).await?;
        file.write_all(content).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl ModuleStore for FsModuleStore {
    async fn put(&self, name: &str, content: &[u8]) -> Result<(), StorageError> {
        let target = self.module_path(name)?;
        self.init().await?;

        let temp = self.temp_path(name);
        let written = match self.write_temp(&temp, content).await {
            Ok(()) => tokio::fs::rename(&temp, &target).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                tracing::debug!("Temp file {} not removed: {}", temp.display(), cleanup);
            }
            return Err(StorageError::Io(e));
        }

        tracing::info!("Stored module {} ({} bytes)", name, content.len());
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let path = match self.module_path(name) {
            Ok(path) => path,
            Err(_) => return Ok(false),
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Removed module {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list(&self) -> Result<BTreeSet<String>, StorageError> {
        let mut names = BTreeSet::new();

        let mut entries = match tokio::fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let suffix = format!(".{}", self.extension);
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            // Skip hidden and temp files
            if file_name.starts_with('.') {
                continue;
            }
            if let Some(stem) = file_name.strip_suffix(&suffix) {
                if is_bare_name(stem) {
                    names.insert(stem.to_string());
                }
            }
        }

        Ok(names)
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let Ok(path) = self.module_path(name) else {
            return Ok(false);
        };
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let Ok(path) = self.module_path(name) else {
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> FsModuleStore {
        FsModuleStore::new(dir.join("custom_modules"), "py")
    }

    #[tokio::test]
    async fn test_put_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.put("weather", b"print(1)").await.unwrap();

        let path = dir.path().join("custom_modules/weather.py");
        assert_eq!(std::fs::read(&path).unwrap(), b"print(1)");
        assert!(store.exists("weather").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.put("weather", b"v1").await.unwrap();
        store.put("weather", b"v2").await.unwrap();

        assert_eq!(store.read("weather").await.unwrap().as_deref(), Some(&b"v2"[..]));
        let files: Vec<_> = std::fs::read_dir(store.base_path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_put_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        std::fs::create_dir_all(store.base_path().join("x.py")).unwrap();

        let err = store.put("x", b"content").await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));

        let names: Vec<String> = std::fs::read_dir(store.base_path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["x.py".to_string()]);
        assert!(store.base_path().join("x.py").is_dir());
    }

    #[tokio::test]
    async fn test_put_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let err = store.put("../escape", b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_list_only_reports_module_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.put("a", b"a").await.unwrap();
        store.put("b", b"b").await.unwrap();
        std::fs::write(store.base_path().join("notes.txt"), b"x").unwrap();
        std::fs::write(store.base_path().join(".c.py.123.tmp"), b"x").unwrap();
        std::fs::create_dir(store.base_path().join("pkg.py")).unwrap();

        let names: Vec<String> = store.list().await.unwrap().into_iter().collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(dir.path()).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.put("a", b"a").await.unwrap();

        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert!(!store.remove("never").await.unwrap());
        assert!(!store.remove("../etc/passwd").await.unwrap());
    }
}
