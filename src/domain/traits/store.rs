use async_trait::async_trait;
use std::collections::BTreeSet;
use crate::application::errors::StorageError;

/// Module store - the on-disk set of installed modules, keyed by name
#[async_trait]
pub trait ModuleStore: Send + Sync {
    /// Write (or overwrite) a module. A failed write never leaves a partial file behind.
    async fn put(&self, name: &str, content: &[u8]) -> Result<(), StorageError>;

    /// Delete a module; returns whether it existed
    async fn remove(&self, name: &str) -> Result<bool, StorageError>;

    /// Names of all installed modules
    async fn list(&self) -> Result<BTreeSet<String>, StorageError>;

    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Current content of a module, `None` if not installed
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;
}
