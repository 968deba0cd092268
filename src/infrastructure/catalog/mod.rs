//! Module catalog - what is installed right now
//!
//! Built by scanning the module store at startup and after every change.
//! Module files are treated as opaque artifacts: the catalog records what
//! they hash to, nothing here ever executes them.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::traits::ModuleStore;
use crate::infrastructure::hashing;

/// One installed module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    pub name: String,
    pub digest: String,
    pub size: usize,
}

/// Registry of installed modules, keyed by name
#[derive(Default)]
pub struct ModuleCatalog {
    modules: RwLock<BTreeMap<String, ModuleHandle>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog contents with a fresh scan; returns the module count
    pub async fn rescan(&self, store: &dyn ModuleStore) -> Result<usize, StorageError> {
        let mut found = BTreeMap::new();

        for name in store.list().await? {
            // A file can vanish between list and read
            let Some(content) = store.read(&name).await? else {
                continue;
            };
            let handle = ModuleHandle {
                digest: hashing::digest(&content),
                size: content.len(),
                name: name.clone(),
            };
            tracing::debug!("Registered module {} ({})", name, hashing::short_digest(&handle.digest));
            found.insert(name, handle);
        }

        let count = found.len();
        let mut modules = self.modules.write()
            .map_err(|_| StorageError::Io(std::io::Error::other("catalog lock poisoned")))?;
        *modules = found;
        Ok(count)
    }

    /// All modules, sorted by name
    pub fn entries(&self) -> Vec<ModuleHandle> {
        self.modules.read()
            .ok()
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// One line per module: name, short digest, size
    pub fn render(&self) -> String {
        let entries = self.entries();
        if entries.is_empty() {
            return "No modules installed".to_string();
        }

        let mut out = format!("Installed modules ({}):\n", entries.len());
        for handle in entries {
            out.push_str(&format!(
                "  {} - {} ({} bytes)\n",
                handle.name,
                hashing::short_digest(&handle.digest),
                handle.size
            ));
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::FsModuleStore;

    #[tokio::test]
    async fn test_scan_registers_installed_modules() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModuleStore::new(dir.path(), "py");
        store.put("weather", b"w").await.unwrap();
        store.put("time", b"t").await.unwrap();

        let catalog = ModuleCatalog::new();
        assert_eq!(catalog.rescan(&store).await.unwrap(), 2);

        let entries = catalog.entries();
        let names: Vec<&str> = entries.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["time", "weather"]);
        assert_eq!(entries[0].digest, hashing::digest(b"t"));
        assert_eq!(entries[0].size, 1);
    }

    #[tokio::test]
    async fn test_rescan_drops_removed_modules() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModuleStore::new(dir.path(), "py");
        store.put("weather", b"w").await.unwrap();
        let catalog = ModuleCatalog::new();
        catalog.rescan(&store).await.unwrap();

        store.remove("weather").await.unwrap();
        assert_eq!(catalog.rescan(&store).await.unwrap(), 0);
        assert!(catalog.entries().is_empty());
        assert_eq!(catalog.render(), "No modules installed");
    }
}
