//! Module lifecycle - install, remove, bulk install and bulk update
//!
//! The manager is the only writer of the module store. Every operation either
//! completes or leaves the store as it was for that module; a restart is
//! requested after the store write it depends on.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::application::errors::{ModuleError, StorageError};
use crate::application::services::locks::NameLocks;
use crate::application::services::resolver::{ReferenceResolver, Resolution};
use crate::domain::entities::module::is_bare_name;
use crate::domain::entities::{ModuleReference, ModuleSource};
use crate::domain::traits::{Fetcher, Host, ModuleStore, RemoveHook};
use crate::infrastructure::catalog::ModuleCatalog;
use crate::infrastructure::config::Config;
use crate::infrastructure::hashing;
use crate::infrastructure::registry::RegistryClient;

/// Result of a single install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub name: String,
    pub digest: String,
    pub size: usize,
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The module {} is loaded!", self.name)
    }
}

/// Result of a removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub name: String,
    /// Set when a post-remove hook failed; the module file is gone regardless
    pub cleanup_error: Option<String>,
}

impl fmt::Display for RemoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The module {} removed!", self.name)?;
        if let Some(err) = &self.cleanup_error {
            write!(f, " (cleanup failed: {})", err)?;
        }
        Ok(())
    }
}

/// Result of hashing a remote module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOutcome {
    pub url: String,
    pub file_name: String,
    pub digest: String,
}

impl fmt::Display for HashOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module hash: {}\nLink: {}\nFile: {}",
            self.digest, self.url, self.file_name
        )
    }
}

/// Result of installing every registry module not yet present
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallAllOutcome {
    AlreadyLoaded,
    Installed {
        added: BTreeSet<String>,
        failed: BTreeSet<String>,
    },
}

impl InstallAllOutcome {
    pub fn added(&self) -> BTreeSet<String> {
        match self {
            InstallAllOutcome::AlreadyLoaded => BTreeSet::new(),
            InstallAllOutcome::Installed { added, .. } => added.clone(),
        }
    }
}

impl fmt::Display for InstallAllOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallAllOutcome::AlreadyLoaded => write!(f, "All modules are already loaded"),
            InstallAllOutcome::Installed { added, failed } => {
                if added.is_empty() {
                    write!(f, "No new modules could be loaded")?;
                } else {
                    write!(f, "Successfully loaded new modules: {}", join(added))?;
                }
                if !failed.is_empty() {
                    write!(f, " ({} failed)", failed.len())?;
                }
                Ok(())
            }
        }
    }
}

/// Result of re-fetching every installed module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAllOutcome {
    NothingInstalled,
    Updated {
        updated: BTreeSet<String>,
        /// Subset of `updated` whose content actually differs from before
        changed: BTreeSet<String>,
        failed: BTreeSet<String>,
        restart_requested: bool,
    },
}

impl fmt::Display for UpdateAllOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateAllOutcome::NothingInstalled => write!(f, "No modules installed"),
            UpdateAllOutcome::Updated { updated, changed, failed, restart_requested } => {
                write!(f, "Successfully updated {} modules", updated.len())?;
                if !changed.is_empty() {
                    write!(f, ", changed: {}", join(changed))?;
                }
                if !failed.is_empty() {
                    write!(f, " ({} failed: {})", failed.len(), join(failed))?;
                }
                if !changed.is_empty() && !restart_requested {
                    write!(f, ". Changes apply after the next restart")?;
                }
                Ok(())
            }
        }
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// Coordinates resolver, fetcher, store and host for module lifecycle operations
pub struct ModuleManager {
    resolver: ReferenceResolver,
    registry: RegistryClient,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ModuleStore>,
    host: Arc<dyn Host>,
    hooks: Vec<Arc<dyn RemoveHook>>,
    locks: NameLocks,
    catalog: ModuleCatalog,
    extension: String,
    builtin: HashSet<String>,
    restart_on_update: bool,
}

impl ModuleManager {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ModuleStore>,
        host: Arc<dyn Host>,
    ) -> Self {
        let modules = &config.modules;
        Self {
            resolver: ReferenceResolver::new(
                fetcher.clone(),
                config.registry.clone(),
                modules.extension.clone(),
                modules.builtin.clone(),
            ),
            registry: RegistryClient::new(fetcher.clone(), config.registry.clone()),
            fetcher,
            store,
            host,
            hooks: Vec::new(),
            locks: NameLocks::new(),
            catalog: ModuleCatalog::new(),
            extension: modules.extension.clone(),
            builtin: modules.builtin.iter().map(|n| n.to_lowercase()).collect(),
            restart_on_update: modules.restart_on_update,
        }
    }

    /// Attach a hook that runs after its module is removed
    pub fn with_hook(mut self, hook: Arc<dyn RemoveHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// File extension of module files
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Re-scan the store into the catalog
    pub async fn refresh_catalog(&self) -> Result<usize, ModuleError> {
        Ok(self.catalog.rescan(self.store.as_ref()).await?)
    }

    async fn refresh_catalog_quietly(&self) {
        if let Err(e) = self.refresh_catalog().await {
            tracing::warn!("Failed to refresh module catalog: {}", e);
        }
    }

    async fn put_locked(&self, name: &str, content: &[u8]) -> Result<(), StorageError> {
        let _guard = self.locks.lock(name).await;
        self.store.put(name, content).await
    }

    /// Install one module from a name, URL or uploaded file
    pub async fn install(&self, reference: &ModuleReference) -> Result<InstallOutcome, ModuleError> {
        let Resolution { module, prefetched } = self.resolver.resolve(reference).await?;

        let content = match (prefetched, &module.source) {
            (Some(content), _) => content,
            (None, ModuleSource::RemoteUrl(url)) => {
                self.fetcher.fetch(url).await.map_err(|e| {
                    tracing::warn!("Failed to fetch module {} from {}: {}", module.name, url, e);
                    ModuleError::NotFound(module.name.clone())
                })?
            }
            (None, ModuleSource::LocalPath(path)) => {
                tokio::fs::read(path).await.map_err(|e| {
                    tracing::warn!("Failed to read uploaded module {}: {}", path.display(), e);
                    ModuleError::NotFound(module.name.clone())
                })?
            }
        };

        self.put_locked(&module.name, &content).await?;
        let outcome = InstallOutcome {
            digest: hashing::digest(&content),
            size: content.len(),
            name: module.name,
        };
        tracing::info!("Installed module {} ({})", outcome.name, hashing::short_digest(&outcome.digest));

        self.refresh_catalog_quietly().await;
        self.host.request_restart();
        Ok(outcome)
    }

    /// Remove an installed module; built-in and unknown names are reported as not found
    pub async fn remove(&self, name: &str) -> Result<RemoveOutcome, ModuleError> {
        let name = name.trim().to_lowercase();
        if self.builtin.contains(&name) || !is_bare_name(&name) {
            return Err(ModuleError::NotInstalled(name));
        }

        let existed = {
            let _guard = self.locks.lock(&name).await;
            self.store.remove(&name).await?
        };
        if !existed {
            return Err(ModuleError::NotInstalled(name));
        }

        let mut cleanup_error = None;
        if let Some(hook) = self.hooks.iter().find(|h| h.module_name().eq_ignore_ascii_case(&name)) {
            if let Err(e) = hook.after_remove().await {
                tracing::warn!("Cleanup after removing {} failed: {}", name, e);
                cleanup_error = Some(e);
            }
        }

        self.refresh_catalog_quietly().await;
        self.host.request_restart();
        Ok(RemoveOutcome { name, cleanup_error })
    }

    /// Digest of the content at `url`, for auditing before install
    pub async fn hash(&self, url: &str) -> Result<HashOutcome, ModuleError> {
        let content = self.fetcher.fetch(url).await.map_err(|source| {
            ModuleError::NetworkFailure { url: url.to_string(), source }
        })?;

        let file_name = url
            .split(['?', '#'])
            .next()
            .and_then(|u| u.rsplit('/').next())
            .unwrap_or_default()
            .to_string();

        Ok(HashOutcome {
            url: url.to_string(),
            file_name,
            digest: hashing::digest(&content),
        })
    }

    /// Install every registry module that is not installed yet.
    ///
    /// A module that fails to download is skipped; only a failed listing aborts.
    pub async fn install_all_missing(&self) -> Result<InstallAllOutcome, ModuleError> {
        tracing::info!("Fetching info...");
        let entries = self.registry
            .listing()
            .await
            .map_err(ModuleError::RegistryUnavailable)?;

        let installed: HashSet<String> = self.store
            .list()
            .await?
            .into_iter()
            .map(|n| n.to_lowercase())
            .collect();

        let mut missing = BTreeMap::new();
        for entry in entries {
            let Some(name) = entry.module_name(&self.extension) else {
                continue;
            };
            if self.builtin.contains(&name) {
                tracing::debug!("Skipping registry entry {} (built-in)", name);
                continue;
            }
            if installed.contains(&name) {
                continue;
            }
            if let Some(url) = entry.download_url {
                missing.entry(name).or_insert(url);
            }
        }

        if missing.is_empty() {
            return Ok(InstallAllOutcome::AlreadyLoaded);
        }

        tracing::info!(
            "Loading new modules: {}",
            missing.keys().cloned().collect::<Vec<_>>().join(" ")
        );

        let mut added = BTreeSet::new();
        let mut failed = BTreeSet::new();
        for (name, url) in missing {
            let content = match self.fetcher.fetch(&url).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", name, e);
                    failed.insert(name);
                    continue;
                }
            };
            match self.put_locked(&name, &content).await {
                Ok(()) => {
                    added.insert(name);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", name, e);
                    failed.insert(name);
                }
            }
        }

        if !added.is_empty() {
            self.refresh_catalog_quietly().await;
            self.host.request_restart();
        }
        Ok(InstallAllOutcome::Installed { added, failed })
    }

    /// Re-download every installed module from the registry and overwrite it.
    ///
    /// Restarts only when `restart-on-update` is set and some module's content
    /// changed; otherwise the running host keeps the old code until its next restart.
    pub async fn update_all_installed(&self) -> Result<UpdateAllOutcome, ModuleError> {
        tracing::info!("Updating modules...");
        let installed = self.store.list().await?;
        if installed.is_empty() {
            return Ok(UpdateAllOutcome::NothingInstalled);
        }

        let mut updated = BTreeSet::new();
        let mut changed = BTreeSet::new();
        let mut failed = BTreeSet::new();
        for name in installed {
            let url = self.resolver.canonical_url(&name);
            let content = match self.fetcher.fetch(&url).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Failed to update {}: {}", name, e);
                    failed.insert(name);
                    continue;
                }
            };

            let previous = {
                let _guard = self.locks.lock(&name).await;
                let previous = self.store.read(&name).await;
                match self.store.put(&name, &content).await {
                    Ok(()) => previous,
                    Err(e) => {
                        tracing::warn!("Failed to update {}: {}", name, e);
                        failed.insert(name);
                        continue;
                    }
                }
            };

            let is_changed = match previous {
                Ok(Some(old)) => hashing::digest(&old) != hashing::digest(&content),
                _ => true,
            };
            if is_changed {
                changed.insert(name.clone());
            }
            updated.insert(name);
        }

        let restart_requested = self.restart_on_update && !changed.is_empty();
        if !changed.is_empty() {
            self.refresh_catalog_quietly().await;
        }
        if restart_requested {
            self.host.request_restart();
        } else if !changed.is_empty() {
            tracing::info!("{} modules changed; running code stays stale until restart", changed.len());
        }

        Ok(UpdateAllOutcome::Updated { updated, changed, failed, restart_requested })
    }
}
