//! Reference resolver - turns user input into a store key and a content source

use std::collections::HashSet;
use std::sync::Arc;

use crate::application::errors::ModuleError;
use crate::domain::entities::module::{derive_module_name, is_bare_name};
use crate::domain::entities::{ModuleReference, ResolvedModule};
use crate::domain::traits::Fetcher;
use crate::infrastructure::config::RegistryConfig;

/// A resolved module, plus the body if resolution already had to download it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub module: ResolvedModule,
    pub prefetched: Option<Vec<u8>>,
}

impl Resolution {
    fn new(module: ResolvedModule) -> Self {
        Self { module, prefetched: None }
    }
}

/// Applies the registry naming conventions to module references
pub struct ReferenceResolver {
    fetcher: Arc<dyn Fetcher>,
    registry: RegistryConfig,
    extension: String,
    builtin: HashSet<String>,
}

impl ReferenceResolver {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        registry: RegistryConfig,
        extension: impl Into<String>,
        builtin: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            fetcher,
            registry,
            extension: extension.into(),
            builtin: builtin.into_iter().map(|n| n.to_lowercase()).collect(),
        }
    }

    /// Canonical registry URL for a bare module name
    pub fn canonical_url(&self, name: &str) -> String {
        self.registry.module_url(name, &self.extension)
    }

    /// Path below the registry prefix, if `url` points into the registry (prefix compared case-insensitively)
    fn canonical_remainder<'a>(&self, url: &'a str) -> Option<&'a str> {
        let prefix = self.registry.raw_prefix();
        let head = url.get(..prefix.len())?;
        head.eq_ignore_ascii_case(&prefix).then(|| &url[prefix.len()..])
    }

    pub async fn resolve(&self, reference: &ModuleReference) -> Result<Resolution, ModuleError> {
        let resolution = match reference {
            ModuleReference::UploadedFile { file_name, path } => {
                let name = self.uploaded_name(file_name)?;
                Resolution::new(ResolvedModule::local(name, path.clone()))
            }
            ModuleReference::Url(url) => match self.canonical_remainder(url) {
                Some(rest) => {
                    let name = derive_module_name(rest)
                        .ok_or_else(|| ModuleError::InvalidReference(url.clone()))?;
                    self.check_builtin(&name)?;
                    Resolution::new(ResolvedModule::remote(name, url.clone()))
                }
                None => self.resolve_foreign(url).await?,
            },
            ModuleReference::Name(raw) => {
                let name = raw.trim().to_lowercase();
                if !is_bare_name(&name) {
                    return Err(ModuleError::InvalidReference(raw.clone()));
                }
                self.check_builtin(&name)?;
                let url = self.canonical_url(&name);
                Resolution::new(ResolvedModule::remote(name, url))
            }
        };

        tracing::debug!("Resolved {} to {:?}", reference, resolution.module);
        Ok(resolution)
    }

    /// Any URL outside the registry must answer before it is accepted
    async fn resolve_foreign(&self, url: &str) -> Result<Resolution, ModuleError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|_| ModuleError::InvalidReference(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ModuleError::InvalidReference(url.to_string()));
        }

        let name = derive_module_name(parsed.path())
            .ok_or_else(|| ModuleError::InvalidReference(url.to_string()))?;
        self.check_builtin(&name)?;

        let content = self.fetcher.fetch(url).await.map_err(|e| {
            tracing::warn!("Module {} unreachable at {}: {}", name, url, e);
            ModuleError::NotFound(name.clone())
        })?;

        Ok(Resolution {
            module: ResolvedModule::remote(name, url),
            prefetched: Some(content),
        })
    }

    fn uploaded_name(&self, file_name: &str) -> Result<String, ModuleError> {
        let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
        let stem = base
            .strip_suffix(&format!(".{}", self.extension))
            .ok_or_else(|| {
                ModuleError::InvalidReference(format!(
                    "{} is not a .{} file",
                    file_name, self.extension
                ))
            })?
            .to_lowercase();

        if !is_bare_name(&stem) {
            return Err(ModuleError::InvalidReference(file_name.to_string()));
        }
        self.check_builtin(&stem)?;
        Ok(stem)
    }

    fn check_builtin(&self, name: &str) -> Result<(), ModuleError> {
        if self.builtin.contains(name) {
            return Err(ModuleError::BuiltIn(name.to_string()));
        }
        Ok(())
    }
}
