use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A bare module name: no path separators, dots, whitespace or URL delimiters.
static BARE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^/\\.\s?#%]+$").expect("bare name pattern is valid"));

/// Check whether `input` can be used as a bare module name
pub fn is_bare_name(input: &str) -> bool {
    BARE_NAME.is_match(input)
}

/// Derive a module name from a URL or file name.
///
/// Takes the final path segment, drops any query or fragment, cuts the
/// extension at the first dot and lower-cases the rest. Returns `None` when
/// nothing usable is left.
pub fn derive_module_name(location: &str) -> Option<String> {
    let location = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let segment = location
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = segment.split('.').next().unwrap_or_default().to_lowercase();

    is_bare_name(&stem).then_some(stem)
}

/// What the user supplied when asking for a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleReference {
    /// Short registry name, e.g. `weather`
    Name(String),
    /// Any URL, canonical registry or otherwise
    Url(String),
    /// A file the adapter already downloaded to `path`
    UploadedFile { file_name: String, path: PathBuf },
}

impl ModuleReference {
    /// Classify raw command input as a bare name or a URL
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if is_bare_name(raw) {
            ModuleReference::Name(raw.to_string())
        } else {
            ModuleReference::Url(raw.to_string())
        }
    }

    pub fn uploaded(file_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ModuleReference::UploadedFile {
            file_name: file_name.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleReference::Name(name) => write!(f, "{}", name),
            ModuleReference::Url(url) => write!(f, "{}", url),
            ModuleReference::UploadedFile { file_name, .. } => write!(f, "{}", file_name),
        }
    }
}

/// Where the bytes of a resolved module come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    RemoteUrl(String),
    LocalPath(PathBuf),
}

/// A reference turned into a store key plus a content source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub name: String,
    pub source: ModuleSource,
}

impl ResolvedModule {
    pub fn remote(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ModuleSource::RemoteUrl(url.into()),
        }
    }

    pub fn local(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: ModuleSource::LocalPath(path.into()),
        }
    }
}

/// One item of the registry's directory listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistryEntry {
    pub name: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl RegistryEntry {
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: Some(download_url.into()),
            kind: Some("file".to_string()),
        }
    }

    /// Module name for entries that are downloadable module files
    pub fn module_name(&self, extension: &str) -> Option<String> {
        if self.kind.as_deref().is_some_and(|k| k != "file") {
            return None;
        }
        self.download_url.as_ref()?;
        let stem = self.name.strip_suffix(&format!(".{}", extension))?;
        let stem = stem.to_lowercase();
        is_bare_name(&stem).then_some(stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_names() {
        assert!(is_bare_name("weather"));
        assert!(is_bare_name("Ai_Ask-2"));
        assert!(!is_bare_name("weather.py"));
        assert!(!is_bare_name("a/b"));
        assert!(!is_bare_name(""));
        assert!(!is_bare_name("two words"));
        assert!(!is_bare_name("foo#x"));
        assert!(!is_bare_name("foo?raw=1"));
        assert!(!is_bare_name("foo%2e"));
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(ModuleReference::parse("Weather"), ModuleReference::Name("Weather".into()));
        assert_eq!(
            ModuleReference::parse("https://example.com/x.py"),
            ModuleReference::Url("https://example.com/x.py".into())
        );
        assert_eq!(ModuleReference::parse("x.py"), ModuleReference::Url("x.py".into()));
    }

    #[test]
    fn test_derive_module_name() {
        assert_eq!(derive_module_name("https://host/a/b/Weather.py").as_deref(), Some("weather"));
        assert_eq!(derive_module_name("https://host/a/tool.min.py?raw=1").as_deref(), Some("tool"));
        assert_eq!(derive_module_name("notes.py").as_deref(), Some("notes"));
        assert_eq!(derive_module_name("https://host/a/"), None);
        assert_eq!(derive_module_name("https://host/.hidden"), None);
    }

    #[test]
    fn test_registry_entry_filtering() {
        let file = RegistryEntry::new("Weather.py", "https://raw/weather.py");
        assert_eq!(file.module_name("py").as_deref(), Some("weather"));

        let readme = RegistryEntry::new("README.md", "https://raw/README.md");
        assert_eq!(readme.module_name("py"), None);

        let dir: RegistryEntry =
            serde_json::from_str(r#"{"name":"utils.py","download_url":null,"type":"dir"}"#).unwrap();
        assert_eq!(dir.module_name("py"), None);
    }
}
