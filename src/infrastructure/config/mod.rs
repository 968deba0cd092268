//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub modules: ModulesConfig,
    pub registry: RegistryConfig,
    pub fetch: FetchConfig,
    pub whitelist: WhitelistConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModulesConfig {
    /// Directory holding one `<name>.<extension>` file per installed module
    pub directory: PathBuf,
    pub extension: String,
    /// Modules shipped with the host; never installed over or removed
    #[serde(default)]
    pub builtin: Vec<String>,
    /// Restart after an update that changed module content
    #[serde(default = "default_true")]
    pub restart_on_update: bool,
    #[serde(default)]
    pub companions: Vec<CompanionConfig>,
}

/// A module that drags an external dependency tree along with it
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompanionConfig {
    pub name: String,
    pub directory: PathBuf,
    /// Program and arguments run inside `directory` before it is deleted
    #[serde(default)]
    pub uninstall_command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    pub org: String,
    pub repo: String,
    pub branch: String,
    pub raw_base: String,
    pub api_base: String,
}

impl RegistryConfig {
    /// Prefix every canonical module URL starts with, trailing slash included
    pub fn raw_prefix(&self) -> String {
        format!(
            "{}/{}/{}/{}/",
            self.raw_base.trim_end_matches('/'),
            self.org,
            self.repo,
            self.branch
        )
    }

    /// Canonical download URL of a module file
    pub fn module_url(&self, name: &str, extension: &str) -> String {
        format!("{}{}.{}", self.raw_prefix(), name, extension)
    }

    /// Directory listing endpoint of the registry repository
    pub fn listing_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/",
            self.api_base.trim_end_matches('/'),
            self.org,
            self.repo
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Whitelist configuration for user access control
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WhitelistConfig {
    pub enabled: bool,
    pub users: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "modkeeper".to_string(),
                prefix: "/".to_string(),
            },
            modules: ModulesConfig {
                directory: PathBuf::from("modules/custom_modules"),
                extension: "py".to_string(),
                builtin: vec!["loader".to_string(), "help".to_string()],
                restart_on_update: true,
                companions: vec![CompanionConfig {
                    name: "musicbot".to_string(),
                    directory: PathBuf::from("musicbot"),
                    uninstall_command: vec![
                        "python3".to_string(),
                        "-m".to_string(),
                        "pip".to_string(),
                        "uninstall".to_string(),
                        "-y".to_string(),
                        "-r".to_string(),
                        "requirements.txt".to_string(),
                    ],
                }],
            },
            registry: RegistryConfig {
                org: "The-MoonTg-project".to_string(),
                repo: "custom_modules".to_string(),
                branch: "main".to_string(),
                raw_base: "https://raw.githubusercontent.com".to_string(),
                api_base: "https://api.github.com".to_string(),
            },
            fetch: FetchConfig {
                timeout_secs: 30,
                user_agent: format!("modkeeper/{}", env!("CARGO_PKG_VERSION")),
            },
            whitelist: WhitelistConfig {
                enabled: false,
                users: Vec::new(),
            },
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(dir) = std::env::var("MODKEEPER_MODULES_DIR") {
            config.modules.directory = PathBuf::from(dir);
        }

        if let Ok(prefix) = std::env::var("MODKEEPER_PREFIX") {
            config.bot.prefix = prefix;
        }

        if let Ok(org) = std::env::var("MODKEEPER_ORG") {
            config.registry.org = org;
        }

        config
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.modules.extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(ConfigError::InvalidValue(format!("modules.extension: {:?}", ext)));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("fetch.timeout-secs must be positive".to_string()));
        }
        Ok(())
    }
}
