//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Permission denied")]
    PermissionDenied,
}

/// Network retrieval errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to read body: {0}")]
    Body(String),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid module name: {0}")]
    InvalidName(String),
}

/// Module lifecycle errors. `Display` is the status line shown to the user.
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Unable to fetch module from {url}: {source}")]
    NetworkFailure {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Module {0} is not found")]
    NotFound(String),

    #[error("Module {0} is not found or is a built-in module")]
    NotInstalled(String),

    #[error("Invalid module reference: {0}")]
    InvalidReference(String),

    #[error("Module {0} is a built-in module and cannot be replaced")]
    BuiltIn(String),

    #[error("Failed to fetch module list: {0}")]
    RegistryUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines() {
        assert_eq!(ModuleError::NotFound("weather".into()).to_string(), "Module weather is not found");
        assert_eq!(
            ModuleError::NotInstalled("help".into()).to_string(),
            "Module help is not found or is a built-in module"
        );
        let err = ModuleError::NetworkFailure {
            url: "https://x/y.py".into(),
            source: FetchError::Status(500),
        };
        assert_eq!(err.to_string(), "Unable to fetch module from https://x/y.py: HTTP status 500");
    }
}
