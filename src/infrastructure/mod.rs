//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Http / Registry: Network retrieval of modules and the registry listing
//! - Hashing: Content digests
//! - Storage: The module directory
//! - Catalog: Installed-module registry built from the store
//! - Host: Restart signalling and post-remove cleanup
//! - Adapters: Platform integrations (console)

pub mod config;
pub mod http;
pub mod registry;
pub mod hashing;
pub mod storage;
pub mod catalog;
pub mod host;
pub mod adapters;
