//! Domain layer - Core business objects and abstractions
//! 
//! This layer contains:
//! - Entities: Core business objects (Module references, Message, Command)
//! - Traits: Abstractions for infrastructure (Fetcher, ModuleStore, Host, Bot)

pub mod entities;
pub mod traits;
