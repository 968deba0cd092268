//! Application services - Business logic orchestration

pub mod command_service;
pub mod lifecycle;
pub mod loader_commands;
pub mod locks;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use command_service::CommandService;
pub use lifecycle::{
    HashOutcome, InstallAllOutcome, InstallOutcome, ModuleManager, RemoveOutcome, UpdateAllOutcome,
};
pub use loader_commands::register_loader_commands;
pub use resolver::{ReferenceResolver, Resolution};
