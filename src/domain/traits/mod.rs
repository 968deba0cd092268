//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod fetcher;
pub mod host;
pub mod store;

pub use bot::{Bot, BotInfo};
pub use fetcher::Fetcher;
pub use host::{Host, RemoveHook};
pub use store::ModuleStore;
