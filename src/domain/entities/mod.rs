//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod message;
pub mod command;
pub mod module;

pub use user::User;
pub use message::{Message, MessageType, Content, Attachment};
pub use command::{Command, CommandFuture, CommandHandler, CommandRegistry};
pub use module::{ModuleReference, ModuleSource, ResolvedModule, RegistryEntry};
