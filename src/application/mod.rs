//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Reference resolution, module lifecycle, command handling
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing

pub mod errors;
pub mod services;
pub mod messaging;
