//! Message handling - turning raw input into messages

pub mod parser;

pub use parser::MessageParser;
