//! modkeeper - module manager for chat bots
//!
//! Resolves module references (bare names, URLs, uploaded files), stores
//! module files in a flat directory, reports content digests, and keeps the
//! installed set in sync with a remote registry. The host is asked to restart
//! whenever the installed set changes.

pub mod domain;
pub mod application;
pub mod infrastructure;
