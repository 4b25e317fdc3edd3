//! Port traits the core consumes.

pub mod config_port;
pub mod export_port;
pub mod journal_store;
