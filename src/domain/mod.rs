//! Core domain types and logic.

pub mod error;
pub mod journal;
pub mod ledger;
pub mod projection;
pub mod record;
pub mod settings;
