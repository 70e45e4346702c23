//! Operator CLI for the vehicle passport ledger.
//!
//! Stands in for deployment tooling and the authenticated-sender provider
//! during local use: bootstraps a state file, applies scripted operations
//! submitted as named callers, and inspects the persisted state.

pub mod commands;
pub mod config;
pub mod error;
pub mod script;

pub use error::CliError;
