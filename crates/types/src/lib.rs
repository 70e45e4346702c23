//! Core types, errors, events, and configuration for the vehicle passport ledger.
//!
//! This crate provides the foundational types used throughout the ledger:
//! - Identifier newtypes (PassportId, Version) and validated addresses
//! - Directory and passport records, plus operation inputs
//! - Events published for every committed transition
//! - Field size validation and ledger configuration
//! - Error types using snafu
//! - The postcard codec used for snapshots

pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use codec::{CodecError, decode, encode};
pub use error::{ErrorCode, LedgerError, Result};
pub use events::{EventAction, EventEntry, EventScope, LedgerEvent};
pub use types::*;
pub use validation::ValidationError;
