//! State machine for the vehicle passport ledger.
//!
//! This crate owns all ledger state and enforces who may change it:
//!
//! - Identity directory of workshops with a permanent admin
//! - Passport store with append-only service histories
//! - Authorization guard for every mutating operation
//! - Event emission with gap-free sequence numbers
//! - Optimistic versioning of the registry and each passport
//! - Snapshot creation and verified restoration

#![deny(unsafe_code)]

mod events;
pub mod guard;
mod ledger;
mod passport;
mod registry;
mod snapshot;

pub use events::{EventLog, EventSink, TracingSink};
pub use ledger::{Ledger, Receipt};
pub use passport::verify_history;
pub use registry::Registry;
pub use snapshot::{LedgerSnapshot, SNAPSHOT_FORMAT_VERSION};
