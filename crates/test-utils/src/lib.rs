//! Shared test utilities for the passport ledger crates.
//!
//! - [`TestDir`]: scratch directory for state, config, and script files
//! - [`LedgerFixture`]: ledger with an admin, an active workshop, and one passport
//! - [`strategies`]: proptest generators for addresses, VINs, and interventions

#![deny(unsafe_code)]

mod test_dir;
pub use test_dir::TestDir;

mod fixtures;
pub use fixtures::{ADMIN, LedgerFixture, OWNER, WORKSHOP, addr, caller, service, vehicle};

pub mod strategies;
