//! Registration and minting policies.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What to do when an address registers as a workshop a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateWorkshopPolicy {
    /// Append another entry. Status changes and lookups keep using the first
    /// entry for the address; `workshop_count` includes every entry.
    #[default]
    Allow,
    /// Fail with `WorkshopAlreadyRegistered`.
    Reject,
}

/// Workshop registration rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RegistrationPolicy {
    /// Handling of repeated self-registration. Default: `allow`.
    #[serde(default)]
    pub duplicate_workshops: DuplicateWorkshopPolicy,
}

/// Passport minting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct MintPolicy {
    /// Fail with `DuplicateVin` when a passport already exists for the VIN.
    ///
    /// Off by default: VIN deduplication normally belongs to an external index.
    #[serde(default)]
    pub reject_duplicate_vins: bool,
}
