//! Proptest strategies for passport ledger domain types.
//!
//! Strategies produce values that pass field validation under the default
//! [`FieldLimits`](passport_ledger_types::config::FieldLimits), so properties
//! exercise the ledger's invariants rather than its size checks.
//!
//! # Usage
//!
//! ```no_run
//! use passport_ledger_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(deltas in strategies::arb_odometer_deltas()) {
//!         // drive a passport with the generated readings
//!     }
//! }
//! ```

use passport_ledger_types::{Address, NewIntervention};
use proptest::prelude::*;

/// Generates a valid [`Address`] with 1-40 lowercase hex digits.
pub fn arb_address() -> impl Strategy<Value = Address> {
    "[0-9a-f]{1,40}".prop_filter_map("valid address", |digits| {
        Address::parse(&format!("0x{digits}")).ok()
    })
}

/// Generates a 17-character VIN from the ISO 3779 alphabet (no `I`, `O`, `Q`).
pub fn arb_vin() -> impl Strategy<Value = String> {
    "[A-HJ-NPR-Z0-9]{17}"
}

/// Generates 1-30 odometer increments of 0-50,000 km.
///
/// Zero increments are included on purpose: equal readings are allowed.
pub fn arb_odometer_deltas() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(prop_oneof![Just(0u64), 1u64..50_000], 1..30)
}

/// Generates a work type label.
pub fn arb_work_type() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "oil_change".to_string(),
        "brake_service".to_string(),
        "tyre_rotation".to_string(),
        "inspection".to_string(),
        "timing_belt".to_string(),
    ])
}

/// Generates a positive Unix timestamp in milliseconds (2001-2033).
pub fn arb_recorded_at_ms() -> impl Strategy<Value = i64> {
    1_000_000_000_000i64..2_000_000_000_000
}

/// Generates a [`NewIntervention`] at `odometer_km` with valid evidence fields.
pub fn arb_intervention(odometer_km: u64) -> impl Strategy<Value = NewIntervention> {
    (arb_work_type(), "[0-9a-f]{64}", "[a-z0-9]{8,46}", "[A-Za-z0-9]{16,88}", arb_recorded_at_ms())
        .prop_map(move |(work_type, notes_hash, cid, signature, recorded_at_ms)| {
            NewIntervention::builder()
                .odometer_km(odometer_km)
                .work_type(work_type)
                .notes_hash(notes_hash)
                .evidence_uri(format!("ipfs://{cid}"))
                .workshop_signature(signature)
                .recorded_at_ms(recorded_at_ms)
                .build()
        })
}
