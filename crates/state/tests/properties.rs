//! Property tests for the per-passport invariants.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use passport_ledger_state::verify_history;
use passport_ledger_test_utils::{LedgerFixture, WORKSHOP, caller, strategies};
use passport_ledger_types::LedgerError;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Monotonic readings always commit, with seqs `1..=N` and the watermark
    /// at the last reading.
    #[test]
    fn monotonic_readings_build_contiguous_history(deltas in strategies::arb_odometer_deltas()) {
        let fixture = LedgerFixture::new();
        let mut km = 0u64;
        for delta in &deltas {
            km += delta;
            fixture.record(km).unwrap();
        }

        let passport = fixture.ledger.passport(fixture.passport).unwrap().passport;
        let seqs: Vec<_> = passport.interventions.iter().map(|i| i.seq).collect();
        prop_assert_eq!(seqs, (1..=deltas.len() as u64).collect::<Vec<_>>());
        prop_assert_eq!(passport.latest_odometer_km, km);
        prop_assert!(passport.interventions.windows(2).all(|w| w[0].odometer_km <= w[1].odometer_km));
        prop_assert!(verify_history(&passport).is_ok());
    }

    /// Any reading below the watermark fails with `OdometerRollback` and
    /// changes nothing.
    #[test]
    fn readings_below_watermark_always_fail(
        watermark in 1u64..1_000_000,
        below in 1u64..1_000_000,
    ) {
        let fixture = LedgerFixture::new();
        fixture.record(watermark).unwrap();
        let before = fixture.ledger.passport(fixture.passport).unwrap();
        let attempted = watermark.saturating_sub(below);

        let err = fixture.record(attempted).unwrap_err();
        let is_rollback = matches!(err, LedgerError::OdometerRollback { .. });
        prop_assert!(is_rollback);
        prop_assert_eq!(fixture.ledger.passport(fixture.passport).unwrap(), before);
    }

    /// Arbitrary unregistered callers can never record.
    #[test]
    fn unregistered_callers_never_record(
        who in strategies::arb_address(),
        input in strategies::arb_intervention(10),
    ) {
        prop_assume!(who.as_str() != WORKSHOP);
        let fixture = LedgerFixture::new();
        let result = fixture.ledger.record_intervention(
            &passport_ledger_types::AuthenticatedCaller::new(who),
            fixture.passport_ref(),
            input,
        );
        let rejected = matches!(result, Err(LedgerError::WorkshopNotActive { .. }));
        prop_assert!(rejected);
        prop_assert_eq!(fixture.ledger.intervention_count(fixture.passport).unwrap(), 0);
    }

    /// Generated interventions commit as-is, with the caller as workshop.
    #[test]
    fn generated_interventions_commit(input in strategies::arb_intervention(42)) {
        let fixture = LedgerFixture::new();
        let expected = input.clone();
        fixture
            .ledger
            .record_intervention(&caller(WORKSHOP), fixture.passport_ref(), input)
            .unwrap();
        let stored = fixture.ledger.intervention(fixture.passport, 1).unwrap();
        prop_assert_eq!(stored.workshop.as_str(), WORKSHOP);
        prop_assert_eq!(stored.notes_hash, expected.notes_hash);
        prop_assert_eq!(stored.evidence_uri, expected.evidence_uri);
        prop_assert_eq!(stored.recorded_at_ms, expected.recorded_at_ms);
    }
}
