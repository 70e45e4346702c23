//! Concurrent access to a shared ledger.
//!
//! Operations on different passports run in parallel; operations on one
//! passport serialize. Under contention the optimistic version check turns
//! lost updates into `VersionConflict`, which callers resolve by re-reading.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::{sync::Arc, thread};

use passport_ledger_state::{EventLog, EventSink, Ledger};
use passport_ledger_test_utils::{ADMIN, WORKSHOP, addr, caller, service, vehicle};
use passport_ledger_types::{LedgerError, PassportId, config::EventLogConfig};

const THREADS: u64 = 8;
const RECORDS_PER_THREAD: u64 = 25;

fn ledger_with_workshop() -> Ledger {
    let ledger = Ledger::builder().admin(caller(ADMIN)).build().unwrap();
    let aa = caller(WORKSHOP);
    ledger.register_workshop(&aa, ledger.registry_version(), aa.address(), "did", "key").unwrap();
    ledger
}

/// Retries `op` with a fresh version until it stops conflicting.
fn with_retry<T>(mut op: impl FnMut() -> Result<T, LedgerError>) -> Result<T, LedgerError> {
    loop {
        match op() {
            Err(LedgerError::VersionConflict { .. }) => continue,
            other => return other,
        }
    }
}

#[test]
fn parallel_mints_get_distinct_ids() {
    let ledger = Arc::new(ledger_with_workshop());

    thread::scope(|scope| {
        for t in 0..THREADS {
            let ledger = Arc::clone(&ledger);
            scope.spawn(move || {
                let owner = caller(&format!("0xb{t}"));
                with_retry(|| {
                    ledger.mint_passport(
                        &owner,
                        ledger.registry_version(),
                        vehicle(owner.address()),
                    )
                })
                .unwrap();
            });
        }
    });

    assert_eq!(ledger.passport_count(), THREADS);
    for id in 1..=THREADS {
        assert!(ledger.passport(PassportId::new(id)).is_some());
    }
}

#[test]
fn parallel_recording_on_separate_passports() {
    let ledger = Arc::new(ledger_with_workshop());
    let ids: Vec<_> = (0..THREADS)
        .map(|t| {
            let owner = caller(&format!("0xb{t}"));
            let receipt = ledger
                .mint_passport(&owner, ledger.registry_version(), vehicle(owner.address()))
                .unwrap();
            receipt.passport.unwrap()
        })
        .collect();

    thread::scope(|scope| {
        for start in &ids {
            let ledger = Arc::clone(&ledger);
            let mut target = *start;
            scope.spawn(move || {
                for km in 1..=RECORDS_PER_THREAD {
                    let receipt = ledger
                        .record_intervention(&caller(WORKSHOP), target, service(km * 100))
                        .unwrap();
                    target = receipt.passport.unwrap();
                }
            });
        }
    });

    for target in &ids {
        let view = ledger.passport(target.id).unwrap();
        assert_eq!(view.passport.intervention_count(), RECORDS_PER_THREAD);
        assert_eq!(view.passport.latest_odometer_km, RECORDS_PER_THREAD * 100);
        passport_ledger_state::verify_history(&view.passport).unwrap();
    }
}

#[test]
fn contended_passport_serializes_and_keeps_invariants() {
    let log = Arc::new(EventLog::new(EventLogConfig { capacity: 10_000 }));
    let ledger = Ledger::builder()
        .admin(caller(ADMIN))
        .sinks(vec![log.clone() as Arc<dyn EventSink>])
        .build()
        .unwrap();
    let workshops: Vec<_> = (0..THREADS).map(|t| caller(&format!("0xa{t}"))).collect();
    for w in &workshops {
        ledger.register_workshop(w, ledger.registry_version(), w.address(), "did", "key").unwrap();
    }
    let owner = caller("0xbb");
    let passport = ledger
        .mint_passport(&owner, ledger.registry_version(), vehicle(owner.address()))
        .unwrap()
        .passport
        .unwrap()
        .id;

    thread::scope(|scope| {
        for w in &workshops {
            let ledger = &ledger;
            scope.spawn(move || {
                for _ in 0..RECORDS_PER_THREAD {
                    let result = with_retry(|| {
                        let view = ledger.passport(passport).unwrap();
                        let km = view.passport.latest_odometer_km + 1;
                        ledger.record_intervention(w, view.object_ref(), service(km))
                    });
                    result.unwrap();
                }
            });
        }
    });

    let view = ledger.passport(passport).unwrap();
    let total = THREADS * RECORDS_PER_THREAD;
    assert_eq!(view.passport.intervention_count(), total);
    assert_eq!(view.passport.latest_odometer_km, total);
    passport_ledger_state::verify_history(&view.passport).unwrap();

    // Every committed operation produced exactly one event, in sequence order.
    let events = log.since(0);
    let expected = 1 + THREADS + 1 + total;
    assert_eq!(events.len() as u64, expected);
    for (i, entry) in events.iter().enumerate() {
        assert_eq!(entry.sequence, i as u64 + 1);
    }
}

#[test]
fn transfer_and_record_on_one_passport_serialize() {
    let ledger = ledger_with_workshop();
    let owner = caller("0xbb");
    let passport = ledger
        .mint_passport(&owner, ledger.registry_version(), vehicle(owner.address()))
        .unwrap()
        .passport
        .unwrap()
        .id;

    thread::scope(|scope| {
        let ledger = &ledger;
        scope.spawn(move || {
            for km in 1..=RECORDS_PER_THREAD {
                with_retry(|| {
                    let view = ledger.passport(passport).unwrap();
                    ledger.record_intervention(&caller(WORKSHOP), view.object_ref(), service(km))
                })
                .unwrap();
            }
        });
        scope.spawn(move || {
            let holders = ["0xbb", "0xcc"];
            for i in 0..RECORDS_PER_THREAD as usize {
                let from = caller(holders[i % 2]);
                let to = addr(holders[(i + 1) % 2]);
                with_retry(|| {
                    let view = ledger.passport(passport).unwrap();
                    ledger.transfer_passport(&from, view.object_ref(), &to)
                })
                .unwrap();
            }
        });
    });

    let view = ledger.passport(passport).unwrap();
    assert_eq!(view.passport.intervention_count(), RECORDS_PER_THREAD);
    // An odd number of alternating transfers ends with the second holder.
    assert_eq!(view.passport.owner, addr("0xcc"));
    assert_eq!(view.version.value(), 1 + 2 * RECORDS_PER_THREAD);
}
