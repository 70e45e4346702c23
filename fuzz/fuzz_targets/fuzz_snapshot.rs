//! Fuzz target for snapshot loading.
//!
//! Any byte string must either fail to load or produce a ledger whose own
//! snapshot verifies and reloads identically. A restored ledger must also
//! take one more mutation, committing it or rejecting it, without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;

use passport_ledger_state::{Ledger, LedgerSnapshot};
use passport_ledger_types::{Address, AuthenticatedCaller, config::LedgerConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = LedgerSnapshot::from_bytes(data) else {
        return;
    };
    let Ok(ledger) = Ledger::restore(snapshot, LedgerConfig::default(), Vec::new()) else {
        return;
    };

    let again = ledger.snapshot();
    assert!(again.verify().is_ok(), "restored ledger produced an invalid snapshot");

    let bytes = again.to_bytes().expect("encode restored snapshot");
    let reloaded = LedgerSnapshot::from_bytes(&bytes).expect("decode restored snapshot");
    assert_eq!(reloaded.passports, again.passports);
    assert_eq!(reloaded.next_event_sequence, again.next_event_sequence);

    let workshop = Address::parse("0xf022").expect("valid address");
    let caller = AuthenticatedCaller::new(workshop.clone());
    let version = ledger.registry_version();
    let next_event = ledger.next_event_sequence();
    match ledger.register_workshop(&caller, version, &workshop, "did:fuzz", "z") {
        Ok(receipt) => {
            assert_eq!(receipt.event.sequence, next_event);
            assert_eq!(ledger.next_event_sequence(), next_event + 1);
        },
        Err(_) => {
            assert_eq!(ledger.registry_version(), version);
            assert_eq!(ledger.next_event_sequence(), next_event);
        },
    }
    assert!(ledger.snapshot().verify().is_ok(), "mutated ledger produced an invalid snapshot");
});
