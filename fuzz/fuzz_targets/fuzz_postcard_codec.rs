//! Fuzz target for postcard codec roundtrip.
//!
//! Arbitrary bytes fed to `decode` for ledger types must never panic, and
//! successfully decoded values must roundtrip.

#![no_main]

use libfuzzer_sys::fuzz_target;

use passport_ledger_types::codec::{decode, encode};
use passport_ledger_types::{
    EventEntry, LedgerEvent, ObjectRef, PassportView, ServiceIntervention, VehiclePassport,
    WorkshopIdentity,
};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };

    match selector % 7 {
        0 => try_roundtrip::<WorkshopIdentity>(payload),
        1 => try_roundtrip::<ServiceIntervention>(payload),
        2 => try_roundtrip::<VehiclePassport>(payload),
        3 => try_roundtrip::<PassportView>(payload),
        4 => try_roundtrip::<ObjectRef>(payload),
        5 => try_roundtrip::<LedgerEvent>(payload),
        _ => try_roundtrip::<EventEntry>(payload),
    }
});

/// Decodes `data` as `T`; on success, re-encodes and checks the value survives.
fn try_roundtrip<T>(data: &[u8])
where
    T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    if let Ok(value) = decode::<T>(data) {
        let re_encoded = encode(&value);
        assert!(re_encoded.is_ok(), "encode failed after successful decode");

        let re_decoded = decode::<T>(&re_encoded.expect("already checked"));
        assert!(re_decoded.is_ok(), "re-decode failed after successful encode");
        assert_eq!(value, re_decoded.expect("already checked"), "roundtrip mismatch");
    }
}
