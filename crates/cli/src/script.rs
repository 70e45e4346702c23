//! Scripted ledger operations.
//!
//! A script is a JSON array of operations, each naming the caller it is
//! submitted as:
//!
//! ```json
//! [
//!   { "op": "register_workshop", "caller": "0xaa", "did": "did:web:aa", "public_key_multibase": "z6Mk" },
//!   { "op": "mint_passport", "caller": "0xbb", "vin": "VIN123", "make": "Acme", "model": "Z1", "year": 2020 },
//!   { "op": "record_intervention", "caller": "0xaa", "passport_id": 1, "odometer_km": 1000,
//!     "work_type": "oil_change", "notes_hash": "0x01", "evidence_uri": "ipfs://x",
//!     "workshop_signature": "0x02", "recorded_at_ms": 1700000000000 },
//!   { "op": "transfer_passport", "caller": "0xbb", "passport_id": 1, "to": "0xcc" }
//! ]
//! ```
//!
//! `version` may be given on any operation. When omitted, the current
//! version is read immediately before submission.

use std::io::Write;

use passport_ledger_state::{Ledger, Receipt};
use passport_ledger_types::{
    Address, AuthenticatedCaller, LedgerError, NewIntervention, NewPassport, ObjectRef,
    PassportId, Version,
};
use serde::Deserialize;
use snafu::ResultExt;

use crate::error::{CliError, OperationSnafu, OutputSnafu, SerializeSnafu};

/// One scripted operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ScriptOp {
    /// Registers a workshop in the directory.
    RegisterWorkshop {
        /// Submitting address.
        caller: Address,
        /// Address to register; defaults to the caller.
        #[serde(default)]
        workshop: Option<Address>,
        /// Workshop DID.
        did: String,
        /// Multibase public key.
        public_key_multibase: String,
        /// Registry version to present.
        #[serde(default)]
        version: Option<Version>,
    },
    /// Activates or deactivates a workshop.
    SetWorkshopStatus {
        /// Submitting address (the admin).
        caller: Address,
        /// Workshop to update.
        workshop: Address,
        /// New status.
        active: bool,
        /// Registry version to present.
        #[serde(default)]
        version: Option<Version>,
    },
    /// Mints a passport.
    MintPassport {
        /// Submitting address.
        caller: Address,
        /// Vehicle identification number.
        vin: String,
        /// Manufacturer.
        make: String,
        /// Model name.
        model: String,
        /// Model year.
        year: i32,
        /// Declared owner; defaults to the caller.
        #[serde(default)]
        owner: Option<Address>,
        /// Registry version to present.
        #[serde(default)]
        version: Option<Version>,
    },
    /// Appends a service intervention.
    RecordIntervention {
        /// Submitting workshop.
        caller: Address,
        /// Target passport.
        passport_id: PassportId,
        /// Odometer reading in kilometres.
        odometer_km: u64,
        /// Kind of work.
        work_type: String,
        /// Evidence hash.
        notes_hash: String,
        /// Evidence location.
        evidence_uri: String,
        /// Workshop signature.
        workshop_signature: String,
        /// Milliseconds since the Unix epoch.
        recorded_at_ms: i64,
        /// Passport version to present.
        #[serde(default)]
        version: Option<Version>,
    },
    /// Transfers a passport to a new holder.
    TransferPassport {
        /// Submitting holder.
        caller: Address,
        /// Passport to transfer.
        passport_id: PassportId,
        /// New holder.
        to: Address,
        /// Passport version to present.
        #[serde(default)]
        version: Option<Version>,
    },
}

impl ScriptOp {
    /// Operation name as written in scripts.
    pub fn name(&self) -> &'static str {
        match self {
            ScriptOp::RegisterWorkshop { .. } => "register_workshop",
            ScriptOp::SetWorkshopStatus { .. } => "set_workshop_status",
            ScriptOp::MintPassport { .. } => "mint_passport",
            ScriptOp::RecordIntervention { .. } => "record_intervention",
            ScriptOp::TransferPassport { .. } => "transfer_passport",
        }
    }

    /// Submits the operation to `ledger`.
    ///
    /// # Errors
    ///
    /// Returns whatever the ledger rejects the operation with.
    pub fn submit(self, ledger: &Ledger) -> Result<Receipt, LedgerError> {
        match self {
            ScriptOp::RegisterWorkshop { caller, workshop, did, public_key_multibase, version } => {
                let workshop = workshop.unwrap_or_else(|| caller.clone());
                let version = version.unwrap_or_else(|| ledger.registry_version());
                ledger.register_workshop(
                    &AuthenticatedCaller::new(caller),
                    version,
                    &workshop,
                    &did,
                    &public_key_multibase,
                )
            },
            ScriptOp::SetWorkshopStatus { caller, workshop, active, version } => {
                let version = version.unwrap_or_else(|| ledger.registry_version());
                ledger.set_workshop_status(
                    &AuthenticatedCaller::new(caller),
                    version,
                    &workshop,
                    active,
                )
            },
            ScriptOp::MintPassport { caller, vin, make, model, year, owner, version } => {
                let input = NewPassport::builder()
                    .vin(vin)
                    .make(make)
                    .model(model)
                    .year(year)
                    .owner(owner.unwrap_or_else(|| caller.clone()))
                    .build();
                let version = version.unwrap_or_else(|| ledger.registry_version());
                ledger.mint_passport(&AuthenticatedCaller::new(caller), version, input)
            },
            ScriptOp::RecordIntervention {
                caller,
                passport_id,
                odometer_km,
                work_type,
                notes_hash,
                evidence_uri,
                workshop_signature,
                recorded_at_ms,
                version,
            } => {
                let target = passport_ref(ledger, passport_id, version)?;
                let input = NewIntervention::builder()
                    .odometer_km(odometer_km)
                    .work_type(work_type)
                    .notes_hash(notes_hash)
                    .evidence_uri(evidence_uri)
                    .workshop_signature(workshop_signature)
                    .recorded_at_ms(recorded_at_ms)
                    .build();
                ledger.record_intervention(&AuthenticatedCaller::new(caller), target, input)
            },
            ScriptOp::TransferPassport { caller, passport_id, to, version } => {
                let target = passport_ref(ledger, passport_id, version)?;
                ledger.transfer_passport(&AuthenticatedCaller::new(caller), target, &to)
            },
        }
    }
}

fn passport_ref(
    ledger: &Ledger,
    id: PassportId,
    version: Option<Version>,
) -> Result<ObjectRef, LedgerError> {
    if let Some(version) = version {
        return Ok(ObjectRef::new(id, version));
    }
    ledger
        .passport(id)
        .map(|view| view.object_ref())
        .ok_or(LedgerError::PassportNotFound { passport_id: id })
}

/// Parses a script document.
///
/// # Errors
///
/// Returns the JSON error for malformed documents or unknown operations.
pub fn parse_script(source: &str) -> Result<Vec<ScriptOp>, serde_json::Error> {
    serde_json::from_str(source)
}

/// Result of applying a script.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    /// Operations that committed.
    pub committed: usize,
    /// Operations that were rejected (only non-zero with `continue_on_error`).
    pub failures: Vec<CliError>,
}

/// Applies `ops` in order, writing each emitted event to `out` as one JSON line.
///
/// Every operation is atomic on its own. Without `continue_on_error`, the
/// first rejection stops the script and is returned as the error; operations
/// before it stay committed.
///
/// # Errors
///
/// Returns [`CliError::Operation`] for the first rejection (unless
/// `continue_on_error`) and [`CliError::Output`] if `out` fails.
pub fn apply(
    ledger: &Ledger,
    ops: Vec<ScriptOp>,
    continue_on_error: bool,
    out: &mut impl Write,
) -> Result<ApplyOutcome, CliError> {
    let mut outcome = ApplyOutcome::default();
    for (position, op) in ops.into_iter().enumerate() {
        let index = position + 1;
        let name = op.name();
        match op.submit(ledger).context(OperationSnafu { index, op: name }) {
            Ok(receipt) => {
                let line = serde_json::to_string(&receipt.event).context(SerializeSnafu)?;
                writeln!(out, "{line}").context(OutputSnafu)?;
                outcome.committed += 1;
            },
            Err(err) if continue_on_error => {
                tracing::warn!(index, op = name, error = %err, "operation rejected");
                outcome.failures.push(err);
            },
            Err(err) => return Err(err),
        }
    }
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use passport_ledger_test_utils::{ADMIN, LedgerFixture, OWNER, WORKSHOP, addr, caller};
    use passport_ledger_types::{ErrorCode, EventEntry, LedgerEvent};

    use super::*;

    fn events(out: &[u8]) -> Vec<EventEntry> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_script_defaults_optional_fields() {
        let ops = parse_script(
            r#"[
                {"op": "register_workshop", "caller": "0xAA", "did": "d", "public_key_multibase": "k"},
                {"op": "transfer_passport", "caller": "0xbb", "passport_id": 1, "to": "0xcc", "version": 4}
            ]"#,
        )
        .unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(
            ops[0],
            ScriptOp::RegisterWorkshop {
                caller: addr("0xaa"),
                workshop: None,
                did: "d".to_string(),
                public_key_multibase: "k".to_string(),
                version: None,
            }
        );
        assert_eq!(ops[1].name(), "transfer_passport");
    }

    #[test]
    fn test_parse_script_rejects_unknown_op_and_fields() {
        assert!(parse_script(r#"[{"op": "burn_passport", "caller": "0xbb"}]"#).is_err());
        assert!(
            parse_script(
                r#"[{"op": "set_workshop_status", "caller": "0xad", "workshop": "0xaa", "active": true, "extra": 1}]"#
            )
            .is_err()
        );
        assert!(parse_script(r#"[{"op": "set_workshop_status", "caller": "ad"}]"#).is_err());
    }

    #[test]
    fn test_apply_full_lifecycle_prints_events() {
        let ledger = Ledger::builder().admin(caller(ADMIN)).build().unwrap();
        let ops = parse_script(
            r#"[
                {"op": "register_workshop", "caller": "0xaa", "did": "did:web:aa", "public_key_multibase": "z6Mk"},
                {"op": "mint_passport", "caller": "0xbb", "vin": "VIN123", "make": "Acme", "model": "Z1", "year": 2020},
                {"op": "record_intervention", "caller": "0xaa", "passport_id": 1, "odometer_km": 1000,
                 "work_type": "oil_change", "notes_hash": "0x01", "evidence_uri": "ipfs://x",
                 "workshop_signature": "0x02", "recorded_at_ms": 1700000000000},
                {"op": "transfer_passport", "caller": "0xbb", "passport_id": 1, "to": "0xcc"}
            ]"#,
        )
        .unwrap();

        let mut out = Vec::new();
        let outcome = apply(&ledger, ops, false, &mut out).unwrap();
        assert_eq!(outcome.committed, 4);
        assert!(outcome.failures.is_empty());

        let printed = events(&out);
        let sequences: Vec<_> = printed.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![2, 3, 4, 5]);
        assert!(matches!(
            printed[2].event,
            LedgerEvent::InterventionRecorded { seq: 1, odometer_km: 1000, .. }
        ));

        let view = ledger.passport(PassportId::new(1)).unwrap();
        assert_eq!(view.passport.owner, addr("0xcc"));
        assert_eq!(view.version, Version::new(3));
    }

    #[test]
    fn test_apply_stops_at_first_rejection() {
        let fixture = LedgerFixture::new();
        let ops = vec![
            ScriptOp::SetWorkshopStatus {
                caller: addr(OWNER),
                workshop: addr(WORKSHOP),
                active: false,
                version: None,
            },
            ScriptOp::TransferPassport {
                caller: addr(OWNER),
                passport_id: fixture.passport,
                to: addr("0xcc"),
                version: None,
            },
        ];

        let mut out = Vec::new();
        let err = apply(&fixture.ledger, ops, false, &mut out).unwrap_err();
        assert!(matches!(err, CliError::Operation { index: 1, op: "set_workshop_status", .. }));
        assert_eq!(err.code(), Some(ErrorCode::AuthNotAdmin));
        assert!(out.is_empty());
        assert_eq!(fixture.ledger.passport(fixture.passport).unwrap().passport.owner, addr(OWNER));
    }

    #[test]
    fn test_apply_continue_on_error_collects_failures() {
        let fixture = LedgerFixture::new();
        let record = |odometer_km| ScriptOp::RecordIntervention {
            caller: addr(WORKSHOP),
            passport_id: fixture.passport,
            odometer_km,
            work_type: "inspection".to_string(),
            notes_hash: "h".to_string(),
            evidence_uri: "u".to_string(),
            workshop_signature: "s".to_string(),
            recorded_at_ms: 1,
            version: None,
        };
        let ops = vec![record(500), record(100), record(600)];

        let mut out = Vec::new();
        let outcome = apply(&fixture.ledger, ops, true, &mut out).unwrap();
        assert_eq!(outcome.committed, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].code(), Some(ErrorCode::DomainOdometerRollback));
        assert_eq!(fixture.ledger.intervention_count(fixture.passport).unwrap(), 2);
        assert_eq!(events(&out).len(), 2);
    }

    #[test]
    fn test_explicit_stale_version_is_presented_verbatim() {
        let fixture = LedgerFixture::new();
        let op = ScriptOp::TransferPassport {
            caller: addr(OWNER),
            passport_id: fixture.passport,
            to: addr("0xcc"),
            version: Some(Version::new(9)),
        };
        let err = op.submit(&fixture.ledger).unwrap_err();
        assert!(matches!(err, LedgerError::VersionConflict { .. }));
    }

    #[test]
    fn test_missing_passport_without_version() {
        let ledger = Ledger::builder().admin(caller(ADMIN)).build().unwrap();
        let op = ScriptOp::TransferPassport {
            caller: addr(OWNER),
            passport_id: PassportId::new(5),
            to: addr("0xcc"),
            version: None,
        };
        assert!(matches!(op.submit(&ledger).unwrap_err(), LedgerError::PassportNotFound { .. }));
    }
}
