//! Passport store records and the per-passport invariant checker.

use passport_ledger_types::{
    Address, LedgerError, NewIntervention, NewPassport, PassportId, PassportView, Result,
    ServiceIntervention, VehiclePassport, Version,
};

/// A passport together with its optimistic concurrency version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PassportState {
    pub(crate) version: Version,
    pub(crate) passport: VehiclePassport,
}

impl PassportState {
    /// A freshly minted passport with an empty history.
    pub(crate) fn mint(id: PassportId, input: NewPassport) -> Self {
        Self {
            version: Version::INITIAL,
            passport: VehiclePassport {
                id,
                vin: input.vin,
                make: input.make,
                model: input.model,
                year: input.year,
                owner: input.owner,
                latest_odometer_km: 0,
                intervention_counter: 0,
                interventions: Vec::new(),
            },
        }
    }

    pub(crate) fn from_view(view: PassportView) -> Self {
        Self { version: view.version, passport: view.passport }
    }

    pub(crate) fn view(&self) -> PassportView {
        PassportView { version: self.version, passport: self.passport.clone() }
    }

    /// Checks the mileage and timestamp invariants for a new intervention.
    pub(crate) fn check_append(&self, input: &NewIntervention) -> Result<()> {
        if input.odometer_km < self.passport.latest_odometer_km {
            return Err(LedgerError::OdometerRollback {
                passport_id: self.passport.id,
                latest_km: self.passport.latest_odometer_km,
                attempted_km: input.odometer_km,
            });
        }
        if input.recorded_at_ms <= 0 {
            return Err(LedgerError::InvalidTimestamp { recorded_at_ms: input.recorded_at_ms });
        }
        Ok(())
    }

    /// Appends an intervention recorded by `workshop`. Run [`Self::check_append`] first.
    ///
    /// Fails with `CounterExhausted`, leaving the passport untouched, when the
    /// version cannot advance.
    pub(crate) fn append(&mut self, workshop: Address, input: NewIntervention) -> Result<u64> {
        let version = self.next_version()?;
        let passport = &mut self.passport;
        let seq = passport.intervention_counter.checked_add(1).ok_or_else(|| {
            LedgerError::CounterExhausted { counter: format!("{} interventions", passport.id) }
        })?;
        passport.intervention_counter = seq;
        passport.latest_odometer_km = input.odometer_km;
        passport.interventions.push(ServiceIntervention {
            seq,
            workshop,
            odometer_km: input.odometer_km,
            work_type: input.work_type,
            notes_hash: input.notes_hash,
            evidence_uri: input.evidence_uri,
            workshop_signature: input.workshop_signature,
            recorded_at_ms: input.recorded_at_ms,
        });
        self.version = version;
        Ok(seq)
    }

    /// Moves custody to `to` and returns the previous owner.
    pub(crate) fn transfer(&mut self, to: Address) -> Result<Address> {
        let version = self.next_version()?;
        let from = std::mem::replace(&mut self.passport.owner, to);
        self.version = version;
        Ok(from)
    }

    fn next_version(&self) -> Result<Version> {
        self.version.next().ok_or_else(|| LedgerError::CounterExhausted {
            counter: format!("{} version", self.passport.id),
        })
    }
}

/// Re-checks every per-passport invariant.
///
/// - `interventions[i].seq == i + 1`
/// - odometers never decrease along the history
/// - `latest_odometer_km` is the last odometer, or 0 for an empty history
/// - `intervention_counter` equals the history length
/// - every `recorded_at_ms` is positive
/// - `year` is positive
///
/// # Errors
///
/// Returns [`LedgerError::SnapshotInvalid`] describing the first violation.
pub fn verify_history(passport: &VehiclePassport) -> Result<()> {
    let invalid = |message: String| LedgerError::SnapshotInvalid {
        message: format!("{}: {message}", passport.id),
    };

    if passport.year <= 0 {
        return Err(invalid(format!("year {} is not positive", passport.year)));
    }
    if passport.intervention_counter != passport.interventions.len() as u64 {
        return Err(invalid(format!(
            "counter {} does not match {} interventions",
            passport.intervention_counter,
            passport.interventions.len()
        )));
    }

    let mut previous_km = 0;
    for (index, intervention) in passport.interventions.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if intervention.seq != expected_seq {
            return Err(invalid(format!(
                "intervention at position {expected_seq} has seq {}",
                intervention.seq
            )));
        }
        if intervention.odometer_km < previous_km {
            return Err(invalid(format!(
                "odometer decreases at seq {expected_seq}: {} < {previous_km}",
                intervention.odometer_km
            )));
        }
        if intervention.recorded_at_ms <= 0 {
            return Err(invalid(format!("seq {expected_seq} has non-positive timestamp")));
        }
        previous_km = intervention.odometer_km;
    }

    let expected_latest = passport.interventions.last().map_or(0, |i| i.odometer_km);
    if passport.latest_odometer_km != expected_latest {
        return Err(invalid(format!(
            "latest odometer {} does not match history {expected_latest}",
            passport.latest_odometer_km
        )));
    }
    Ok(())
}
