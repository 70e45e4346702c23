//! The ledger facade: single entry point for every operation.
//!
//! # Locking
//!
//! The registry sits behind one `RwLock`. Passports live in a map of
//! per-passport mutexes; the map lock is held only to look up or insert.
//! Locks are always taken in the order registry → passport map → passport →
//! event sequence.
//!
//! # Check order
//!
//! Every mutating operation runs, in order: field size validation,
//! authorization guard, version check, invariant checks, event sequence
//! reservation, mutation, event emission. A caller that is not allowed to
//! act gets its authorization error even when it also presents a stale
//! version. Everything up to and including the reservation can fail; the
//! mutation itself only fails on an exhausted counter, and does so before
//! its first write. A failed operation therefore leaves no trace.
//! Events are emitted while the mutated object's lock is held.

use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RwLock};
use passport_ledger_types::{
    Address, AuthenticatedCaller, EventEntry, LedgerError, LedgerEvent, NewIntervention,
    NewPassport, ObjectRef, PassportId, PassportView, Result, ServiceIntervention, Version,
    WorkshopIdentity,
    config::LedgerConfig,
    validation::{validate_intervention_fields, validate_passport_fields, validate_workshop_fields},
};

use crate::{
    events::{EventEmitter, EventLog, EventSink},
    guard,
    passport::PassportState,
    registry::Registry,
    snapshot::{LedgerSnapshot, SNAPSHOT_FORMAT_VERSION},
};

type PassportMap = HashMap<PassportId, Arc<Mutex<PassportState>>>;

/// Outcome of a committed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// New registry version, when the operation mutated the registry.
    pub registry_version: Option<Version>,
    /// Reference to present next, when the operation created or mutated a passport.
    pub passport: Option<ObjectRef>,
    /// The event the operation emitted.
    pub event: EventEntry,
}

/// Vehicle passport ledger.
///
/// `Ledger` is `Send + Sync`; share it with `Arc<Ledger>`.
#[derive(Debug)]
pub struct Ledger {
    config: LedgerConfig,
    registry: RwLock<Registry>,
    passports: RwLock<PassportMap>,
    event_log: Arc<EventLog>,
    emitter: EventEmitter,
}

#[bon::bon]
impl Ledger {
    /// Bootstraps a new ledger. `admin` becomes the permanent registry admin.
    ///
    /// Emits `RegistryCreated` as event 1.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Config`] if `config` is invalid.
    #[builder]
    pub fn new(
        admin: AuthenticatedCaller,
        #[builder(default)] config: LedgerConfig,
        #[builder(default)] sinks: Vec<Arc<dyn EventSink>>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = Registry::new(admin.address().clone());
        let ledger = Self::assemble(config, registry, HashMap::new(), 1, sinks);
        ledger.emitter.reserve()?.emit(
            admin.address(),
            LedgerEvent::RegistryCreated { admin: admin.address().clone() },
        );
        tracing::info!(admin = %admin, "registry created");
        Ok(ledger)
    }
}

impl Ledger {
    /// Rebuilds a ledger from a snapshot after re-verifying every invariant.
    ///
    /// No event is emitted; the next event continues the snapshot's sequence.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SnapshotInvalid`] if any invariant fails and
    /// [`LedgerError::Config`] if `config` is invalid.
    pub fn restore(
        snapshot: LedgerSnapshot,
        config: LedgerConfig,
        sinks: Vec<Arc<dyn EventSink>>,
    ) -> Result<Self> {
        config.validate()?;
        snapshot.verify()?;

        let LedgerSnapshot { mut registry, passports, next_event_sequence, .. } = snapshot;
        registry.rebuild_index();

        let mut map = PassportMap::with_capacity(passports.len());
        for view in passports {
            registry.index_vin(&view.passport.vin, view.passport.id);
            map.insert(view.passport.id, Arc::new(Mutex::new(PassportState::from_view(view))));
        }

        tracing::info!(
            passports = map.len(),
            workshops = registry.workshop_count(),
            registry_version = %registry.version(),
            next_event_sequence,
            "ledger restored from snapshot"
        );
        Ok(Self::assemble(config, registry, map, next_event_sequence, sinks))
    }

    fn assemble(
        config: LedgerConfig,
        registry: Registry,
        passports: PassportMap,
        next_event_sequence: u64,
        mut sinks: Vec<Arc<dyn EventSink>>,
    ) -> Self {
        let event_log = Arc::new(EventLog::new(config.events));
        sinks.insert(0, event_log.clone());
        Self {
            config,
            registry: RwLock::new(registry),
            passports: RwLock::new(passports),
            event_log,
            emitter: EventEmitter::new(next_event_sequence, sinks),
        }
    }

    // ========================================================================
    // Identity Directory
    // ========================================================================

    /// Registers `workshop` in the directory as an active workshop.
    ///
    /// The caller must be `workshop` itself.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    ///
    /// - [`LedgerError::InvalidArgument`] if `did` or the key exceeds its limit
    /// - [`LedgerError::UnauthorizedSender`] if the caller is not `workshop`
    /// - [`LedgerError::VersionConflict`] if `registry_version` is stale
    /// - [`LedgerError::WorkshopAlreadyRegistered`] under the `reject` policy
    /// - [`LedgerError::CounterExhausted`] if the event sequence or registry version cannot advance
    pub fn register_workshop(
        &self,
        caller: &AuthenticatedCaller,
        registry_version: Version,
        workshop: &Address,
        did: &str,
        public_key_multibase: &str,
    ) -> Result<Receipt> {
        validate_workshop_fields(did, public_key_multibase, &self.config.limits)?;
        guard::require_self(caller, workshop, "register_workshop")?;

        let mut registry = self.registry.write();
        check_version("registry", registry_version, registry.version())?;
        registry.check_registration(workshop, self.config.registration.duplicate_workshops)?;

        let reservation = self.emitter.reserve()?;
        registry.register_workshop(WorkshopIdentity {
            address: workshop.clone(),
            did: did.to_string(),
            public_key_multibase: public_key_multibase.to_string(),
            active: true,
        })?;
        let event = reservation.emit(
            caller.address(),
            LedgerEvent::WorkshopRegistered { workshop: workshop.clone(), did: did.to_string() },
        );
        tracing::info!(workshop = %workshop, did, "workshop registered");
        Ok(Receipt { registry_version: Some(registry.version()), passport: None, event })
    }

    /// Activates or deactivates a workshop. Admin only.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    ///
    /// - [`LedgerError::NotAdmin`] if the caller is not the admin
    /// - [`LedgerError::VersionConflict`] if `registry_version` is stale
    /// - [`LedgerError::WorkshopNotFound`] if `workshop` never registered
    /// - [`LedgerError::CounterExhausted`] if the event sequence or registry version cannot advance
    pub fn set_workshop_status(
        &self,
        caller: &AuthenticatedCaller,
        registry_version: Version,
        workshop: &Address,
        active: bool,
    ) -> Result<Receipt> {
        let mut registry = self.registry.write();
        guard::require_admin(caller, &registry)?;
        check_version("registry", registry_version, registry.version())?;
        registry.check_workshop_exists(workshop)?;

        let reservation = self.emitter.reserve()?;
        registry.set_workshop_status(workshop, active)?;
        let event = reservation.emit(
            caller.address(),
            LedgerEvent::WorkshopStatusChanged { workshop: workshop.clone(), active },
        );
        tracing::info!(workshop = %workshop, active, "workshop status changed");
        Ok(Receipt { registry_version: Some(registry.version()), passport: None, event })
    }

    /// Whether `address` is a registered, active workshop. `false` for unknown addresses.
    pub fn is_workshop_active(&self, address: &Address) -> bool {
        self.registry.read().is_workshop_active(address)
    }

    /// Number of directory entries, duplicates included.
    pub fn workshop_count(&self) -> u64 {
        self.registry.read().workshop_count()
    }

    /// First directory entry for `address`.
    pub fn workshop(&self, address: &Address) -> Option<WorkshopIdentity> {
        self.registry.read().workshop(address).cloned()
    }

    /// All directory entries in registration order.
    pub fn workshops(&self) -> Vec<WorkshopIdentity> {
        self.registry.read().workshops().to_vec()
    }

    /// Permanent registry admin.
    pub fn admin(&self) -> Address {
        self.registry.read().admin().clone()
    }

    /// Current registry version.
    pub fn registry_version(&self) -> Version {
        self.registry.read().version()
    }

    // ========================================================================
    // Passport Store
    // ========================================================================

    /// Mints a passport for a vehicle. The caller must be the declared owner.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    ///
    /// - [`LedgerError::InvalidArgument`] if a text field exceeds its limit
    /// - [`LedgerError::UnauthorizedSender`] if the caller is not `input.owner`
    /// - [`LedgerError::VersionConflict`] if `registry_version` is stale
    /// - [`LedgerError::InvalidYear`] if `input.year <= 0`
    /// - [`LedgerError::DuplicateVin`] when duplicate VINs are rejected
    /// - [`LedgerError::CounterExhausted`] if the event sequence or registry version cannot advance
    pub fn mint_passport(
        &self,
        caller: &AuthenticatedCaller,
        registry_version: Version,
        input: NewPassport,
    ) -> Result<Receipt> {
        validate_passport_fields(&input, &self.config.limits)?;
        guard::require_self(caller, &input.owner, "mint_passport")?;

        let mut registry = self.registry.write();
        check_version("registry", registry_version, registry.version())?;
        if input.year <= 0 {
            tracing::debug!(year = input.year, "mint rejected");
            return Err(LedgerError::InvalidYear { year: input.year });
        }
        if self.config.mint.reject_duplicate_vins {
            if let Some(existing) = registry.passport_for_vin(&input.vin) {
                tracing::debug!(vin = %input.vin, existing = %existing, "duplicate VIN rejected");
                return Err(LedgerError::DuplicateVin { vin: input.vin, existing });
            }
        }

        let mut passports = self.passports.write();
        let reservation = self.emitter.reserve()?;
        let id = registry.allocate_passport(&input.vin)?;
        let vin = input.vin.clone();
        let owner = input.owner.clone();
        let state = PassportState::mint(id, input);
        let passport_ref = ObjectRef::new(id, state.version);
        passports.insert(id, Arc::new(Mutex::new(state)));
        drop(passports);

        let event = reservation.emit(
            caller.address(),
            LedgerEvent::PassportMinted { passport_id: id, vin, owner: owner.clone() },
        );
        tracing::info!(passport = %id, owner = %owner, "passport minted");
        Ok(Receipt {
            registry_version: Some(registry.version()),
            passport: Some(passport_ref),
            event,
        })
    }

    /// Appends a service intervention recorded by the calling workshop.
    ///
    /// The intervention's workshop is always the caller.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    ///
    /// - [`LedgerError::InvalidArgument`] if a text field exceeds its limit
    /// - [`LedgerError::WorkshopNotActive`] if the caller is not an active workshop
    /// - [`LedgerError::PassportNotFound`] if `target.id` does not exist
    /// - [`LedgerError::VersionConflict`] if `target.version` is stale
    /// - [`LedgerError::OdometerRollback`] if the reading is below the watermark
    /// - [`LedgerError::InvalidTimestamp`] if `recorded_at_ms <= 0`
    /// - [`LedgerError::CounterExhausted`] if the event sequence or passport version cannot advance
    pub fn record_intervention(
        &self,
        caller: &AuthenticatedCaller,
        target: ObjectRef,
        input: NewIntervention,
    ) -> Result<Receipt> {
        validate_intervention_fields(&input, &self.config.limits)?;

        let registry = self.registry.read();
        guard::require_active_workshop(caller, &registry)?;
        let handle = self.passport_handle(target.id)?;
        let mut state = handle.lock();
        check_version(&target.id.to_string(), target.version, state.version)?;
        if let Err(err) = state.check_append(&input) {
            tracing::debug!(passport = %target.id, error = %err, "intervention rejected");
            return Err(err);
        }

        let odometer_km = input.odometer_km;
        let reservation = self.emitter.reserve()?;
        let seq = state.append(caller.address().clone(), input)?;
        let event = reservation.emit(
            caller.address(),
            LedgerEvent::InterventionRecorded {
                passport_id: target.id,
                seq,
                workshop: caller.address().clone(),
                odometer_km,
            },
        );
        tracing::info!(
            passport = %target.id,
            workshop = %caller,
            seq,
            odometer_km,
            "intervention recorded"
        );
        Ok(Receipt {
            registry_version: None,
            passport: Some(ObjectRef::new(target.id, state.version)),
            event,
        })
    }

    /// Transfers custody of a passport to `to`. The caller must hold it.
    ///
    /// History and counters are unchanged; only the owner moves.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    ///
    /// - [`LedgerError::PassportNotFound`] if `target.id` does not exist
    /// - [`LedgerError::UnauthorizedSender`] if the caller is not the holder
    /// - [`LedgerError::VersionConflict`] if `target.version` is stale
    /// - [`LedgerError::CounterExhausted`] if the event sequence or passport version cannot advance
    pub fn transfer_passport(
        &self,
        caller: &AuthenticatedCaller,
        target: ObjectRef,
        to: &Address,
    ) -> Result<Receipt> {
        let handle = self.passport_handle(target.id)?;
        let mut state = handle.lock();
        guard::require_holder(caller, &state.passport)?;
        check_version(&target.id.to_string(), target.version, state.version)?;

        let reservation = self.emitter.reserve()?;
        let from = state.transfer(to.clone())?;
        let event = reservation.emit(
            caller.address(),
            LedgerEvent::PassportTransferred {
                passport_id: target.id,
                from: from.clone(),
                to: to.clone(),
            },
        );
        tracing::info!(passport = %target.id, from = %from, to = %to, "passport transferred");
        Ok(Receipt {
            registry_version: None,
            passport: Some(ObjectRef::new(target.id, state.version)),
            event,
        })
    }

    /// Current contents and version of a passport.
    pub fn passport(&self, id: PassportId) -> Option<PassportView> {
        let handle = self.passports.read().get(&id).cloned()?;
        let state = handle.lock();
        Some(state.view())
    }

    /// Number of passports minted.
    pub fn passport_count(&self) -> u64 {
        self.registry.read().passport_counter()
    }

    /// Number of interventions recorded on a passport.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PassportNotFound`] for an unknown id.
    pub fn intervention_count(&self, id: PassportId) -> Result<u64> {
        let handle = self.passport_handle(id)?;
        let count = handle.lock().passport.intervention_count();
        Ok(count)
    }

    /// Intervention `seq` (1-based) of a passport.
    pub fn intervention(&self, id: PassportId, seq: u64) -> Option<ServiceIntervention> {
        let handle = self.passports.read().get(&id).cloned()?;
        let state = handle.lock();
        state.passport.intervention(seq).cloned()
    }

    fn passport_handle(&self, id: PassportId) -> Result<Arc<Mutex<PassportState>>> {
        self.passports
            .read()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::PassportNotFound { passport_id: id })
    }

    // ========================================================================
    // Events, snapshots, configuration
    // ========================================================================

    /// Retained events with `sequence > after`, oldest first.
    pub fn events_since(&self, after: u64) -> Vec<EventEntry> {
        self.event_log.since(after)
    }

    /// Most recent retained event. `None` until this instance commits one;
    /// restoring from a snapshot starts with an empty log.
    pub fn last_event(&self) -> Option<EventEntry> {
        self.event_log.last()
    }

    /// Number of events the in-memory log currently retains, at most
    /// `config().events.capacity`.
    pub fn retained_event_count(&self) -> usize {
        self.event_log.len()
    }

    /// Sequence number the next event will receive.
    pub fn next_event_sequence(&self) -> u64 {
        self.emitter.next_sequence()
    }

    /// Active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Captures a consistent snapshot of the whole ledger.
    ///
    /// Holds the registry read lock and every passport lock while copying, so
    /// no operation commits halfway through the capture.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let registry = self.registry.read();
        let map = self.passports.read();

        let mut handles: Vec<_> = map.iter().map(|(id, handle)| (*id, handle.clone())).collect();
        handles.sort_by_key(|(id, _)| *id);
        let guards: Vec<_> = handles.iter().map(|(_, handle)| handle.lock()).collect();

        let passports = guards.iter().map(|state| state.view()).collect();
        let next_event_sequence = self.emitter.next_sequence();

        LedgerSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            registry: registry.clone(),
            passports,
            next_event_sequence,
        }
    }
}

fn check_version(object: &str, presented: Version, current: Version) -> Result<()> {
    if presented == current {
        return Ok(());
    }
    tracing::debug!(object, presented = %presented, current = %current, "version conflict");
    Err(LedgerError::VersionConflict { object: object.to_string(), presented, current })
}
