//! Ledger event types consumed by external indexers.
//!
//! - [`LedgerEvent`]: the payload of one committed state transition
//! - [`EventAction`]: fieldless mirror of [`LedgerEvent`] with stable names
//! - [`EventScope`]: which object the transition mutated
//! - [`EventEntry`]: an event stamped with its sequence number, time, and actor
//!
//! Every successful mutating operation produces exactly one [`EventEntry`].
//! Sequence numbers are ledger-wide, start at 1, and have no gaps, so an
//! indexer that has seen sequence `n` knows exactly what it is missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Address, PassportId};

/// Object a transition mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    /// The registry singleton (admin, workshops, passport counter).
    Registry,
    /// A single passport.
    Passport,
}

impl EventScope {
    /// Returns a snake_case string for log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventScope::Registry => "registry",
            EventScope::Passport => "passport",
        }
    }
}

/// Payload of a committed state transition.
///
/// Each variant carries only what an indexer needs to follow the change
/// without re-reading ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    /// The registry was bootstrapped.
    RegistryCreated {
        /// Permanent registry admin.
        admin: Address,
    },
    /// A workshop registered itself.
    WorkshopRegistered {
        /// Address of the new entry.
        workshop: Address,
        /// Decentralized identifier it registered with.
        did: String,
    },
    /// The admin activated or deactivated a workshop.
    WorkshopStatusChanged {
        /// Workshop whose status changed.
        workshop: Address,
        /// New status.
        active: bool,
    },
    /// A passport was minted.
    PassportMinted {
        /// New passport.
        passport_id: PassportId,
        /// Vehicle identification number.
        vin: String,
        /// Initial owner.
        owner: Address,
    },
    /// A workshop appended an intervention.
    InterventionRecorded {
        /// Passport appended to.
        passport_id: PassportId,
        /// Sequence number of the new intervention.
        seq: u64,
        /// Recording workshop.
        workshop: Address,
        /// New odometer watermark.
        odometer_km: u64,
    },
    /// Custody of a passport moved.
    PassportTransferred {
        /// Transferred passport.
        passport_id: PassportId,
        /// Previous owner.
        from: Address,
        /// New owner.
        to: Address,
    },
}

impl LedgerEvent {
    /// Returns the action this event records.
    pub const fn action(&self) -> EventAction {
        match self {
            LedgerEvent::RegistryCreated { .. } => EventAction::RegistryCreated,
            LedgerEvent::WorkshopRegistered { .. } => EventAction::WorkshopRegistered,
            LedgerEvent::WorkshopStatusChanged { .. } => EventAction::WorkshopStatusChanged,
            LedgerEvent::PassportMinted { .. } => EventAction::PassportMinted,
            LedgerEvent::InterventionRecorded { .. } => EventAction::InterventionRecorded,
            LedgerEvent::PassportTransferred { .. } => EventAction::PassportTransferred,
        }
    }

    /// Passport the event concerns, if any.
    pub const fn passport_id(&self) -> Option<PassportId> {
        match self {
            LedgerEvent::PassportMinted { passport_id, .. }
            | LedgerEvent::InterventionRecorded { passport_id, .. }
            | LedgerEvent::PassportTransferred { passport_id, .. } => Some(*passport_id),
            LedgerEvent::RegistryCreated { .. }
            | LedgerEvent::WorkshopRegistered { .. }
            | LedgerEvent::WorkshopStatusChanged { .. } => None,
        }
    }
}

/// All event actions.
///
/// Exhaustive matches below mean a new variant cannot be added without a
/// scope, an event type, and a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    // ── Registry scope ──────────────────────────────────────
    /// Registry bootstrapped.
    RegistryCreated,
    /// Workshop self-registered.
    WorkshopRegistered,
    /// Workshop activated or deactivated.
    WorkshopStatusChanged,
    /// Passport minted. Registry scope because it advances the passport counter.
    PassportMinted,

    // ── Passport scope ──────────────────────────────────────
    /// Intervention appended.
    InterventionRecorded,
    /// Passport owner changed.
    PassportTransferred,
}

impl EventAction {
    /// Returns the object this action mutates.
    pub const fn scope(&self) -> EventScope {
        match self {
            EventAction::RegistryCreated
            | EventAction::WorkshopRegistered
            | EventAction::WorkshopStatusChanged
            | EventAction::PassportMinted => EventScope::Registry,

            EventAction::InterventionRecorded | EventAction::PassportTransferred => {
                EventScope::Passport
            },
        }
    }

    /// Returns the hierarchical dot-separated event type string.
    ///
    /// Format: `passport.<domain>.<action>`.
    pub const fn event_type(&self) -> &'static str {
        match self {
            EventAction::RegistryCreated => "passport.registry.created",
            EventAction::WorkshopRegistered => "passport.workshop.registered",
            EventAction::WorkshopStatusChanged => "passport.workshop.status_changed",
            EventAction::PassportMinted => "passport.passport.minted",
            EventAction::InterventionRecorded => "passport.intervention.recorded",
            EventAction::PassportTransferred => "passport.passport.transferred",
        }
    }

    /// Returns a snake_case label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventAction::RegistryCreated => "registry_created",
            EventAction::WorkshopRegistered => "workshop_registered",
            EventAction::WorkshopStatusChanged => "workshop_status_changed",
            EventAction::PassportMinted => "passport_minted",
            EventAction::InterventionRecorded => "intervention_recorded",
            EventAction::PassportTransferred => "passport_transferred",
        }
    }

    /// Returns all variants of `EventAction` for exhaustive testing.
    pub const ALL: &'static [EventAction] = &[
        EventAction::RegistryCreated,
        EventAction::WorkshopRegistered,
        EventAction::WorkshopStatusChanged,
        EventAction::PassportMinted,
        EventAction::InterventionRecorded,
        EventAction::PassportTransferred,
    ];
}

impl std::str::FromStr for EventAction {
    type Err = String;

    /// Parses an `EventAction` from its snake_case label.
    ///
    /// Inverse of [`EventAction::as_str()`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for action in Self::ALL {
            if action.as_str() == s {
                return Ok(*action);
            }
        }
        Err(format!("unknown event action: {s}"))
    }
}

/// A committed event as delivered to sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    /// Ledger-wide position, starting at 1 with no gaps.
    pub sequence: u64,
    /// Wall-clock time the transition committed.
    pub timestamp: DateTime<Utc>,
    /// Authenticated caller that performed the operation.
    pub actor: Address,
    /// What happened.
    pub event: LedgerEvent,
}

impl EventEntry {
    /// Shorthand for `self.event.action()`.
    pub const fn action(&self) -> EventAction {
        self.event.action()
    }
}
