//! Core type definitions for the passport ledger.
//!
//! - Identifier types ([`PassportId`], [`Version`], [`Address`])
//! - The authenticated caller handed in by the host
//! - Registry, workshop, passport, and intervention records

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a numeric type for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]`
/// - `From<inner>` and `Into<inner>` conversions
/// - `Display` with a semantic prefix (e.g., `passport:3`)
/// - `new()` constructor and `value()` accessor
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty, $prefix:expr
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from a raw value.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = <$inner as std::str::FromStr>::Err;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                raw.parse::<$inner>().map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a vehicle passport.
    ///
    /// Assigned from the registry's passport counter; the first passport
    /// minted on a ledger is `passport:1`.
    PassportId, u64, "passport"
);

define_id!(
    /// Optimistic concurrency version of a ledger object.
    ///
    /// The registry and every passport start at [`Version::INITIAL`] and move
    /// forward by exactly one per committed mutation.
    Version, u64, "v"
);

impl Version {
    /// Version of a freshly created object.
    pub const INITIAL: Version = Version(1);

    /// Returns the version that follows this one, or `None` once the
    /// version space is used up. `u64::MAX` itself is never issued; snapshots
    /// carrying it are rejected on restore.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) if next < u64::MAX => Some(Self(next)),
            _ => None,
        }
    }
}

/// Maximum number of hex digits in an [`Address`].
pub const MAX_ADDRESS_HEX_DIGITS: usize = 64;

/// Account address of a ledger participant.
///
/// Addresses are `0x`-prefixed hex strings with 1 to 64 digits. Parsing
/// normalizes the digits to lowercase, so `0xAA` and `0xaa` are the same
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parses and normalizes an address.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the input lacks the `0x` prefix, has no
    /// digits, has more than [`MAX_ADDRESS_HEX_DIGITS`] digits, or contains a
    /// non-hex character.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::new("address", "must start with 0x"))?;
        if digits.is_empty() {
            return Err(ValidationError::new("address", "must contain at least one hex digit"));
        }
        if digits.len() > MAX_ADDRESS_HEX_DIGITS {
            return Err(ValidationError::new(
                "address",
                format!(
                    "{} hex digits exceeds maximum {MAX_ADDRESS_HEX_DIGITS}",
                    digits.len()
                ),
            ));
        }
        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ValidationError::new(
                "address",
                format!("contains non-hex character {bad:?}"),
            ));
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Returns the normalized string form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Identity of the sender of a mutating call, as authenticated by the host.
///
/// The ledger never derives this from request payloads. Hosts construct it
/// from their signature-verification layer and pass it alongside (never in
/// place of) any identity the request names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthenticatedCaller(Address);

impl AuthenticatedCaller {
    /// Wraps an address that the host has authenticated as the sender.
    #[inline]
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    /// Returns the authenticated address.
    #[inline]
    pub fn address(&self) -> &Address {
        &self.0
    }
}

impl fmt::Display for AuthenticatedCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A passport id together with the version the caller last observed.
///
/// Presented on every passport mutation; a stale version aborts the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Passport being mutated.
    pub id: PassportId,
    /// Version the caller read.
    pub version: Version,
}

impl ObjectRef {
    /// Creates a reference to `id` at `version`.
    #[inline]
    pub const fn new(id: PassportId, version: Version) -> Self {
        Self { id, version }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

// ============================================================================
// Directory Records
// ============================================================================

/// A workshop entry in the identity directory.
///
/// Entries are never removed; deactivation flips `active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopIdentity {
    /// Address the workshop registered (and authenticates) with.
    pub address: Address,
    /// Decentralized identifier of the workshop.
    pub did: String,
    /// Multibase-encoded public key.
    pub public_key_multibase: String,
    /// Whether the workshop may currently record interventions.
    pub active: bool,
}

// ============================================================================
// Passport Records
// ============================================================================

/// A single service event in a passport's history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIntervention {
    /// 1-based position in the history.
    pub seq: u64,
    /// Workshop that recorded the intervention (always the authenticated sender).
    pub workshop: Address,
    /// Odometer reading in kilometres.
    pub odometer_km: u64,
    /// Kind of work performed (e.g. `oil_change`).
    pub work_type: String,
    /// Hash of the evidence document, computed off-ledger.
    pub notes_hash: String,
    /// Where the evidence document can be fetched.
    pub evidence_uri: String,
    /// Workshop signature over the evidence.
    pub workshop_signature: String,
    /// Wall-clock time of the intervention, milliseconds since the Unix epoch.
    pub recorded_at_ms: i64,
}

/// A vehicle's passport: metadata, mileage watermark, and service history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehiclePassport {
    /// Passport identifier.
    pub id: PassportId,
    /// Vehicle identification number. Stored verbatim.
    pub vin: String,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: i32,
    /// Current owner, which is also the holder allowed to transfer it.
    pub owner: Address,
    /// Odometer of the latest intervention, 0 when the history is empty.
    pub latest_odometer_km: u64,
    /// Sequence number of the latest intervention.
    pub intervention_counter: u64,
    /// Append-only service history.
    pub interventions: Vec<ServiceIntervention>,
}

impl VehiclePassport {
    /// Number of recorded interventions.
    #[inline]
    pub fn intervention_count(&self) -> u64 {
        self.intervention_counter
    }

    /// Returns the intervention with the given 1-based sequence number.
    pub fn intervention(&self, seq: u64) -> Option<&ServiceIntervention> {
        let index = usize::try_from(seq.checked_sub(1)?).ok()?;
        self.interventions.get(index)
    }
}

/// Read-side copy of a passport together with its current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassportView {
    /// Version to present on the next mutation.
    pub version: Version,
    /// Passport contents at that version.
    pub passport: VehiclePassport,
}

impl PassportView {
    /// Reference to present when mutating this passport.
    #[inline]
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.passport.id, self.version)
    }
}

// ============================================================================
// Operation Inputs
// ============================================================================

/// Vehicle metadata supplied when minting a passport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct NewPassport {
    /// Vehicle identification number.
    #[builder(into)]
    pub vin: String,
    /// Manufacturer.
    #[builder(into)]
    pub make: String,
    /// Model name.
    #[builder(into)]
    pub model: String,
    /// Model year; must be positive.
    pub year: i32,
    /// Declared owner; must equal the caller.
    pub owner: Address,
}

/// Intervention details supplied by the recording workshop.
///
/// There is no workshop field: the recorder is always the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct NewIntervention {
    /// Odometer reading in kilometres.
    pub odometer_km: u64,
    /// Kind of work performed.
    #[builder(into)]
    pub work_type: String,
    /// Hash of the evidence document.
    #[builder(into)]
    pub notes_hash: String,
    /// Evidence location.
    #[builder(into)]
    pub evidence_uri: String,
    /// Workshop signature over the evidence.
    #[builder(into)]
    pub workshop_signature: String,
    /// Milliseconds since the Unix epoch; must be positive.
    pub recorded_at_ms: i64,
}
