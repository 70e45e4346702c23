//! Error types for the passport ledger using snafu.
//!
//! Defines a single error type covering:
//! - Authorization failures (wrong caller for the operation)
//! - Domain invariant violations (odometer rollback, invalid year/timestamp)
//! - Lookup failures (unknown workshop or passport)
//! - Optimistic concurrency conflicts
//! - Infrastructure failures (codec, snapshot, I/O, configuration)
//!
//! Each error variant maps to an [`ErrorCode`] with a unique numeric identifier,
//! retryability classification, and suggested recovery action.

use core::fmt;

use snafu::{Location, Snafu};

use crate::{
    codec::CodecError,
    config::ConfigError,
    types::{Address, PassportId, Version},
    validation::ValidationError,
};

/// Unified result type for ledger operations.
pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Machine-readable error codes for programmatic error handling.
///
/// Codes are organized into ranges:
///
/// | Range       | Domain         | Examples                                  |
/// |-------------|----------------|-------------------------------------------|
/// | 1000–1099   | Authorization  | Not admin, wrong sender, inactive workshop |
/// | 2000–2099   | Domain         | Odometer rollback, invalid year/timestamp |
/// | 3000–3099   | Lookup         | Workshop or passport not found            |
/// | 3100–3199   | Concurrency    | Version conflict                          |
/// | 3200–3299   | Infrastructure | Snapshot, codec, I/O, config, counters    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Authorization (1000–1099) ---
    /// Caller is not the registry admin.
    AuthNotAdmin = 1000,
    /// Caller does not match the identity the operation requires.
    AuthUnauthorizedSender = 1001,
    /// Caller is not an active workshop.
    AuthWorkshopNotActive = 1002,

    // --- Domain (2000–2099) ---
    /// Odometer reading below the passport's watermark.
    DomainOdometerRollback = 2000,
    /// Model year is zero or negative.
    DomainInvalidYear = 2001,
    /// Intervention timestamp is zero or negative.
    DomainInvalidTimestamp = 2002,
    /// A field exceeds its configured size limit.
    DomainInvalidArgument = 2003,
    /// Address already has a directory entry and duplicates are rejected.
    DomainWorkshopAlreadyRegistered = 2004,
    /// VIN already has a passport and duplicates are rejected.
    DomainDuplicateVin = 2005,

    // --- Lookup (3000–3099) ---
    /// No directory entry for the address.
    LookupWorkshopNotFound = 3000,
    /// No passport with the id.
    LookupPassportNotFound = 3001,

    // --- Concurrency (3100–3199) ---
    /// Presented version does not match the current version.
    ConcurrencyVersionConflict = 3100,

    // --- Infrastructure (3200–3299) ---
    /// Snapshot failed invariant verification.
    InfraSnapshotInvalid = 3200,
    /// Serialization or deserialization failed.
    InfraCodec = 3201,
    /// Filesystem I/O failed.
    InfraIo = 3202,
    /// Configuration is invalid.
    InfraConfig = 3203,
    /// A version or sequence counter has no successor left.
    InfraCounterExhausted = 3204,
}

impl ErrorCode {
    /// Every error code, for exhaustive tests and documentation.
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::AuthNotAdmin,
        ErrorCode::AuthUnauthorizedSender,
        ErrorCode::AuthWorkshopNotActive,
        ErrorCode::DomainOdometerRollback,
        ErrorCode::DomainInvalidYear,
        ErrorCode::DomainInvalidTimestamp,
        ErrorCode::DomainInvalidArgument,
        ErrorCode::DomainWorkshopAlreadyRegistered,
        ErrorCode::DomainDuplicateVin,
        ErrorCode::LookupWorkshopNotFound,
        ErrorCode::LookupPassportNotFound,
        ErrorCode::ConcurrencyVersionConflict,
        ErrorCode::InfraSnapshotInvalid,
        ErrorCode::InfraCodec,
        ErrorCode::InfraIo,
        ErrorCode::InfraConfig,
        ErrorCode::InfraCounterExhausted,
    ];

    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_u16() == code)
    }

    /// Whether this error is retryable.
    ///
    /// Only conflicts and I/O are transient. Everything else needs the caller
    /// to change the request or the ledger state first.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ConcurrencyVersionConflict | Self::InfraIo)
    }

    /// Suggested recovery action for this error code.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::AuthNotAdmin => "Submit the operation from the registry admin address.",
            Self::AuthUnauthorizedSender => {
                "Submit from the address named in the request. Identities can only act for themselves."
            },
            Self::AuthWorkshopNotActive => {
                "Register the workshop, or ask the registry admin to reactivate it."
            },
            Self::DomainOdometerRollback => {
                "Re-read the passport's latest odometer and submit a reading at or above it."
            },
            Self::DomainInvalidYear => "Provide a positive model year.",
            Self::DomainInvalidTimestamp => {
                "Provide a positive timestamp in milliseconds since the Unix epoch."
            },
            Self::DomainInvalidArgument => "Shorten the offending field and resubmit.",
            Self::DomainWorkshopAlreadyRegistered => {
                "The address is already registered. Ask the admin to change its status instead."
            },
            Self::DomainDuplicateVin => "Use the existing passport for this VIN.",
            Self::LookupWorkshopNotFound => "Verify the workshop address has registered itself.",
            Self::LookupPassportNotFound => "Verify the passport id.",
            Self::ConcurrencyVersionConflict => {
                "Re-read the object to get its current version and retry."
            },
            Self::InfraSnapshotInvalid => {
                "The snapshot is corrupt or was produced by an incompatible build. Restore another copy."
            },
            Self::InfraCodec => "Codec bug or data corruption. Report with the serialized data.",
            Self::InfraIo => "Check disk space and file permissions, then retry.",
            Self::InfraConfig => "Fix the configuration value and restart.",
            Self::InfraCounterExhausted => {
                "The object can take no further mutations. Migrate its state to a new ledger."
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Top-level error type for ledger operations.
///
/// Every failure aborts the whole operation before any state changes.
///
/// # Recovery Guide
///
/// | Variant                     | Retryable | Recovery Action                                  |
/// | --------------------------- | --------- | ------------------------------------------------ |
/// | `NotAdmin`                  | No        | Submit from the admin address                    |
/// | `UnauthorizedSender`        | No        | Submit from the address the request names        |
/// | `WorkshopNotActive`         | No        | Register or get reactivated                      |
/// | `OdometerRollback`          | No        | Re-read the watermark                            |
/// | `InvalidYear`               | No        | Positive year                                    |
/// | `InvalidTimestamp`          | No        | Positive timestamp                               |
/// | `InvalidArgument`           | No        | Shorten the field                                |
/// | `WorkshopAlreadyRegistered` | No        | Use status changes instead                       |
/// | `DuplicateVin`              | No        | Use the existing passport                        |
/// | `WorkshopNotFound`          | No        | Register first                                   |
/// | `PassportNotFound`          | No        | Verify the id                                    |
/// | `VersionConflict`           | Yes       | Re-read and retry                                |
/// | `SnapshotInvalid`           | No        | Restore another snapshot                         |
/// | `Codec`                     | No        | Report as issue                                  |
/// | `Io`                        | Maybe     | Check filesystem                                 |
/// | `Config`                    | No        | Fix configuration                                |
/// | `CounterExhausted`          | No        | Migrate to a new ledger                          |
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LedgerError {
    /// Caller is not the registry admin.
    #[snafu(display("{caller} is not the registry admin"))]
    NotAdmin {
        /// Authenticated caller.
        caller: Address,
    },

    /// Caller does not match the identity the operation requires.
    #[snafu(display("{operation}: sender {caller} does not match required identity {expected}"))]
    UnauthorizedSender {
        /// Operation being attempted.
        operation: &'static str,
        /// Authenticated caller.
        caller: Address,
        /// Identity the operation requires.
        expected: Address,
    },

    /// Caller is not a registered, active workshop.
    #[snafu(display("{caller} is not an active workshop"))]
    WorkshopNotActive {
        /// Authenticated caller.
        caller: Address,
    },

    /// Odometer reading would decrease the passport's mileage.
    #[snafu(display(
        "odometer rollback on {passport_id}: {attempted_km} km is below latest {latest_km} km"
    ))]
    OdometerRollback {
        /// Passport being appended to.
        passport_id: PassportId,
        /// Current watermark.
        latest_km: u64,
        /// Rejected reading.
        attempted_km: u64,
    },

    /// Model year is zero or negative.
    #[snafu(display("invalid year {year}: must be positive"))]
    InvalidYear {
        /// Rejected year.
        year: i32,
    },

    /// Intervention timestamp is zero or negative.
    #[snafu(display("invalid timestamp {recorded_at_ms}: must be positive"))]
    InvalidTimestamp {
        /// Rejected timestamp in milliseconds.
        recorded_at_ms: i64,
    },

    /// A field exceeds its configured size limit.
    #[snafu(display("Invalid argument: {source}"))]
    InvalidArgument {
        /// Which field and which limit.
        source: ValidationError,
    },

    /// Address already has a directory entry and duplicates are rejected.
    #[snafu(display("workshop {workshop} is already registered"))]
    WorkshopAlreadyRegistered {
        /// Address that tried to register again.
        workshop: Address,
    },

    /// VIN already has a passport and duplicates are rejected.
    #[snafu(display("VIN {vin} already has passport {existing}"))]
    DuplicateVin {
        /// Rejected VIN.
        vin: String,
        /// Passport already holding the VIN.
        existing: PassportId,
    },

    /// No directory entry for the address.
    #[snafu(display("workshop {workshop} not found"))]
    WorkshopNotFound {
        /// Address looked up.
        workshop: Address,
    },

    /// No passport with the id.
    #[snafu(display("{passport_id} not found"))]
    PassportNotFound {
        /// Id looked up.
        passport_id: PassportId,
    },

    /// Presented version is stale.
    #[snafu(display("version conflict on {object}: presented {presented}, current {current}"))]
    VersionConflict {
        /// `registry` or the passport id.
        object: String,
        /// Version the caller presented.
        presented: Version,
        /// Version currently committed.
        current: Version,
    },

    /// Snapshot failed invariant verification.
    #[snafu(display("Invalid snapshot: {message}"))]
    SnapshotInvalid {
        /// Which invariant failed.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[snafu(display("Codec error at {location}: {source}"))]
    Codec {
        /// Underlying codec error.
        source: CodecError,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Filesystem I/O failed.
    #[snafu(display("I/O error on {path} at {location}: {source}"))]
    Io {
        /// Underlying I/O error.
        source: std::io::Error,
        /// File being accessed.
        path: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Configuration is invalid.
    #[snafu(display("Configuration error: {source}"))]
    Config {
        /// Underlying configuration error.
        source: ConfigError,
    },

    /// A version or event sequence counter cannot advance.
    ///
    /// Raised before any write, so the rejected operation leaves no trace.
    #[snafu(display("{counter} is exhausted"))]
    CounterExhausted {
        /// `registry version`, `<passport> version`, or `event sequence`.
        counter: String,
    },
}

impl LedgerError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotAdmin { .. } => ErrorCode::AuthNotAdmin,
            Self::UnauthorizedSender { .. } => ErrorCode::AuthUnauthorizedSender,
            Self::WorkshopNotActive { .. } => ErrorCode::AuthWorkshopNotActive,
            Self::OdometerRollback { .. } => ErrorCode::DomainOdometerRollback,
            Self::InvalidYear { .. } => ErrorCode::DomainInvalidYear,
            Self::InvalidTimestamp { .. } => ErrorCode::DomainInvalidTimestamp,
            Self::InvalidArgument { .. } => ErrorCode::DomainInvalidArgument,
            Self::WorkshopAlreadyRegistered { .. } => ErrorCode::DomainWorkshopAlreadyRegistered,
            Self::DuplicateVin { .. } => ErrorCode::DomainDuplicateVin,
            Self::WorkshopNotFound { .. } => ErrorCode::LookupWorkshopNotFound,
            Self::PassportNotFound { .. } => ErrorCode::LookupPassportNotFound,
            Self::VersionConflict { .. } => ErrorCode::ConcurrencyVersionConflict,
            Self::SnapshotInvalid { .. } => ErrorCode::InfraSnapshotInvalid,
            Self::Codec { .. } => ErrorCode::InfraCodec,
            Self::Io { .. } => ErrorCode::InfraIo,
            Self::Config { .. } => ErrorCode::InfraConfig,
            Self::CounterExhausted { .. } => ErrorCode::InfraCounterExhausted,
        }
    }

    /// Whether this error is retryable.
    ///
    /// Delegates to [`ErrorCode::is_retryable`].
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Suggested recovery action for this error.
    ///
    /// Delegates to [`ErrorCode::suggested_action`].
    #[must_use]
    pub const fn suggested_action(&self) -> &'static str {
        self.code().suggested_action()
    }
}

impl From<ValidationError> for LedgerError {
    fn from(source: ValidationError) -> Self {
        LedgerError::InvalidArgument { source }
    }
}

impl From<ConfigError> for LedgerError {
    fn from(source: ConfigError) -> Self {
        LedgerError::Config { source }
    }
}

impl From<CodecError> for LedgerError {
    #[track_caller]
    fn from(source: CodecError) -> Self {
        let loc = std::panic::Location::caller();
        LedgerError::Codec {
            source,
            location: snafu::Location::new(loc.file(), loc.line(), loc.column()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn test_error_codes_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.as_u16()), "duplicate code {code:?}");
        }
    }

    #[test]
    fn test_error_code_u16_roundtrip() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_u16(code.as_u16()), Some(*code));
        }
        assert_eq!(ErrorCode::from_u16(0), None);
        assert_eq!(ErrorCode::from_u16(9999), None);
    }

    #[test]
    fn test_error_code_ranges() {
        let ranges = [
            (ErrorCode::AuthNotAdmin, 1000..1100),
            (ErrorCode::AuthWorkshopNotActive, 1000..1100),
            (ErrorCode::DomainOdometerRollback, 2000..2100),
            (ErrorCode::DomainDuplicateVin, 2000..2100),
            (ErrorCode::LookupPassportNotFound, 3000..3100),
            (ErrorCode::ConcurrencyVersionConflict, 3100..3200),
            (ErrorCode::InfraConfig, 3200..3300),
            (ErrorCode::InfraCounterExhausted, 3200..3300),
        ];
        for (code, range) in ranges {
            assert!(range.contains(&code.as_u16()), "{code:?} outside {range:?}");
        }
    }

    #[test]
    fn test_retryable_codes() {
        let retryable: Vec<_> = ErrorCode::ALL.iter().filter(|c| c.is_retryable()).collect();
        assert_eq!(
            retryable,
            vec![&ErrorCode::ConcurrencyVersionConflict, &ErrorCode::InfraIo]
        );
    }

    #[test]
    fn test_suggested_action_non_empty() {
        for code in ErrorCode::ALL {
            assert!(!code.suggested_action().is_empty(), "{code:?} has empty suggested_action");
        }
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::DomainOdometerRollback.to_string(), "2000");
    }

    #[test]
    fn test_odometer_rollback_display() {
        let err = LedgerError::OdometerRollback {
            passport_id: PassportId::new(1),
            latest_km: 15_000,
            attempted_km: 14_000,
        };
        assert_eq!(
            err.to_string(),
            "odometer rollback on passport:1: 14000 km is below latest 15000 km"
        );
        assert_eq!(err.code(), ErrorCode::DomainOdometerRollback);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unauthorized_sender_display() {
        let err = LedgerError::UnauthorizedSender {
            operation: "register_workshop",
            caller: addr("0xbb"),
            expected: addr("0xaa"),
        };
        assert_eq!(
            err.to_string(),
            "register_workshop: sender 0xbb does not match required identity 0xaa"
        );
        assert_eq!(err.code(), ErrorCode::AuthUnauthorizedSender);
    }

    #[test]
    fn test_version_conflict_is_retryable() {
        let err = LedgerError::VersionConflict {
            object: "registry".to_string(),
            presented: Version::new(1),
            current: Version::new(2),
        };
        assert!(err.is_retryable());
        assert_eq!(err.suggested_action(), ErrorCode::ConcurrencyVersionConflict.suggested_action());
        assert_eq!(err.to_string(), "version conflict on registry: presented v:1, current v:2");
    }

    #[test]
    fn test_counter_exhausted_is_terminal() {
        let err = LedgerError::CounterExhausted { counter: "event sequence".to_string() };
        assert_eq!(err.code(), ErrorCode::InfraCounterExhausted);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "event sequence is exhausted");
    }

    #[test]
    fn test_validation_error_converts_to_invalid_argument() {
        let err: LedgerError = ValidationError::new("vin", "too long").into();
        assert_eq!(err.code(), ErrorCode::DomainInvalidArgument);
        assert_eq!(err.to_string(), "Invalid argument: vin: too long");
    }

    #[test]
    fn test_config_error_converts() {
        let err: LedgerError = ConfigError::Validation { message: "bad".to_string() }.into();
        assert_eq!(err.code(), ErrorCode::InfraConfig);
    }

    #[test]
    fn test_all_variants_have_codes() {
        let variants: Vec<LedgerError> = vec![
            LedgerError::NotAdmin { caller: addr("0x1") },
            LedgerError::UnauthorizedSender {
                operation: "x",
                caller: addr("0x1"),
                expected: addr("0x2"),
            },
            LedgerError::WorkshopNotActive { caller: addr("0x1") },
            LedgerError::OdometerRollback {
                passport_id: PassportId::new(1),
                latest_km: 1,
                attempted_km: 0,
            },
            LedgerError::InvalidYear { year: 0 },
            LedgerError::InvalidTimestamp { recorded_at_ms: 0 },
            LedgerError::InvalidArgument { source: ValidationError::new("f", "c") },
            LedgerError::WorkshopAlreadyRegistered { workshop: addr("0x1") },
            LedgerError::DuplicateVin { vin: String::new(), existing: PassportId::new(1) },
            LedgerError::WorkshopNotFound { workshop: addr("0x1") },
            LedgerError::PassportNotFound { passport_id: PassportId::new(1) },
            LedgerError::VersionConflict {
                object: String::new(),
                presented: Version::new(1),
                current: Version::new(2),
            },
            LedgerError::SnapshotInvalid { message: String::new() },
            LedgerError::Io {
                source: std::io::Error::other("test"),
                path: String::new(),
                location: snafu::Location::new("", 0, 0),
            },
            LedgerError::Config { source: ConfigError::Validation { message: String::new() } },
            LedgerError::CounterExhausted { counter: String::new() },
        ];
        let codes: std::collections::HashSet<_> = variants.iter().map(LedgerError::code).collect();
        // Codec is the only variant not constructed above
        assert_eq!(codes.len(), ErrorCode::ALL.len() - 1);
    }
}
