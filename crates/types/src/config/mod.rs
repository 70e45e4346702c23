//! Configuration types for the passport ledger.
//!
//! Configuration is loaded from TOML files. All config structs validate
//! their values at construction time via fallible builders. Post-deserialization
//! validation is available via the `validate()` method on each struct.

mod events;
mod limits;
mod policy;

pub use events::*;
pub use limits::*;
pub use policy::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Configuration validation error.
///
/// Returned when a configuration value is outside its valid range or
/// violates a cross-field constraint.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// Top-level ledger configuration.
///
/// Every section has defaults, so an empty TOML document is a valid config.
///
/// # Example
///
/// ```no_run
/// # use passport_ledger_types::config::{LedgerConfig, MintPolicy};
/// let config = LedgerConfig::builder()
///     .mint(MintPolicy { reject_duplicate_vins: true })
///     .build()
///     .expect("valid ledger config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct LedgerConfig {
    /// Size limits for free-form text fields.
    #[serde(default)]
    pub limits: FieldLimits,
    /// Workshop registration rules.
    #[serde(default)]
    pub registration: RegistrationPolicy,
    /// Passport minting rules.
    #[serde(default)]
    pub mint: MintPolicy,
    /// In-memory event log settings.
    #[serde(default)]
    pub events: EventLogConfig,
}

#[bon::bon]
impl LedgerConfig {
    /// Creates a new ledger configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any section is invalid.
    #[builder]
    pub fn new(
        #[builder(default)] limits: FieldLimits,
        #[builder(default)] registration: RegistrationPolicy,
        #[builder(default)] mint: MintPolicy,
        #[builder(default)] events: EventLogConfig,
    ) -> Result<Self, ConfigError> {
        let config = Self { limits, registration, mint, events };
        config.validate()?;
        Ok(config)
    }
}

impl LedgerConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Validation`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        self.events.validate()
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the document does not parse
    /// or a value is out of range.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ConfigError::Validation { message: format!("malformed TOML: {e}") })?;
        config.validate()?;
        Ok(config)
    }
}
