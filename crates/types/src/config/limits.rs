//! Size limits for free-form text fields.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Smallest allowed value for any field limit.
const MIN_FIELD_LIMIT: usize = 1;

/// Largest allowed value for any field limit (64 KiB).
const MAX_FIELD_LIMIT: usize = 64 * 1024;

const fn default_max_vin_bytes() -> usize {
    64
}

const fn default_max_label_bytes() -> usize {
    128
}

const fn default_max_did_bytes() -> usize {
    256
}

const fn default_max_public_key_bytes() -> usize {
    256
}

const fn default_max_hash_bytes() -> usize {
    256
}

const fn default_max_uri_bytes() -> usize {
    2048
}

const fn default_max_signature_bytes() -> usize {
    1024
}

/// Maximum UTF-8 byte length of each text field.
///
/// # Validation Rules
///
/// Every limit must be in `1..=65_536`.
///
/// # Example
///
/// ```no_run
/// # use passport_ledger_types::config::FieldLimits;
/// let limits = FieldLimits::builder()
///     .max_vin_bytes(17)
///     .build()
///     .expect("valid field limits");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldLimits {
    /// Vehicle identification number. Default: 64.
    #[serde(default = "default_max_vin_bytes")]
    pub max_vin_bytes: usize,
    /// Make, model, and work type. Default: 128.
    #[serde(default = "default_max_label_bytes")]
    pub max_label_bytes: usize,
    /// Workshop DID. Default: 256.
    #[serde(default = "default_max_did_bytes")]
    pub max_did_bytes: usize,
    /// Multibase public key. Default: 256.
    #[serde(default = "default_max_public_key_bytes")]
    pub max_public_key_bytes: usize,
    /// Evidence notes hash. Default: 256.
    #[serde(default = "default_max_hash_bytes")]
    pub max_hash_bytes: usize,
    /// Evidence URI. Default: 2048.
    #[serde(default = "default_max_uri_bytes")]
    pub max_uri_bytes: usize,
    /// Workshop signature. Default: 1024.
    #[serde(default = "default_max_signature_bytes")]
    pub max_signature_bytes: usize,
}

#[bon::bon]
impl FieldLimits {
    /// Creates field limits with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any limit is outside `1..=65_536`.
    #[builder]
    pub fn new(
        #[builder(default = default_max_vin_bytes())] max_vin_bytes: usize,
        #[builder(default = default_max_label_bytes())] max_label_bytes: usize,
        #[builder(default = default_max_did_bytes())] max_did_bytes: usize,
        #[builder(default = default_max_public_key_bytes())] max_public_key_bytes: usize,
        #[builder(default = default_max_hash_bytes())] max_hash_bytes: usize,
        #[builder(default = default_max_uri_bytes())] max_uri_bytes: usize,
        #[builder(default = default_max_signature_bytes())] max_signature_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let limits = Self {
            max_vin_bytes,
            max_label_bytes,
            max_did_bytes,
            max_public_key_bytes,
            max_hash_bytes,
            max_uri_bytes,
            max_signature_bytes,
        };
        limits.validate()?;
        Ok(limits)
    }
}

impl FieldLimits {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first limit out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("max_vin_bytes", self.max_vin_bytes),
            ("max_label_bytes", self.max_label_bytes),
            ("max_did_bytes", self.max_did_bytes),
            ("max_public_key_bytes", self.max_public_key_bytes),
            ("max_hash_bytes", self.max_hash_bytes),
            ("max_uri_bytes", self.max_uri_bytes),
            ("max_signature_bytes", self.max_signature_bytes),
        ];
        for (name, value) in fields {
            if !(MIN_FIELD_LIMIT..=MAX_FIELD_LIMIT).contains(&value) {
                return Err(ConfigError::Validation {
                    message: format!(
                        "{name} must be {MIN_FIELD_LIMIT}..={MAX_FIELD_LIMIT}, got {value}"
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            max_vin_bytes: default_max_vin_bytes(),
            max_label_bytes: default_max_label_bytes(),
            max_did_bytes: default_max_did_bytes(),
            max_public_key_bytes: default_max_public_key_bytes(),
            max_hash_bytes: default_max_hash_bytes(),
            max_uri_bytes: default_max_uri_bytes(),
            max_signature_bytes: default_max_signature_bytes(),
        }
    }
}
