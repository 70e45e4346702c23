//! Input validation for operation fields.
//!
//! The ledger never interprets VINs, DIDs, hashes, URIs, or signatures. It
//! only bounds their size so one record cannot grow without limit. Limits
//! come from [`FieldLimits`].

use std::fmt;

use crate::{
    config::FieldLimits,
    types::{NewIntervention, NewPassport},
};

/// Validation error with structured context.
///
/// Contains the specific constraint that was violated and the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl ValidationError {
    /// Creates a validation error for `field`.
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self { field: field.into(), constraint: constraint.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Checks that `value` is at most `max_bytes` long in UTF-8.
///
/// # Errors
///
/// Returns [`ValidationError`] naming `field` if the value is too long.
pub fn validate_text(field: &str, value: &str, max_bytes: usize) -> Result<(), ValidationError> {
    if value.len() > max_bytes {
        return Err(ValidationError::new(
            field,
            format!("length {} bytes exceeds maximum {} bytes", value.len(), max_bytes),
        ));
    }
    Ok(())
}

/// Validates the text fields of a workshop registration.
///
/// # Errors
///
/// Returns [`ValidationError`] for the first field over its limit.
pub fn validate_workshop_fields(
    did: &str,
    public_key_multibase: &str,
    limits: &FieldLimits,
) -> Result<(), ValidationError> {
    validate_text("did", did, limits.max_did_bytes)?;
    validate_text("public_key_multibase", public_key_multibase, limits.max_public_key_bytes)
}

/// Validates the text fields of a new passport.
///
/// # Errors
///
/// Returns [`ValidationError`] for the first field over its limit.
pub fn validate_passport_fields(
    input: &NewPassport,
    limits: &FieldLimits,
) -> Result<(), ValidationError> {
    validate_text("vin", &input.vin, limits.max_vin_bytes)?;
    validate_text("make", &input.make, limits.max_label_bytes)?;
    validate_text("model", &input.model, limits.max_label_bytes)
}

/// Validates the text fields of a new intervention.
///
/// # Errors
///
/// Returns [`ValidationError`] for the first field over its limit.
pub fn validate_intervention_fields(
    input: &NewIntervention,
    limits: &FieldLimits,
) -> Result<(), ValidationError> {
    validate_text("work_type", &input.work_type, limits.max_label_bytes)?;
    validate_text("notes_hash", &input.notes_hash, limits.max_hash_bytes)?;
    validate_text("evidence_uri", &input.evidence_uri, limits.max_uri_bytes)?;
    validate_text("workshop_signature", &input.workshop_signature, limits.max_signature_bytes)
}
