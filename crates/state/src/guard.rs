//! Authorization guard.
//!
//! | Operation              | Required caller                     |
//! |------------------------|-------------------------------------|
//! | `register_workshop`    | the workshop address being registered |
//! | `set_workshop_status`  | the registry admin                  |
//! | `mint_passport`        | the declared owner                  |
//! | `record_intervention`  | an active workshop                  |
//! | `transfer_passport`    | the current holder (owner)          |
//!
//! The caller is always the host-authenticated sender, never an argument.

use passport_ledger_types::{Address, AuthenticatedCaller, LedgerError, Result, VehiclePassport};

use crate::registry::Registry;

/// Requires the caller to act for itself.
pub fn require_self(
    caller: &AuthenticatedCaller,
    subject: &Address,
    operation: &'static str,
) -> Result<()> {
    if caller.address() == subject {
        return Ok(());
    }
    tracing::debug!(operation, caller = %caller, expected = %subject, "sender mismatch");
    Err(LedgerError::UnauthorizedSender {
        operation,
        caller: caller.address().clone(),
        expected: subject.clone(),
    })
}

/// Requires the caller to be the registry admin.
pub fn require_admin(caller: &AuthenticatedCaller, registry: &Registry) -> Result<()> {
    if caller.address() == registry.admin() {
        return Ok(());
    }
    tracing::debug!(operation = "set_workshop_status", caller = %caller, "caller is not admin");
    Err(LedgerError::NotAdmin { caller: caller.address().clone() })
}

/// Requires the caller to be a registered workshop whose entry is active.
pub fn require_active_workshop(caller: &AuthenticatedCaller, registry: &Registry) -> Result<()> {
    if registry.is_workshop_active(caller.address()) {
        return Ok(());
    }
    tracing::debug!(operation = "record_intervention", caller = %caller, "workshop not active");
    Err(LedgerError::WorkshopNotActive { caller: caller.address().clone() })
}

/// Requires the caller to currently hold the passport.
pub fn require_holder(caller: &AuthenticatedCaller, passport: &VehiclePassport) -> Result<()> {
    if caller.address() == &passport.owner {
        return Ok(());
    }
    tracing::debug!(
        operation = "transfer_passport",
        passport = %passport.id,
        caller = %caller,
        "caller does not hold passport"
    );
    Err(LedgerError::UnauthorizedSender {
        operation: "transfer_passport",
        caller: caller.address().clone(),
        expected: passport.owner.clone(),
    })
}
