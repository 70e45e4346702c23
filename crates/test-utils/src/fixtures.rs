//! Ready-made ledgers for tests.

// Fixtures are expected to panic on setup failure.
#![allow(clippy::expect_used)]

use passport_ledger_state::{Ledger, Receipt};
use passport_ledger_types::{
    Address, AuthenticatedCaller, NewIntervention, NewPassport, ObjectRef, PassportId, Result,
    config::LedgerConfig,
};

/// Registry admin used by fixtures.
pub const ADMIN: &str = "0xad";
/// Workshop registered by [`LedgerFixture`].
pub const WORKSHOP: &str = "0xaa";
/// Owner of the fixture passport.
pub const OWNER: &str = "0xbb";

/// Parses `address` into an [`AuthenticatedCaller`].
///
/// # Panics
///
/// Panics if `address` is not a valid address.
pub fn caller(address: &str) -> AuthenticatedCaller {
    AuthenticatedCaller::new(addr(address))
}

/// Parses `address`.
///
/// # Panics
///
/// Panics if `address` is not a valid address.
pub fn addr(address: &str) -> Address {
    Address::parse(address).expect("fixture address")
}

/// An oil change at `odometer_km` with fixed evidence fields.
pub fn service(odometer_km: u64) -> NewIntervention {
    NewIntervention::builder()
        .odometer_km(odometer_km)
        .work_type("oil_change")
        .notes_hash("0xhash")
        .evidence_uri("ipfs://bafy")
        .workshop_signature("0xsig")
        .recorded_at_ms(1_700_000_000_000)
        .build()
}

/// The `VIN123` Acme Z1 (2020) owned by `owner`.
pub fn vehicle(owner: &Address) -> NewPassport {
    NewPassport::builder()
        .vin("VIN123")
        .make("Acme")
        .model("Z1")
        .year(2020)
        .owner(owner.clone())
        .build()
}

/// A ledger bootstrapped by [`ADMIN`], with [`WORKSHOP`] registered and one
/// passport minted by [`OWNER`].
pub struct LedgerFixture {
    /// The ledger under test.
    pub ledger: Ledger,
    /// The fixture passport.
    pub passport: PassportId,
}

impl LedgerFixture {
    /// Builds the fixture with default configuration.
    ///
    /// # Panics
    ///
    /// Panics if any setup step fails.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Builds the fixture with `config`.
    ///
    /// # Panics
    ///
    /// Panics if any setup step fails.
    pub fn with_config(config: LedgerConfig) -> Self {
        let ledger =
            Ledger::builder().admin(caller(ADMIN)).config(config).build().expect("bootstrap");
        let workshop = caller(WORKSHOP);
        ledger
            .register_workshop(
                &workshop,
                ledger.registry_version(),
                workshop.address(),
                "did:web:workshop.example",
                "z6MkWorkshopKey",
            )
            .expect("register workshop");
        let receipt = ledger
            .mint_passport(&caller(OWNER), ledger.registry_version(), vehicle(&addr(OWNER)))
            .expect("mint passport");
        let passport = receipt.passport.expect("mint returns a passport ref").id;
        Self { ledger, passport }
    }

    /// Current reference for the fixture passport.
    ///
    /// # Panics
    ///
    /// Panics if the passport no longer exists.
    pub fn passport_ref(&self) -> ObjectRef {
        self.ledger.passport(self.passport).expect("fixture passport").object_ref()
    }

    /// Records an oil change at `odometer_km` as `workshop` against the current version.
    pub fn record_as(&self, workshop: &str, odometer_km: u64) -> Result<Receipt> {
        self.ledger.record_intervention(&caller(workshop), self.passport_ref(), service(odometer_km))
    }

    /// Records an oil change at `odometer_km` as [`WORKSHOP`].
    pub fn record(&self, odometer_km: u64) -> Result<Receipt> {
        self.record_as(WORKSHOP, odometer_km)
    }

    /// Activates or deactivates [`WORKSHOP`] as [`ADMIN`].
    pub fn set_workshop_active(&self, active: bool) -> Result<Receipt> {
        self.ledger.set_workshop_status(
            &caller(ADMIN),
            self.ledger.registry_version(),
            &addr(WORKSHOP),
            active,
        )
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}
