//! Identity directory: the registry singleton.
//!
//! Holds the permanent admin, the ordered list of workshop entries, and the
//! passport counter. Entries are never removed. Duplicate registrations are
//! kept in order and lookups resolve to the first entry for an address.

use std::collections::HashMap;

use passport_ledger_types::{
    Address, LedgerError, PassportId, Result, Version, WorkshopIdentity,
    config::DuplicateWorkshopPolicy,
};
use serde::{Deserialize, Serialize};

/// The registry singleton.
///
/// `index` and `vins` are derived from `workshops` and the passport store;
/// they are not serialized and are rebuilt on restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    admin: Address,
    pub(crate) version: Version,
    workshops: Vec<WorkshopIdentity>,
    passport_counter: u64,
    #[serde(skip)]
    index: HashMap<Address, usize>,
    #[serde(skip)]
    vins: HashMap<String, PassportId>,
}

impl Registry {
    /// Creates an empty registry owned by `admin` at [`Version::INITIAL`].
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            version: Version::INITIAL,
            workshops: Vec::new(),
            passport_counter: 0,
            index: HashMap::new(),
            vins: HashMap::new(),
        }
    }

    /// Permanent registry admin.
    pub fn admin(&self) -> &Address {
        &self.admin
    }

    /// Current optimistic concurrency version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Number of passports minted so far.
    pub fn passport_counter(&self) -> u64 {
        self.passport_counter
    }

    /// Number of directory entries, duplicates included.
    pub fn workshop_count(&self) -> u64 {
        self.workshops.len() as u64
    }

    /// All entries in registration order.
    pub fn workshops(&self) -> &[WorkshopIdentity] {
        &self.workshops
    }

    /// First entry registered for `address`.
    pub fn workshop(&self, address: &Address) -> Option<&WorkshopIdentity> {
        self.index.get(address).and_then(|&i| self.workshops.get(i))
    }

    /// Whether `address` is a registered workshop whose first entry is active.
    pub fn is_workshop_active(&self, address: &Address) -> bool {
        self.workshop(address).is_some_and(|w| w.active)
    }

    /// Passport already minted for `vin`, if any.
    pub fn passport_for_vin(&self, vin: &str) -> Option<PassportId> {
        self.vins.get(vin).copied()
    }

    /// Fails if registering `address` again is not allowed under `policy`.
    pub(crate) fn check_registration(
        &self,
        address: &Address,
        policy: DuplicateWorkshopPolicy,
    ) -> Result<()> {
        if policy == DuplicateWorkshopPolicy::Reject && self.index.contains_key(address) {
            return Err(LedgerError::WorkshopAlreadyRegistered { workshop: address.clone() });
        }
        Ok(())
    }

    /// Appends an active entry. Callers run [`Self::check_registration`] first.
    ///
    /// Fails with `CounterExhausted`, leaving the registry untouched, when the
    /// version cannot advance.
    pub(crate) fn register_workshop(&mut self, identity: WorkshopIdentity) -> Result<()> {
        let version = self.next_version()?;
        let position = self.workshops.len();
        self.index.entry(identity.address.clone()).or_insert(position);
        self.workshops.push(identity);
        self.version = version;
        Ok(())
    }

    /// Fails with `WorkshopNotFound` if `address` has no entry.
    pub(crate) fn check_workshop_exists(&self, address: &Address) -> Result<()> {
        if self.index.contains_key(address) {
            Ok(())
        } else {
            Err(LedgerError::WorkshopNotFound { workshop: address.clone() })
        }
    }

    /// Sets `active` on the first entry for `address`.
    pub(crate) fn set_workshop_status(&mut self, address: &Address, active: bool) -> Result<()> {
        let position = *self
            .index
            .get(address)
            .ok_or_else(|| LedgerError::WorkshopNotFound { workshop: address.clone() })?;
        let version = self.next_version()?;
        if let Some(entry) = self.workshops.get_mut(position) {
            entry.active = active;
        }
        self.version = version;
        Ok(())
    }

    /// Allocates the next passport id and records its VIN.
    pub(crate) fn allocate_passport(&mut self, vin: &str) -> Result<PassportId> {
        let version = self.next_version()?;
        let counter = self.passport_counter.checked_add(1).ok_or_else(|| {
            LedgerError::CounterExhausted { counter: "passport counter".to_string() }
        })?;
        self.passport_counter = counter;
        let id = PassportId::new(counter);
        self.vins.entry(vin.to_string()).or_insert(id);
        self.version = version;
        Ok(id)
    }

    /// Rebuilds the address index from the entry list.
    pub(crate) fn rebuild_index(&mut self) {
        self.index.clear();
        for (position, entry) in self.workshops.iter().enumerate() {
            self.index.entry(entry.address.clone()).or_insert(position);
        }
    }

    /// Records `vin` for `id` unless an earlier passport already holds it.
    pub(crate) fn index_vin(&mut self, vin: &str, id: PassportId) {
        let slot = self.vins.entry(vin.to_string()).or_insert(id);
        if id < *slot {
            *slot = id;
        }
    }

    fn next_version(&self) -> Result<Version> {
        self.version.next().ok_or_else(|| LedgerError::CounterExhausted {
            counter: "registry version".to_string(),
        })
    }
}
