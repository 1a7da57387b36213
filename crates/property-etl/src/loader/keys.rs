//! Natural-to-surrogate key indexes built during the load.

use std::collections::HashMap;

/// `Address` to the `Address_ID` generated for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressIndex(HashMap<String, i64>);

impl AddressIndex {
    pub fn insert(&mut self, address: impl Into<String>, address_id: i64) {
        self.0.insert(address.into(), address_id);
    }

    pub fn get(&self, address: &str) -> Option<i64> {
        self.0.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `Address_ID` to the `Property_ID` generated for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyIndex(HashMap<i64, i64>);

impl PropertyIndex {
    pub fn insert(&mut self, address_id: i64, property_id: i64) {
        self.0.insert(address_id, property_id);
    }

    pub fn get(&self, address_id: i64) -> Option<i64> {
        self.0.get(&address_id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of looking up a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResolution {
    Resolved(i64),
    /// The address has no `Address_ID`
    UnknownAddress,
    /// The `Address_ID` has no `Property_ID`
    UnknownAddressId(i64),
}

impl KeyResolution {
    pub fn id(self) -> Option<i64> {
        match self {
            KeyResolution::Resolved(id) => Some(id),
            _ => None,
        }
    }
}

/// Looks keys up through the indexes of the stages that succeeded.
///
/// A missing index is the mark of a failed stage; every lookup through it misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyResolver<'a> {
    addresses: Option<&'a AddressIndex>,
    properties: Option<&'a PropertyIndex>,
}

impl<'a> KeyResolver<'a> {
    pub fn new(addresses: Option<&'a AddressIndex>, properties: Option<&'a PropertyIndex>) -> Self {
        Self {
            addresses,
            properties,
        }
    }

    /// `Address -> Address_ID`
    pub fn address_id(&self, address: &str) -> KeyResolution {
        match self.addresses.and_then(|index| index.get(address)) {
            Some(id) => KeyResolution::Resolved(id),
            None => KeyResolution::UnknownAddress,
        }
    }

    /// `Address -> Address_ID -> Property_ID`
    pub fn property_id(&self, address: &str) -> KeyResolution {
        let address_id = match self.address_id(address) {
            KeyResolution::Resolved(id) => id,
            other => return other,
        };
        match self.properties.and_then(|index| index.get(address_id)) {
            Some(id) => KeyResolution::Resolved(id),
            None => KeyResolution::UnknownAddressId(address_id),
        }
    }
}
