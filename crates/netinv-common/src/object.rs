//! The inventory object model.
//!
//! Mirrors what the platform persists: a containment tree of named, classed
//! objects with a free-form attribute map. `InventoryRef` is the cheap handle
//! used for navigation; `InventoryObject` carries the full attribute map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map of a persisted object.
///
/// Ordered so that diffs and findings render deterministically.
pub type AttrMap = BTreeMap<String, String>;

/// A lightweight handle to a persisted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRef {
    /// Store-assigned identifier, stable across runs.
    pub id: String,
    /// Inventory class name, e.g. `"Slot"`.
    pub class: String,
    /// Display name.
    pub name: String,
}

impl InventoryRef {
    pub fn new(id: impl Into<String>, class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for InventoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.class)
    }
}

/// A persisted object with its full attribute map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryObject {
    pub id: String,
    pub class: String,
    pub name: String,
    pub attributes: AttrMap,
}

impl InventoryObject {
    pub fn new(
        id: impl Into<String>,
        class: impl Into<String>,
        name: impl Into<String>,
        attributes: AttrMap,
    ) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            name: name.into(),
            attributes,
        }
    }

    /// The lightweight handle for this object.
    pub fn to_ref(&self) -> InventoryRef {
        InventoryRef::new(self.id.clone(), self.class.clone(), self.name.clone())
    }
}

impl fmt::Display for InventoryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.class)
    }
}

/// Computes the minimal attribute delta between a persisted object and a
/// freshly discovered one.
///
/// A key lands in the delta when it is new, or when its value differs from
/// the stored one. Keys present only on the stored side are left alone: the
/// discovery source is not authoritative for attributes it does not report.
pub fn compare_attributes(current: &AttrMap, incoming: &AttrMap) -> AttrMap {
    let mut delta = AttrMap::new();
    for (key, incoming_value) in incoming {
        match current.get(key) {
            Some(current_value) if current_value == incoming_value => {}
            _ => {
                delta.insert(key.clone(), incoming_value.clone());
            }
        }
    }
    delta
}
