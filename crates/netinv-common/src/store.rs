//! The boundary to the inventory persistence backend.
//!
//! The platform owns persistence; sync daemons consume this narrow surface
//! and nothing else. Implementations are expected to be remote and fallible;
//! callers decide per call whether a failure is fatal or reportable.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::object::{AttrMap, InventoryObject, InventoryRef};

/// Synchronous-in-spirit store operations consumed by the sync daemons.
///
/// Calls are awaited strictly one at a time; the trait being async only
/// reflects that the backend sits across a connection.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Ordinary (containment) children of an object.
    async fn children_of(&self, class: &str, id: &str) -> StoreResult<Vec<InventoryRef>>;

    /// Special (logical) children of an object: endpoints attached outside
    /// the containment tree, e.g. tunnels and loopbacks under a device.
    async fn special_children_of(&self, class: &str, id: &str) -> StoreResult<Vec<InventoryRef>>;

    /// The containment parent of an object.
    async fn parent_of(&self, class: &str, id: &str) -> StoreResult<InventoryRef>;

    /// The full object, attributes included.
    async fn object(&self, class: &str, id: &str) -> StoreResult<InventoryObject>;

    /// Creates an object under a containment parent; returns the new id.
    async fn create_object(
        &self,
        class: &str,
        parent_class: &str,
        parent_id: &str,
        attributes: &AttrMap,
    ) -> StoreResult<String>;

    /// Creates an object attached as a special child; returns the new id.
    async fn create_special_object(
        &self,
        class: &str,
        parent_class: &str,
        parent_id: &str,
        attributes: &AttrMap,
    ) -> StoreResult<String>;

    /// Applies an attribute delta to an object.
    async fn update_object(&self, class: &str, id: &str, delta: &AttrMap) -> StoreResult<()>;

    /// Moves an object (subtree included) under a new containment parent.
    async fn move_object(
        &self,
        new_parent_class: &str,
        new_parent_id: &str,
        class: &str,
        id: &str,
    ) -> StoreResult<()>;

    /// Deletes an object and its subtree.
    async fn delete_object(&self, class: &str, id: &str) -> StoreResult<()>;

    /// Creates a named, non-hierarchical relationship between two objects.
    async fn create_special_relationship(
        &self,
        a_class: &str,
        a_id: &str,
        b_class: &str,
        b_id: &str,
        name: &str,
    ) -> StoreResult<()>;

    /// Objects related to the given one under a relationship name.
    async fn special_attribute(
        &self,
        class: &str,
        id: &str,
        name: &str,
    ) -> StoreResult<Vec<InventoryRef>>;

    /// All items of a catalog (list-type) class.
    async fn list_type_items(&self, class: &str) -> StoreResult<Vec<InventoryRef>>;

    /// Creates a catalog item; returns the new id. Catalogs only ever grow.
    async fn create_list_type_item(&self, class: &str, name: &str) -> StoreResult<String>;

    /// Child classes currently declared legal under a parent class.
    async fn possible_children(&self, class: &str) -> StoreResult<Vec<String>>;

    /// Declares additional legal child classes under a parent class.
    async fn add_possible_children(&self, class: &str, children: &[String]) -> StoreResult<()>;

    /// All service-catalog entities a discovered alias may refer to.
    async fn services(&self) -> StoreResult<Vec<InventoryRef>>;
}
