//! In-memory reference implementation of [`InventoryStore`].
//!
//! Used by the integration tests and the demo binaries. Semantics follow the
//! platform store: exclusive containment parents, optional special (logical)
//! attachment, cascading subtree deletes, monotonic catalogs.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::classes;
use crate::error::{StoreError, StoreResult};
use crate::object::{AttrMap, InventoryObject, InventoryRef};
use crate::store::InventoryStore;

#[derive(Debug, Clone)]
struct StoredObject {
    id: String,
    class: String,
    parent: Option<String>,
    special: bool,
    attributes: AttrMap,
}

impl StoredObject {
    fn name(&self) -> String {
        self.attributes
            .get(classes::attrs::NAME)
            .cloned()
            .unwrap_or_default()
    }

    fn to_ref(&self) -> InventoryRef {
        InventoryRef::new(self.id.clone(), self.class.clone(), self.name())
    }

    fn to_object(&self) -> InventoryObject {
        InventoryObject::new(
            self.id.clone(),
            self.class.clone(),
            self.name(),
            self.attributes.clone(),
        )
    }
}

#[derive(Debug, Clone)]
struct Relationship {
    a_id: String,
    b_id: String,
    name: String,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    objects: HashMap<String, StoredObject>,
    // insertion order preserved so listings are deterministic
    order: Vec<String>,
    relationships: Vec<Relationship>,
    list_types: HashMap<String, Vec<(String, String)>>,
    possible_children: HashMap<String, BTreeSet<String>>,
    services: Vec<InventoryRef>,
}

impl State {
    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("oid-{}", self.next_id)
    }

    fn get(&self, id: &str) -> StoreResult<&StoredObject> {
        self.objects
            .get(id)
            .ok_or_else(|| StoreError::ObjectNotFound {
                class: String::new(),
                id: id.to_string(),
            })
    }

    fn children(&self, parent_id: &str, special: bool) -> Vec<InventoryRef> {
        self.order
            .iter()
            .filter_map(|id| self.objects.get(id))
            .filter(|o| o.parent.as_deref() == Some(parent_id) && o.special == special)
            .map(StoredObject::to_ref)
            .collect()
    }

    fn insert(
        &mut self,
        class: &str,
        parent: Option<&str>,
        special: bool,
        attributes: AttrMap,
    ) -> String {
        let id = self.fresh_id();
        self.objects.insert(
            id.clone(),
            StoredObject {
                id: id.clone(),
                class: class.to_string(),
                parent: parent.map(str::to_string),
                special,
                attributes,
            },
        );
        self.order.push(id.clone());
        id
    }

    fn subtree_ids(&self, root_id: &str) -> Vec<String> {
        let mut collected = vec![root_id.to_string()];
        let mut cursor = 0;
        while cursor < collected.len() {
            let current = collected[cursor].clone();
            for obj in self.objects.values() {
                if obj.parent.as_deref() == Some(current.as_str()) {
                    collected.push(obj.id.clone());
                }
            }
            cursor += 1;
        }
        collected
    }
}

/// In-memory [`InventoryStore`] backend.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    state: Mutex<State>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a root object (no containment parent) and returns its handle.
    pub fn seed_root(&self, class: &str, name: &str, attributes: AttrMap) -> InventoryRef {
        let mut state = self.state.lock().expect("memstore lock");
        let mut attrs = attributes;
        attrs.insert(classes::attrs::NAME.to_string(), name.to_string());
        let id = state.insert(class, None, false, attrs);
        InventoryRef::new(id, class, name)
    }

    /// Seeds an ordinary child object and returns its handle.
    pub fn seed_child(
        &self,
        parent: &InventoryRef,
        class: &str,
        name: &str,
        attributes: AttrMap,
    ) -> InventoryRef {
        let mut state = self.state.lock().expect("memstore lock");
        let mut attrs = attributes;
        attrs.insert(classes::attrs::NAME.to_string(), name.to_string());
        let id = state.insert(class, Some(&parent.id), false, attrs);
        InventoryRef::new(id, class, name)
    }

    /// Seeds a special (logical) child object and returns its handle.
    pub fn seed_special_child(
        &self,
        parent: &InventoryRef,
        class: &str,
        name: &str,
        attributes: AttrMap,
    ) -> InventoryRef {
        let mut state = self.state.lock().expect("memstore lock");
        let mut attrs = attributes;
        attrs.insert(classes::attrs::NAME.to_string(), name.to_string());
        let id = state.insert(class, Some(&parent.id), true, attrs);
        InventoryRef::new(id, class, name)
    }

    /// Registers a service-catalog entity.
    pub fn seed_service(&self, class: &str, name: &str) -> InventoryRef {
        let mut state = self.state.lock().expect("memstore lock");
        let id = state.fresh_id();
        let service = InventoryRef::new(id, class, name);
        state.services.push(service.clone());
        service
    }

    /// Looks an object up by class and name; first match in insertion order.
    pub fn find_by_name(&self, class: &str, name: &str) -> Option<InventoryObject> {
        let state = self.state.lock().expect("memstore lock");
        state
            .order
            .iter()
            .filter_map(|id| state.objects.get(id))
            .find(|o| o.class == class && o.name() == name)
            .map(StoredObject::to_object)
    }

    /// Containment parent id of an object, if any.
    pub fn parent_id(&self, id: &str) -> Option<String> {
        let state = self.state.lock().expect("memstore lock");
        state.objects.get(id).and_then(|o| o.parent.clone())
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.state.lock().expect("memstore lock").objects.len()
    }

    /// Whether a named relationship exists between the two objects.
    pub fn related(&self, a_id: &str, b_id: &str, name: &str) -> bool {
        let state = self.state.lock().expect("memstore lock");
        state
            .relationships
            .iter()
            .any(|r| r.a_id == a_id && r.b_id == b_id && r.name == name)
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn children_of(&self, _class: &str, id: &str) -> StoreResult<Vec<InventoryRef>> {
        let state = self.state.lock().expect("memstore lock");
        state.get(id)?;
        Ok(state.children(id, false))
    }

    async fn special_children_of(&self, _class: &str, id: &str) -> StoreResult<Vec<InventoryRef>> {
        let state = self.state.lock().expect("memstore lock");
        state.get(id)?;
        Ok(state.children(id, true))
    }

    async fn parent_of(&self, class: &str, id: &str) -> StoreResult<InventoryRef> {
        let state = self.state.lock().expect("memstore lock");
        let obj = state.get(id)?;
        let parent_id = obj.parent.clone().ok_or_else(|| StoreError::ObjectNotFound {
            class: class.to_string(),
            id: format!("parent of {id}"),
        })?;
        Ok(state.get(&parent_id)?.to_ref())
    }

    async fn object(&self, _class: &str, id: &str) -> StoreResult<InventoryObject> {
        let state = self.state.lock().expect("memstore lock");
        Ok(state.get(id)?.to_object())
    }

    async fn create_object(
        &self,
        class: &str,
        _parent_class: &str,
        parent_id: &str,
        attributes: &AttrMap,
    ) -> StoreResult<String> {
        let mut state = self.state.lock().expect("memstore lock");
        state.get(parent_id)?;
        Ok(state.insert(class, Some(parent_id), false, attributes.clone()))
    }

    async fn create_special_object(
        &self,
        class: &str,
        _parent_class: &str,
        parent_id: &str,
        attributes: &AttrMap,
    ) -> StoreResult<String> {
        let mut state = self.state.lock().expect("memstore lock");
        state.get(parent_id)?;
        Ok(state.insert(class, Some(parent_id), true, attributes.clone()))
    }

    async fn update_object(&self, _class: &str, id: &str, delta: &AttrMap) -> StoreResult<()> {
        let mut state = self.state.lock().expect("memstore lock");
        let obj = state
            .objects
            .get_mut(id)
            .ok_or_else(|| StoreError::ObjectNotFound {
                class: String::new(),
                id: id.to_string(),
            })?;
        for (key, value) in delta {
            obj.attributes.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn move_object(
        &self,
        _new_parent_class: &str,
        new_parent_id: &str,
        _class: &str,
        id: &str,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().expect("memstore lock");
        state.get(new_parent_id)?;
        let obj = state
            .objects
            .get_mut(id)
            .ok_or_else(|| StoreError::ObjectNotFound {
                class: String::new(),
                id: id.to_string(),
            })?;
        obj.parent = Some(new_parent_id.to_string());
        Ok(())
    }

    async fn delete_object(&self, _class: &str, id: &str) -> StoreResult<()> {
        let mut state = self.state.lock().expect("memstore lock");
        state.get(id)?;
        let doomed = state.subtree_ids(id);
        for gone in &doomed {
            state.objects.remove(gone);
            state.order.retain(|o| o != gone);
        }
        state
            .relationships
            .retain(|r| !doomed.contains(&r.a_id) && !doomed.contains(&r.b_id));
        Ok(())
    }

    async fn create_special_relationship(
        &self,
        _a_class: &str,
        a_id: &str,
        _b_class: &str,
        b_id: &str,
        name: &str,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().expect("memstore lock");
        state.get(b_id)?;
        state.relationships.push(Relationship {
            a_id: a_id.to_string(),
            b_id: b_id.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    async fn special_attribute(
        &self,
        _class: &str,
        id: &str,
        name: &str,
    ) -> StoreResult<Vec<InventoryRef>> {
        let state = self.state.lock().expect("memstore lock");
        let mut related = Vec::new();
        for rel in state.relationships.iter().filter(|r| r.name == name) {
            let other = if rel.a_id == id {
                Some(&rel.b_id)
            } else if rel.b_id == id {
                Some(&rel.a_id)
            } else {
                None
            };
            if let Some(other_id) = other {
                if let Some(obj) = state.objects.get(other_id) {
                    related.push(obj.to_ref());
                } else if let Some(service) = state.services.iter().find(|s| &s.id == other_id) {
                    related.push(service.clone());
                }
            }
        }
        Ok(related)
    }

    async fn list_type_items(&self, class: &str) -> StoreResult<Vec<InventoryRef>> {
        let state = self.state.lock().expect("memstore lock");
        Ok(state
            .list_types
            .get(class)
            .map(|items| {
                items
                    .iter()
                    .map(|(id, name)| InventoryRef::new(id.clone(), class, name.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_list_type_item(&self, class: &str, name: &str) -> StoreResult<String> {
        let mut state = self.state.lock().expect("memstore lock");
        let id = state.fresh_id();
        state
            .list_types
            .entry(class.to_string())
            .or_default()
            .push((id.clone(), name.to_string()));
        Ok(id)
    }

    async fn possible_children(&self, class: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock().expect("memstore lock");
        Ok(state
            .possible_children
            .get(class)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_possible_children(&self, class: &str, children: &[String]) -> StoreResult<()> {
        let mut state = self.state.lock().expect("memstore lock");
        state
            .possible_children
            .entry(class.to_string())
            .or_default()
            .extend(children.iter().cloned());
        Ok(())
    }

    async fn services(&self) -> StoreResult<Vec<InventoryRef>> {
        let state = self.state.lock().expect("memstore lock");
        Ok(state.services.clone())
    }
}
