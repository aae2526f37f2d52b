//! Store mutations with per-node failure isolation.
//!
//! Every create/update/move/delete issued by the reconcilers goes through
//! here. A failing call becomes an error finding naming the node and the run
//! continues; nothing retries. Successful creations are registered in the
//! session's identity map so later nodes can resolve their parents.

use tracing::debug;

use netinv_common::{AttrMap, Finding, InventoryRef, InventoryStore};

use crate::session::SyncSession;

/// Issues mutations against the store on behalf of the reconcilers.
pub struct Executor<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: InventoryStore + ?Sized> Executor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Creates a node under `parent`; returns the new persisted id.
    ///
    /// `special` attaches the node outside the containment tree. When a
    /// discovery id is given it is recorded in the identity map, and the new
    /// node is marked matched so the staleness passes leave it alone.
    pub async fn create(
        &self,
        session: &mut SyncSession,
        class: &str,
        name: &str,
        parent: &InventoryRef,
        attributes: &AttrMap,
        discovery_id: Option<&str>,
        special: bool,
    ) -> Option<String> {
        let result = if special {
            self.store
                .create_special_object(class, &parent.class, &parent.id, attributes)
                .await
        } else {
            self.store
                .create_object(class, &parent.class, &parent.id, attributes)
                .await
        };
        match result {
            Ok(id) => {
                debug!(%name, %class, parent = %parent, "created");
                if let Some(discovery_id) = discovery_id {
                    session.record_identity(discovery_id, &id);
                }
                session.mark_matched(&id);
                session.log(Finding::success(
                    format!("{name} [{class}]"),
                    format!("created in {parent}"),
                ));
                Some(id)
            }
            Err(err) => {
                session.log(Finding::error(
                    format!("{name} [{class}]"),
                    format!("not created: {err}"),
                ));
                None
            }
        }
    }

    /// Applies a non-empty attribute delta to a node.
    pub async fn update(
        &self,
        session: &mut SyncSession,
        target: &InventoryRef,
        delta: &AttrMap,
    ) -> bool {
        if delta.is_empty() {
            return true;
        }
        match self
            .store
            .update_object(&target.class, &target.id, delta)
            .await
        {
            Ok(()) => {
                let changed = delta
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                session.log(Finding::success(
                    target.to_string(),
                    format!("attributes updated: {changed}"),
                ));
                true
            }
            Err(err) => {
                session.log(Finding::error(
                    target.to_string(),
                    format!("attributes not updated: {err}"),
                ));
                false
            }
        }
    }

    /// Moves a node (subtree included) under a new parent.
    pub async fn relocate(
        &self,
        session: &mut SyncSession,
        target: &InventoryRef,
        new_parent: &InventoryRef,
    ) -> bool {
        match self
            .store
            .move_object(&new_parent.class, &new_parent.id, &target.class, &target.id)
            .await
        {
            Ok(()) => {
                session.log(Finding::success(
                    target.to_string(),
                    format!("moved under {new_parent}"),
                ));
                true
            }
            Err(err) => {
                session.log(Finding::error(
                    target.to_string(),
                    format!("not moved: {err}"),
                ));
                false
            }
        }
    }

    /// Deletes a node and its subtree.
    pub async fn delete(&self, session: &mut SyncSession, target: &InventoryRef) -> bool {
        match self.store.delete_object(&target.class, &target.id).await {
            Ok(()) => {
                session.log(Finding::success(target.to_string(), "deleted"));
                true
            }
            Err(err) => {
                session.log(Finding::error(
                    target.to_string(),
                    format!("not deleted: {err}"),
                ));
                false
            }
        }
    }
}
