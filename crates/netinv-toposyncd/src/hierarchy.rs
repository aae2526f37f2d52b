//! Containment-schema upkeep.
//!
//! Newly observed parent/child class pairs must be declared legal before the
//! creates in the structural pass can succeed. Failures here are reported and
//! left non-blocking: a create that still hits an undeclared pair fails on
//! its own and is reported per node.

use std::collections::{BTreeMap, BTreeSet};

use tracing::instrument;

use netinv_common::{Finding, InventoryStore};

use crate::session::SyncSession;

/// Declares every observed-but-missing child class under its parent class.
/// Idempotent; only schema metadata is touched.
#[instrument(skip_all)]
pub async fn update_class_hierarchy<S: InventoryStore + ?Sized>(
    store: &S,
    session: &mut SyncSession,
    observed: &BTreeMap<String, BTreeSet<String>>,
) {
    for (parent_class, child_classes) in observed {
        let declared = match store.possible_children(parent_class).await {
            Ok(declared) => declared,
            Err(err) => {
                session.log(Finding::error(
                    parent_class.clone(),
                    format!("containment hierarchy not read: {err}"),
                ));
                continue;
            }
        };

        let missing: Vec<String> = child_classes
            .iter()
            .filter(|child| !declared.contains(*child))
            .cloned()
            .collect();
        if missing.is_empty() {
            continue;
        }

        match store.add_possible_children(parent_class, &missing).await {
            Ok(()) => session.log(Finding::success(
                parent_class.clone(),
                format!("containment hierarchy updated: {}", missing.join(", ")),
            )),
            Err(err) => session.log(Finding::error(
                parent_class.clone(),
                format!("containment hierarchy not updated: {err}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netinv_common::{classes, FindingKind, InventoryRef, MemoryInventory};

    fn observed() -> BTreeMap<String, BTreeSet<String>> {
        let mut map = BTreeMap::new();
        map.insert(
            "Router".to_string(),
            [classes::SLOT.to_string()].into_iter().collect(),
        );
        map.insert(
            classes::SLOT.to_string(),
            [classes::IP_BOARD.to_string()].into_iter().collect(),
        );
        map
    }

    #[tokio::test]
    async fn declares_missing_pairs() {
        let store = MemoryInventory::new();
        let mut session = SyncSession::new(InventoryRef::new("oid-1", "Router", "edge-1"));

        update_class_hierarchy(&store, &mut session, &observed()).await;

        assert_eq!(
            store.possible_children("Router").await.unwrap(),
            vec![classes::SLOT.to_string()]
        );
        assert_eq!(session.findings().len(), 2);
        assert!(session
            .findings()
            .iter()
            .all(|f| f.kind == FindingKind::Success));
    }

    #[tokio::test]
    async fn already_declared_pairs_stay_silent() {
        let store = MemoryInventory::new();
        store
            .add_possible_children("Router", &[classes::SLOT.to_string()])
            .await
            .unwrap();
        store
            .add_possible_children(classes::SLOT, &[classes::IP_BOARD.to_string()])
            .await
            .unwrap();
        let mut session = SyncSession::new(InventoryRef::new("oid-1", "Router", "edge-1"));

        update_class_hierarchy(&store, &mut session, &observed()).await;

        assert!(session.findings().is_empty());
    }
}
