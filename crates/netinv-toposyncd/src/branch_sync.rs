//! Structural branch matching and reconciliation.
//!
//! Discovery ids are not stable across polls, so identity is inferred
//! structurally: each branch position is compared as (name, class,
//! parent-name, parent-class). Matching is a bounded alignment over the
//! persisted branches: longest exact prefix first, then a backward tail
//! compare, then low-confidence anchors. It is not a general tree-edit
//! distance and does not try to be.

use tracing::instrument;

use netinv_common::{
    classes, compare_attributes, ifname, AttrMap, Finding, InventoryObject, InventoryRef,
    InventoryStore,
};

use crate::discovery::DiscoveredTree;
use crate::executor::Executor;
use crate::list_types::ListTypeResolver;
use crate::session::SyncSession;
use crate::snapshot::{RegistryEntry, Snapshot, SnapshotNode};

/// One position of a discovered branch, ready for matching.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub discovery_id: String,
    pub class: String,
    pub name: String,
    /// Declared parent position; the device root's current display name when
    /// the parent is the root, so root renames do not break matching.
    pub parent_name: String,
    pub parent_class: String,
    pub attrs: AttrMap,
}

/// Positional equality: name, class and declared parent all agree.
fn position_matches(new: &NewNode, snap: &SnapshotNode, device: &InventoryRef) -> bool {
    let parent_name = if snap.parent.id == device.id {
        device.name.as_str()
    } else {
        snap.parent.name.as_str()
    };
    new.name == snap.obj.name
        && new.class == snap.obj.class
        && new.parent_name == parent_name
        && new.parent_class == snap.parent.class
}

/// The display name a node will carry in the inventory.
fn inventory_name(class: &str, raw_name: &str) -> String {
    if classes::is_physical_port(class) && ifname::is_syncable(raw_name) {
        ifname::normalize(raw_name)
    } else {
        raw_name.to_string()
    }
}

/// Builds the attribute map for one discovered node, resolving vendor and
/// model through the catalog.
pub(crate) async fn build_attributes<S: InventoryStore + ?Sized>(
    store: &S,
    session: &mut SyncSession,
    resolver: &mut ListTypeResolver,
    row: &crate::discovery::DiscoveredRow,
    name: &str,
) -> AttrMap {
    let mut attrs = AttrMap::new();
    attrs.insert(classes::attrs::NAME.to_string(), name.to_string());
    if !row.description.trim().is_empty() {
        attrs.insert(
            classes::attrs::DESCRIPTION.to_string(),
            row.description.trim().to_string(),
        );
    }
    if !row.serial.trim().is_empty() {
        attrs.insert(
            classes::attrs::SERIAL_NUMBER.to_string(),
            row.serial.trim().to_string(),
        );
    }
    if !row.firmware.trim().is_empty() {
        attrs.insert(
            classes::attrs::FIRMWARE_VERSION.to_string(),
            row.firmware.trim().to_string(),
        );
    }
    if let Some(vendor) = resolver
        .resolve(store, session, classes::EQUIPMENT_VENDOR, &row.vendor)
        .await
    {
        attrs.insert(classes::attrs::VENDOR.to_string(), vendor);
    }
    if let Some(model) = resolver
        .resolve(store, session, classes::EQUIPMENT_MODEL, &row.model)
        .await
    {
        attrs.insert(classes::attrs::MODEL.to_string(), model);
    }
    attrs
}

/// Translates one discovery-id path into matchable [`NewNode`]s.
async fn build_new_branch<S: InventoryStore + ?Sized>(
    store: &S,
    session: &mut SyncSession,
    resolver: &mut ListTypeResolver,
    tree: &DiscoveredTree,
    device: &InventoryRef,
    branch_ids: &[String],
) -> Vec<NewNode> {
    let mut nodes = Vec::with_capacity(branch_ids.len());
    let mut parent: Option<(String, String)> = None; // (name, class)
    for id in branch_ids {
        let Some(classified) = tree.nodes.get(id) else {
            continue;
        };
        let name = inventory_name(&classified.class, &classified.row.name);
        let (parent_name, parent_class) = parent
            .clone()
            .unwrap_or_else(|| (device.name.clone(), device.class.clone()));
        let attrs = build_attributes(store, session, resolver, &classified.row, &name).await;
        nodes.push(NewNode {
            discovery_id: id.clone(),
            class: classified.class.clone(),
            name: name.clone(),
            parent_name,
            parent_class,
            attrs,
        });
        parent = Some((name, classified.class.clone()));
    }
    nodes
}

/// Reconciles every discovered branch against the snapshot.
#[instrument(skip_all)]
pub async fn reconcile_branches<S: InventoryStore + ?Sized>(
    store: &S,
    session: &mut SyncSession,
    resolver: &mut ListTypeResolver,
    tree: &DiscoveredTree,
    snapshot: &mut Snapshot,
) {
    let device = session.device.clone();
    let executor = Executor::new(store);

    for branch_ids in &tree.branches {
        let mut nodes =
            build_new_branch(store, session, resolver, tree, &device, branch_ids).await;

        // drop the leading positions an earlier, overlapping branch already
        // resolved; the last of them anchors the remainder
        let mut anchor: Option<InventoryRef> = None;
        while let Some(first) = nodes.first() {
            match session.resolve(&first.discovery_id) {
                Some(persisted_id) => {
                    anchor = Some(InventoryRef::new(
                        persisted_id,
                        first.class.clone(),
                        first.name.clone(),
                    ));
                    nodes.remove(0);
                }
                None => break,
            }
        }
        if nodes.is_empty() {
            continue;
        }

        match anchor {
            Some(parent) => {
                sync_chain(&executor, session, snapshot, nodes, parent).await;
            }
            None => {
                reconcile_branch(&executor, session, snapshot, &device, nodes).await;
            }
        }
    }
}

/// Matches one discovered branch that shares no resolved prefix with an
/// earlier branch of this run.
async fn reconcile_branch<S: InventoryStore + ?Sized>(
    executor: &Executor<'_, S>,
    session: &mut SyncSession,
    snapshot: &mut Snapshot,
    device: &InventoryRef,
    mut nodes: Vec<NewNode>,
) {
    // 1. forward prefix: the persisted branch with the longest exact
    //    positional match wins
    let mut best: Option<(usize, usize)> = None; // (branch index, length)
    for (index, branch) in snapshot.branches.iter().enumerate() {
        let limit = nodes.len().min(branch.len());
        let mut len = 0;
        while len < limit && position_matches(&nodes[len], &branch[len], device) {
            len += 1;
        }
        if len > 0 && best.map_or(true, |(_, l)| len > l) {
            best = Some((index, len));
        }
    }
    if let Some((index, len)) = best {
        let matched: Vec<SnapshotNode> = snapshot.branches[index][..len].to_vec();
        for (new, snap) in nodes.iter().zip(matched.iter()) {
            absorb_match(executor, session, new, snap).await;
        }
        if len == nodes.len() {
            return;
        }
        let parent = matched[len - 1].obj.to_ref();
        let rest = nodes.split_off(len);
        sync_chain(executor, session, snapshot, rest, parent).await;
        return;
    }

    // 2. backward compare from the tails, tolerating sibling-order drift;
    //    only a full match of the new branch counts
    let mut backward: Option<Vec<SnapshotNode>> = None;
    for branch in &snapshot.branches {
        if branch.len() < nodes.len() {
            continue;
        }
        let offset = branch.len() - nodes.len();
        let full = nodes
            .iter()
            .enumerate()
            .all(|(i, new)| position_matches(new, &branch[offset + i], device));
        if full {
            backward = Some(branch[offset..].to_vec());
            break;
        }
    }
    if let Some(matched) = backward {
        for (new, snap) in nodes.iter().zip(matched.iter()) {
            absorb_match(executor, session, new, snap).await;
        }
        return;
    }

    // 3. anchors, in decreasing confidence
    let first = &nodes[0];
    if first.parent_class == device.class && first.parent_name == device.name {
        sync_chain(executor, session, snapshot, nodes, device.clone()).await;
        return;
    }
    let mut anchor: Option<InventoryRef> = None;
    'scan: for branch in &snapshot.branches {
        for snap in branch.iter().rev().take(2) {
            if snap.obj.name == first.parent_name && snap.obj.class == first.parent_class {
                anchor = Some(snap.obj.to_ref());
                break 'scan;
            }
        }
    }
    if let Some(parent) = anchor {
        session.log(Finding::warning(
            format!("{} [{}]", first.name, first.class),
            format!("anchored by name under {parent}; placement is low confidence"),
        ));
        sync_chain(executor, session, snapshot, nodes, parent).await;
        return;
    }

    // 4. nothing matched anywhere: the branch is new, create it whole
    sync_chain(executor, session, snapshot, nodes, device.clone()).await;
}

/// Accounts for a matched (new, persisted) position pair: identity is
/// recorded and changed attributes are written back.
async fn absorb_match<S: InventoryStore + ?Sized>(
    executor: &Executor<'_, S>,
    session: &mut SyncSession,
    new: &NewNode,
    snap: &SnapshotNode,
) {
    session.record_identity(&new.discovery_id, &snap.obj.id);
    if session.is_matched(&snap.obj.id) {
        return;
    }
    session.mark_matched(&snap.obj.id);
    let delta = compare_attributes(&snap.obj.attributes, &new.attrs);
    executor.update(session, &snap.obj.to_ref(), &delta).await;
}

/// Creates (or re-attaches) a node chain under a resolved parent.
///
/// Ports are looked up in the registry first: found in place they are only
/// diffed, found elsewhere they are moved (relationships survive, the id is
/// preserved). Non-port nodes are matched against unclaimed snapshot
/// positions under the same parent before being created. A failed create
/// ends the chain, since the children below it have no parent to attach to.
async fn sync_chain<S: InventoryStore + ?Sized>(
    executor: &Executor<'_, S>,
    session: &mut SyncSession,
    snapshot: &mut Snapshot,
    nodes: Vec<NewNode>,
    parent: InventoryRef,
) {
    let mut parent = parent;
    for node in nodes {
        if classes::is_physical_port(&node.class) {
            if let Some(entry) = snapshot
                .registry
                .find_physical(&node.class, &node.name)
                .cloned()
            {
                session.record_identity(&node.discovery_id, &entry.obj.id);
                session.mark_matched(&entry.obj.id);
                let target = entry.obj.to_ref();
                if entry.parent.id != parent.id {
                    executor.relocate(session, &target, &parent).await;
                }
                let delta = compare_attributes(&entry.obj.attributes, &node.attrs);
                executor.update(session, &target, &delta).await;
                parent = target;
                continue;
            }
        } else if let Some(snap) = find_unclaimed_under(snapshot, session, &parent, &node) {
            absorb_match(executor, session, &node, &snap).await;
            parent = snap.obj.to_ref();
            continue;
        }

        match executor
            .create(
                session,
                &node.class,
                &node.name,
                &parent,
                &node.attrs,
                Some(&node.discovery_id),
                false,
            )
            .await
        {
            Some(id) => {
                let created = InventoryRef::new(id.clone(), node.class.clone(), node.name.clone());
                if classes::is_physical_port(&node.class) {
                    snapshot.registry.physical.push(RegistryEntry {
                        obj: InventoryObject::new(id, node.class, node.name, node.attrs),
                        parent: parent.clone(),
                    });
                }
                parent = created;
            }
            None => break,
        }
    }
}

/// A snapshot position with the given name and class directly under
/// `parent` that no branch of this run has claimed yet.
fn find_unclaimed_under(
    snapshot: &Snapshot,
    session: &SyncSession,
    parent: &InventoryRef,
    node: &NewNode,
) -> Option<SnapshotNode> {
    for branch in &snapshot.branches {
        for snap in branch {
            if snap.parent.id == parent.id
                && snap.obj.name == node.name
                && snap.obj.class == node.class
                && !session.is_matched(&snap.obj.id)
            {
                return Some(snap.clone());
            }
        }
    }
    None
}

/// Deletes what the structural pass never accounted for, within the
/// conservative scope: unmatched first-level physical children, and
/// transceivers still hanging under a port.
#[instrument(skip_all)]
pub async fn delete_stale<S: InventoryStore + ?Sized>(
    store: &S,
    session: &mut SyncSession,
    snapshot: &Snapshot,
) {
    let executor = Executor::new(store);

    for entry in &snapshot.registry.transceivers {
        if classes::is_physical_port(&entry.parent.class) && !session.is_matched(&entry.obj.id) {
            executor.delete(session, &entry.to_ref()).await;
        }
    }

    for child in &snapshot.first_level {
        if classes::is_interface(&child.class) {
            continue;
        }
        if !session.is_matched(&child.id) {
            executor.delete(session, child).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netinv_common::{AttrMap, MemoryInventory};

    fn new_node(id: &str, class: &str, name: &str, parent: (&str, &str)) -> NewNode {
        let mut attrs = AttrMap::new();
        attrs.insert(classes::attrs::NAME.to_string(), name.to_string());
        NewNode {
            discovery_id: id.to_string(),
            class: class.to_string(),
            name: name.to_string(),
            parent_name: parent.0.to_string(),
            parent_class: parent.1.to_string(),
            attrs,
        }
    }

    fn snap_node(id: &str, class: &str, name: &str, parent: &InventoryRef) -> SnapshotNode {
        let mut attrs = AttrMap::new();
        attrs.insert(classes::attrs::NAME.to_string(), name.to_string());
        SnapshotNode {
            obj: InventoryObject::new(id, class, name, attrs),
            parent: parent.clone(),
        }
    }

    #[test]
    fn position_matching_normalizes_root_name() {
        let device = InventoryRef::new("oid-1", "Router", "edge-1-renamed");
        // parent recorded under the old root name still matches, because the
        // snapshot side substitutes the current display name
        let root_parent = InventoryRef::new("oid-1", "Router", "edge-1-old");
        let new = new_node("1001", classes::SLOT, "slot 0/1", ("edge-1-renamed", "Router"));
        let snap = snap_node("oid-2", classes::SLOT, "slot 0/1", &root_parent);
        assert!(position_matches(&new, &snap, &device));
    }

    #[test]
    fn position_mismatch_on_parent_class() {
        let device = InventoryRef::new("oid-1", "Router", "edge-1");
        let other_parent = InventoryRef::new("oid-9", classes::SLOT, "slot 0/2");
        let new = new_node("1001", classes::IP_BOARD, "board 0/1", ("slot 0/1", classes::SLOT));
        let snap = snap_node("oid-2", classes::IP_BOARD, "board 0/1", &other_parent);
        assert!(!position_matches(&new, &snap, &device));
    }

    #[test]
    fn inventory_names_normalize_ports_only() {
        assert_eq!(
            inventory_name(classes::OPTICAL_PORT, "GigabitEthernet0/0/1"),
            "gi0/0/1"
        );
        assert_eq!(inventory_name(classes::SLOT, "slot 0/1"), "slot 0/1");
        assert_eq!(inventory_name(classes::POWER_PORT, "Power Supply 0"), "Power Supply 0");
    }

    #[tokio::test]
    async fn chain_moves_known_port_instead_of_recreating() {
        let store = MemoryInventory::new();
        let root = store.seed_root("Router", "edge-1", AttrMap::new());
        let board_a = store.seed_child(&root, classes::IP_BOARD, "board 0/0", AttrMap::new());
        let board_b = store.seed_child(&root, classes::IP_BOARD, "board 0/1", AttrMap::new());
        let port = store.seed_child(&board_a, classes::OPTICAL_PORT, "gi0/0/1", AttrMap::new());

        let mut snapshot = Snapshot::default();
        snapshot.registry.physical.push(RegistryEntry {
            obj: store.object(classes::OPTICAL_PORT, &port.id).await.unwrap(),
            parent: board_a.clone(),
        });

        let mut session = SyncSession::new(root.clone());
        let executor = Executor::new(&store);
        let nodes = vec![new_node(
            "2001",
            classes::OPTICAL_PORT,
            "gi0/0/1",
            ("board 0/1", classes::IP_BOARD),
        )];
        sync_chain(&executor, &mut session, &mut snapshot, nodes, board_b.clone()).await;

        assert_eq!(store.parent_id(&port.id).as_deref(), Some(board_b.id.as_str()));
        assert_eq!(session.resolve("2001"), Some(port.id.as_str()));
        // one move finding, no create
        assert_eq!(session.findings().len(), 1);
    }

    #[tokio::test]
    async fn chain_creates_missing_suffix_under_anchor() {
        let store = MemoryInventory::new();
        let root = store.seed_root("Router", "edge-1", AttrMap::new());
        let slot = store.seed_child(&root, classes::SLOT, "slot 0/1", AttrMap::new());

        let mut snapshot = Snapshot::default();
        let mut session = SyncSession::new(root.clone());
        let executor = Executor::new(&store);
        let nodes = vec![
            new_node("2001", classes::IP_BOARD, "board 0/1", ("slot 0/1", classes::SLOT)),
            new_node(
                "2002",
                classes::OPTICAL_PORT,
                "gi0/1/0",
                ("board 0/1", classes::IP_BOARD),
            ),
        ];
        sync_chain(&executor, &mut session, &mut snapshot, nodes, slot.clone()).await;

        let board = store.find_by_name(classes::IP_BOARD, "board 0/1").unwrap();
        let port = store.find_by_name(classes::OPTICAL_PORT, "gi0/1/0").unwrap();
        assert_eq!(store.parent_id(&board.id).as_deref(), Some(slot.id.as_str()));
        assert_eq!(store.parent_id(&port.id).as_deref(), Some(board.id.as_str()));
        // the created port is visible to the interface pass
        assert_eq!(snapshot.registry.physical.len(), 1);
    }
}
