//! Persisted-structure snapshot.
//!
//! Walks the device's persisted tree once (ordinary and special children)
//! into the shape the matchers need: maximal physical branches, the
//! first-level children list, and flat interface registries. Ports and other
//! interface nodes never appear inside branches; ports get reparented
//! without renaming, so they are matched by name through the registry
//! instead of by position.
//!
//! No transactional isolation is assumed; a concurrent external change is
//! reconciled by the next run.

use std::collections::HashSet;

use tracing::instrument;

use netinv_common::{
    classes, ifname, Finding, InventoryObject, InventoryRef, InventoryStore, SyncResult,
};

use crate::session::SyncSession;

/// One position of a physical branch, with the parent it was found under.
#[derive(Debug, Clone)]
pub struct SnapshotNode {
    pub obj: InventoryObject,
    pub parent: InventoryRef,
}

/// A flat registry entry: an interface (or transceiver) and its parent.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub obj: InventoryObject,
    pub parent: InventoryRef,
}

impl RegistryEntry {
    pub fn to_ref(&self) -> InventoryRef {
        self.obj.to_ref()
    }
}

/// Flat interface registries, independent of tree position.
#[derive(Debug, Default)]
pub struct PortRegistry {
    /// Copper/fiber/USB/serial ports.
    pub physical: Vec<RegistryEntry>,
    /// Virtual ports, loopbacks and port channels.
    pub virtual_ports: Vec<RegistryEntry>,
    /// MPLS tunnels.
    pub tunnels: Vec<RegistryEntry>,
    /// Service instances.
    pub service_instances: Vec<RegistryEntry>,
    /// Transceivers, kept for parent fallback and stale-duplicate cleanup.
    pub transceivers: Vec<RegistryEntry>,
}

/// Finds an entry whose stored name equals `name` raw, case-insensitively,
/// or after normalization. First match in walk order wins.
pub fn find_by_name<'r>(entries: &'r [RegistryEntry], name: &str) -> Option<&'r RegistryEntry> {
    let normalized = ifname::normalize(name);
    entries.iter().find(|e| {
        e.obj.name == name
            || e.obj.name.eq_ignore_ascii_case(name)
            || ifname::normalize(&e.obj.name) == normalized
    })
}

impl PortRegistry {
    /// Looks a physical port up by class and name.
    pub fn find_physical(&self, class: &str, name: &str) -> Option<&RegistryEntry> {
        let normalized = ifname::normalize(name);
        self.physical
            .iter()
            .find(|e| e.obj.class == class && ifname::normalize(&e.obj.name) == normalized)
    }
}

/// The persisted structure of one device, read in a single pass.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Ordinary first-level children, used for top-level staleness checks.
    pub first_level: Vec<InventoryRef>,
    /// Maximal physical branches: first-level child down to the last
    /// purely-physical ancestor.
    pub branches: Vec<Vec<SnapshotNode>>,
    pub registry: PortRegistry,
}

/// Reads the device's persisted structure.
///
/// Failing to read the device's own children is fatal; a failure deeper in
/// the walk is reported as a finding and the node's subtree is skipped.
#[instrument(skip(store, session), fields(device = %device))]
pub async fn read_snapshot<S: InventoryStore + ?Sized>(
    store: &S,
    session: &mut SyncSession,
    device: &InventoryRef,
) -> SyncResult<Snapshot> {
    let mut snapshot = Snapshot::default();

    let first_level = store.children_of(&device.class, &device.id).await?;
    let special_first = store.special_children_of(&device.class, &device.id).await?;
    snapshot.first_level = first_level.clone();

    // (node, parent, physical path so far, whether the path is live)
    let mut stack: Vec<(InventoryRef, InventoryRef, Vec<SnapshotNode>, bool)> = Vec::new();
    for child in special_first.into_iter().rev() {
        stack.push((child, device.clone(), Vec::new(), false));
    }
    for child in first_level.into_iter().rev() {
        stack.push((child, device.clone(), Vec::new(), true));
    }

    let mut visited: HashSet<String> = HashSet::new();

    while let Some((node, parent, path, in_branch)) = stack.pop() {
        if !visited.insert(node.id.clone()) {
            continue;
        }

        let obj = match store.object(&node.class, &node.id).await {
            Ok(obj) => obj,
            Err(err) => {
                session.log(Finding::error(
                    node.to_string(),
                    format!("structure not read: {err}"),
                ));
                continue;
            }
        };

        if obj.class == classes::TRANSCEIVER {
            snapshot.registry.transceivers.push(RegistryEntry {
                obj: obj.clone(),
                parent: parent.clone(),
            });
        }

        let children = match store.children_of(&obj.class, &obj.id).await {
            Ok(children) => children,
            Err(err) => {
                session.log(Finding::error(
                    node.to_string(),
                    format!("children not read: {err}"),
                ));
                Vec::new()
            }
        };
        let special_children = match store.special_children_of(&obj.class, &obj.id).await {
            Ok(children) => children,
            Err(err) => {
                session.log(Finding::error(
                    node.to_string(),
                    format!("special children not read: {err}"),
                ));
                Vec::new()
            }
        };

        if classes::is_interface(&obj.class) {
            let entry = RegistryEntry {
                obj,
                parent: parent.clone(),
            };
            let class = entry.obj.class.clone();
            if classes::is_physical_port(&class) {
                snapshot.registry.physical.push(entry);
            } else if class == classes::MPLS_TUNNEL {
                snapshot.registry.tunnels.push(entry);
            } else if class == classes::SERVICE_INSTANCE {
                snapshot.registry.service_instances.push(entry);
            } else {
                snapshot.registry.virtual_ports.push(entry);
            }
            // interfaces end the physical path; their children are
            // interfaces (or stale transceiver duplicates) themselves
            for child in special_children.into_iter().rev() {
                stack.push((child, node.clone(), Vec::new(), false));
            }
            for child in children.into_iter().rev() {
                stack.push((child, node.clone(), Vec::new(), false));
            }
            continue;
        }

        if in_branch {
            let mut path = path;
            path.push(SnapshotNode {
                obj,
                parent: parent.clone(),
            });
            let has_physical_child = children.iter().any(|c| !classes::is_interface(&c.class));
            if !has_physical_child {
                snapshot.branches.push(path.clone());
            }
            for child in special_children.into_iter().rev() {
                stack.push((child, node.clone(), Vec::new(), false));
            }
            for child in children.into_iter().rev() {
                stack.push((child, node.clone(), path.clone(), true));
            }
        } else {
            for child in special_children.into_iter().rev() {
                stack.push((child, node.clone(), Vec::new(), false));
            }
            for child in children.into_iter().rev() {
                stack.push((child, node.clone(), Vec::new(), false));
            }
        }
    }

    Ok(snapshot)
}
