//! Discovery payload normalization and classification.
//!
//! Turns the raw physical-structure table reported by the polling source into
//! a classified, filtered adjacency the reconciler can match against the
//! persisted tree. Raw rows use the standard entity classes (3 chassis,
//! 5 container, 6 power supply, 9 module, 10 port, 1 other); target classes
//! are inventory classes, picked by ordered rules on the raw class plus
//! name/description/model heuristics.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use netinv_common::{classes, Finding, InventoryRef, SyncError, SyncResult};

use crate::session::SyncSession;

/// Raw entity class codes used by the polling source.
pub mod raw {
    pub const OTHER: u32 = 1;
    pub const CHASSIS: u32 = 3;
    pub const CONTAINER: u32 = 5;
    pub const POWER_SUPPLY: u32 = 6;
    pub const MODULE: u32 = 9;
    pub const PORT: u32 = 10;
}

/// One row of the discovered physical-structure table.
///
/// `id`/`parent_id` live in discovery space and are not stable across runs;
/// nothing downstream may persist them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredRow {
    pub id: String,
    pub parent_id: String,
    pub class_code: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub serial: String,
    #[serde(default)]
    pub firmware: String,
}

/// One row of the flat logical-interface table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRow {
    pub name: String,
    /// Service label attached to the interface, if any.
    #[serde(default)]
    pub alias: String,
    /// Interface speed as reported, in Mb/s.
    #[serde(default)]
    pub speed: String,
}

/// One run's snapshot of device structure and interfaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryPayload {
    pub structure: Vec<DiscoveredRow>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRow>,
}

/// A classified row retained by the normalizer.
#[derive(Debug, Clone)]
pub struct ClassifiedNode {
    pub row: DiscoveredRow,
    /// Target inventory class.
    pub class: String,
}

/// The normalizer's output: a filtered, classified adjacency plus the
/// branch decomposition the matcher consumes.
#[derive(Debug, Default)]
pub struct DiscoveredTree {
    /// The chassis row; its attribute delta is merged into the device root.
    pub chassis: Option<DiscoveredRow>,
    /// Classified nodes by discovery id (chassis excluded).
    pub nodes: HashMap<String, ClassifiedNode>,
    /// Discovery-id adjacency, chassis id included as the top key.
    pub children: HashMap<String, Vec<String>>,
    /// Paths from a first-level device child down to a leaf or port,
    /// as discovery ids.
    pub branches: Vec<Vec<String>>,
    /// Observed parent-class -> child-classes pairs, device root included.
    pub class_pairs: BTreeMap<String, BTreeSet<String>>,
}

// Slotted module names like Gi0/0/0/1 identify transceivers; the suffixed
// form 0/0/0/1-GigabitEthernet marks the duplicate secondary entry some
// models report for the same pluggable.
static SLOTTED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+([0-9]+/)+[0-9]+$").expect("valid pattern"));
static SLOTTED_SUFFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+([0-9]+/)+[0-9]+-[A-Za-z]+$").expect("valid pattern"));

/// Whether a raw row can take part in reconciliation at all.
///
/// Sensors, fans and disk containers never map to inventory classes.
pub fn is_usable(class_code: u32, description: &str) -> bool {
    match class_code {
        raw::CHASSIS | raw::PORT | raw::POWER_SUPPLY | raw::MODULE => true,
        raw::OTHER => description.trim().to_lowercase().contains("switch processor"),
        raw::CONTAINER => !description.trim().to_lowercase().contains("disk"),
        _ => false,
    }
}

/// Maps a usable raw row to its target inventory class.
///
/// Rules are ordered; the first hit wins. Returns `None` when the row cannot
/// be classified (reported as an error finding by the caller) or when it is a
/// known duplicate to skip.
pub fn classify(row: &DiscoveredRow, root_class: &str, model_hint: Option<&str>) -> Option<String> {
    let name = row.name.to_lowercase();
    let descr = row.description.to_lowercase();

    match row.class_code {
        raw::CHASSIS => {
            if !row.name.is_empty() && !row.description.is_empty() {
                Some(root_class.to_string())
            } else {
                None
            }
        }
        raw::PORT => {
            if model_hint.is_some_and(|m| m.contains("2960")) {
                return Some(classes::ELECTRICAL_PORT.to_string());
            }
            if name.contains("usb") || descr.contains("usb") {
                Some(classes::USB_PORT.to_string())
            } else if name.contains("fastethernet")
                || name.contains("mgmteth")
                || name.contains("cpu")
                || name.contains("control")
                || (descr.contains("ethernet") && !descr.contains("gigabit"))
                || descr.contains("fast")
                || descr.contains("management")
            {
                Some(classes::ELECTRICAL_PORT.to_string())
            } else if !row.name.is_empty() && !row.description.is_empty() {
                Some(classes::OPTICAL_PORT.to_string())
            } else {
                None
            }
        }
        raw::CONTAINER => {
            if !descr.contains("disk") {
                Some(classes::SLOT.to_string())
            } else {
                None
            }
        }
        raw::POWER_SUPPLY => {
            if (name.contains("power") && !name.contains("module"))
                || descr.contains("power")
                || descr.contains("psu")
            {
                Some(classes::POWER_PORT.to_string())
            } else if row.name.contains("Module") {
                Some(classes::HYBRID_BOARD.to_string())
            } else {
                None
            }
        }
        raw::MODULE => {
            let transceiver_hint = SLOTTED_NAME.is_match(&row.name)
                || name.contains("transceiver")
                || descr.contains("transceiver")
                || (descr.contains("sfp")
                    && !name.contains("card")
                    && !SLOTTED_SUFFIXED.is_match(&row.name))
                || descr.contains("xfp")
                || descr.contains("cpak")
                || descr == "ge t";
            if transceiver_hint && !name.contains("spa") && !descr.contains("spa") {
                Some(classes::TRANSCEIVER.to_string())
            } else if SLOTTED_SUFFIXED.is_match(&row.name) {
                // duplicate secondary transceiver entry, keep the primary only
                None
            } else {
                Some(classes::IP_BOARD.to_string())
            }
        }
        raw::OTHER => {
            if descr.contains("switch processor") {
                Some(classes::SWITCH_PROCESSOR.to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Normalizes one discovery payload into a [`DiscoveredTree`].
///
/// Fatal when the payload is empty or carries no identifiable chassis row;
/// unclassifiable rows are reported and skipped without aborting.
pub fn normalize(
    rows: &[DiscoveredRow],
    device: &InventoryRef,
    model_hint: Option<&str>,
    session: &mut SyncSession,
) -> SyncResult<DiscoveredTree> {
    if rows.is_empty() {
        return Err(SyncError::EmptyPayload);
    }

    let chassis = rows
        .iter()
        .find(|r| r.class_code == raw::CHASSIS)
        .cloned()
        .ok_or_else(|| SyncError::NoRoot("no chassis row in the structure table".to_string()))?;

    if !rows.iter().any(|r| r.parent_id == chassis.id) {
        return Err(SyncError::NoRoot(format!(
            "chassis row {} parents no other row",
            chassis.id
        )));
    }

    let mut tree = DiscoveredTree {
        chassis: Some(chassis.clone()),
        ..DiscoveredTree::default()
    };

    // raw adjacency over usable rows, insertion order preserved
    let mut raw_children: HashMap<&str, Vec<&DiscoveredRow>> = HashMap::new();
    for row in rows
        .iter()
        .filter(|r| is_usable(r.class_code, &r.description))
    {
        raw_children.entry(&row.parent_id).or_default().push(row);
    }

    // classify everything reachable from the chassis; unclassifiable rows
    // (and their subtrees) fall out of the run
    let mut stack = vec![chassis.id.as_str()];
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(&chassis.id);
    while let Some(parent_id) = stack.pop() {
        let Some(children) = raw_children.get(parent_id) else {
            continue;
        };
        for row in children {
            if !seen.insert(&row.id) {
                debug!(id = %row.id, "cyclic containment in discovery payload, skipping");
                continue;
            }
            if row.class_code == raw::CHASSIS {
                continue;
            }
            match classify(row, &device.class, model_hint) {
                Some(class) => {
                    tree.children
                        .entry(parent_id.to_string())
                        .or_default()
                        .push(row.id.clone());
                    tree.nodes.insert(
                        row.id.clone(),
                        ClassifiedNode {
                            row: (*row).clone(),
                            class,
                        },
                    );
                    stack.push(&row.id);
                }
                None if row.class_code == raw::MODULE && SLOTTED_SUFFIXED.is_match(&row.name) => {
                    // silent skip: duplicate transceiver entry
                }
                None => {
                    session.log(Finding::error(
                        format!("{} (raw class {})", row.name, row.class_code),
                        "discovered row could not be classified, skipped",
                    ));
                }
            }
        }
    }

    let branches = extract_branches(&tree, &chassis.id);
    tree.branches = branches;
    let class_pairs = collect_class_pairs(&tree, &chassis.id, &device.class);
    tree.class_pairs = class_pairs;

    Ok(tree)
}

/// Decomposes the classified adjacency into branches: one path per leaf,
/// from a first-level device child down to the leaf. A port ends its branch
/// even when the source reports children below it.
fn extract_branches(tree: &DiscoveredTree, chassis_id: &str) -> Vec<Vec<String>> {
    let mut branches = Vec::new();
    let Some(first_level) = tree.children.get(chassis_id) else {
        return branches;
    };

    // explicit stack, most recent first so sibling order is preserved
    let mut stack: Vec<(String, Vec<String>)> = first_level
        .iter()
        .rev()
        .map(|id| (id.clone(), Vec::new()))
        .collect();
    let mut visited: HashSet<String> = HashSet::new();

    while let Some((id, mut path)) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let Some(node) = tree.nodes.get(&id) else {
            continue;
        };
        path.push(id.clone());

        let children = tree.children.get(&id);
        let ends_here = classes::is_interface(&node.class)
            || children.map_or(true, |c| c.is_empty());
        if ends_here {
            branches.push(path);
            continue;
        }
        if let Some(children) = children {
            for child in children.iter().rev() {
                stack.push((child.clone(), path.clone()));
            }
        }
    }
    branches
}

/// Collects the observed parent-class -> child-classes pairs, the device
/// root's own first level included.
fn collect_class_pairs(
    tree: &DiscoveredTree,
    chassis_id: &str,
    root_class: &str,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut pairs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (parent_id, child_ids) in &tree.children {
        let parent_class = if parent_id == chassis_id {
            root_class.to_string()
        } else {
            match tree.nodes.get(parent_id) {
                Some(node) => node.class.clone(),
                None => continue,
            }
        };
        for child_id in child_ids {
            if let Some(child) = tree.nodes.get(child_id) {
                pairs
                    .entry(parent_class.clone())
                    .or_default()
                    .insert(child.class.clone());
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use netinv_common::classes;

    fn row(id: &str, parent: &str, code: u32, name: &str, descr: &str) -> DiscoveredRow {
        DiscoveredRow {
            id: id.to_string(),
            parent_id: parent.to_string(),
            class_code: code,
            name: name.to_string(),
            description: descr.to_string(),
            vendor: String::new(),
            model: String::new(),
            serial: String::new(),
            firmware: String::new(),
        }
    }

    fn device() -> InventoryRef {
        InventoryRef::new("oid-1", "Router", "edge-1")
    }

    fn classify_row(r: &DiscoveredRow) -> Option<String> {
        classify(r, "Router", None)
    }

    #[test]
    fn chassis_maps_to_root_class() {
        let r = row("1", "0", raw::CHASSIS, "CISCO2901/K9", "2901 chassis");
        assert_eq!(classify_row(&r).as_deref(), Some("Router"));
    }

    #[test]
    fn usb_port_by_name() {
        let r = row("9", "1", raw::PORT, "usb0", "external usb");
        assert_eq!(classify_row(&r).as_deref(), Some(classes::USB_PORT));
    }

    #[test]
    fn electrical_port_by_description() {
        let r = row("9", "1", raw::PORT, "Fa0/1", "FastEthernet port");
        assert_eq!(classify_row(&r).as_deref(), Some(classes::ELECTRICAL_PORT));
    }

    #[test]
    fn optical_port_fallback() {
        let r = row("9", "1", raw::PORT, "Gi0/0/1", "GigabitEthernet");
        assert_eq!(classify_row(&r).as_deref(), Some(classes::OPTICAL_PORT));
    }

    #[test]
    fn model_hint_forces_electrical() {
        let r = row("9", "1", raw::PORT, "Gi0/1", "GigabitEthernet");
        assert_eq!(
            classify(&r, "Router", Some("WS-C2960C-8TC-L")).as_deref(),
            Some(classes::ELECTRICAL_PORT)
        );
    }

    #[test]
    fn container_is_slot_unless_disk() {
        let slot = row("5", "1", raw::CONTAINER, "slot 0/1", "chassis slot");
        assert_eq!(classify_row(&slot).as_deref(), Some(classes::SLOT));
        let disk = row("5", "1", raw::CONTAINER, "disk0", "Disk container");
        assert_eq!(classify_row(&disk), None);
    }

    #[test]
    fn power_supply_rules() {
        let psu = row("6", "1", raw::POWER_SUPPLY, "Power Supply 0", "psu");
        assert_eq!(classify_row(&psu).as_deref(), Some(classes::POWER_PORT));
        let module = row("6", "1", raw::POWER_SUPPLY, "Fan Module 1", "fan tray");
        assert_eq!(classify_row(&module).as_deref(), Some(classes::HYBRID_BOARD));
    }

    #[test]
    fn module_transceiver_rules() {
        let slotted = row("9", "2", raw::MODULE, "Gi0/0/0/1", "");
        assert_eq!(classify_row(&slotted).as_deref(), Some(classes::TRANSCEIVER));
        let sfp = row("9", "2", raw::MODULE, "module 0", "10G SFP+ transceiver");
        assert_eq!(classify_row(&sfp).as_deref(), Some(classes::TRANSCEIVER));
        let spa = row("9", "2", raw::MODULE, "SPA-1", "spa adapter sfp");
        assert_eq!(classify_row(&spa).as_deref(), Some(classes::IP_BOARD));
        let board = row("9", "2", raw::MODULE, "board 0/0", "line card");
        assert_eq!(classify_row(&board).as_deref(), Some(classes::IP_BOARD));
        let duplicate = row("9", "2", raw::MODULE, "0/0/0/1-GigabitEthernet", "");
        assert_eq!(classify_row(&duplicate), None);
    }

    #[test]
    fn switch_processor_needs_description() {
        let sp = row("7", "1", raw::OTHER, "SP", "switch processor");
        assert_eq!(classify_row(&sp).as_deref(), Some(classes::SWITCH_PROCESSOR));
        let sensor = row("7", "1", raw::OTHER, "temp", "temperature sensor");
        assert!(!is_usable(raw::OTHER, "temperature sensor"));
        assert_eq!(classify_row(&sensor), None);
    }

    #[test]
    fn empty_payload_is_fatal() {
        let mut session = SyncSession::new(device());
        let err = normalize(&[], &device(), None, &mut session).unwrap_err();
        assert!(matches!(err, SyncError::EmptyPayload));
    }

    #[test]
    fn missing_chassis_is_fatal() {
        let rows = vec![row("5", "1", raw::CONTAINER, "slot 0/1", "slot")];
        let mut session = SyncSession::new(device());
        let err = normalize(&rows, &device(), None, &mut session).unwrap_err();
        assert!(matches!(err, SyncError::NoRoot(_)));
    }

    fn sample_rows() -> Vec<DiscoveredRow> {
        vec![
            row("1", "0", raw::CHASSIS, "CISCO-ASR", "ASR chassis"),
            row("1001", "1", raw::CONTAINER, "slot 0/1", "chassis slot"),
            row("1002", "1001", raw::MODULE, "board 0/1", "line card"),
            row("1003", "1002", raw::PORT, "Gi0/1/0", "GigabitEthernet"),
            row("1004", "1002", raw::PORT, "Gi0/1/1", "GigabitEthernet"),
            row("1005", "1", raw::POWER_SUPPLY, "Power Supply 0", "psu"),
        ]
    }

    #[test]
    fn branches_run_first_level_to_leaf() {
        let mut session = SyncSession::new(device());
        let tree = normalize(&sample_rows(), &device(), None, &mut session).unwrap();
        assert_eq!(
            tree.branches,
            vec![
                vec!["1001".to_string(), "1002".to_string(), "1003".to_string()],
                vec!["1001".to_string(), "1002".to_string(), "1004".to_string()],
                vec!["1005".to_string()],
            ]
        );
    }

    #[test]
    fn class_pairs_include_root() {
        let mut session = SyncSession::new(device());
        let tree = normalize(&sample_rows(), &device(), None, &mut session).unwrap();
        let root_children = tree.class_pairs.get("Router").unwrap();
        assert!(root_children.contains(classes::SLOT));
        assert!(root_children.contains(classes::POWER_PORT));
        assert!(tree.class_pairs.get(classes::SLOT).unwrap().contains(classes::IP_BOARD));
        assert!(tree.class_pairs.get(classes::IP_BOARD).unwrap().contains(classes::OPTICAL_PORT));
    }

    #[test]
    fn unclassifiable_row_reports_and_continues() {
        let mut rows = sample_rows();
        rows.push(row("2000", "1", raw::PORT, "", ""));
        let mut session = SyncSession::new(device());
        let tree = normalize(&rows, &device(), None, &mut session).unwrap();
        assert!(!tree.nodes.contains_key("2000"));
        assert_eq!(session.findings().len(), 1);
    }

    #[test]
    fn cyclic_containment_terminates() {
        let mut rows = sample_rows();
        rows.push(row("3000", "1005", raw::CONTAINER, "loop a", "slot"));
        rows.push(row("3001", "3000", raw::CONTAINER, "loop b", "slot"));
        // the same id reported again under its own descendant closes a loop
        rows.push(row("3000", "3001", raw::CONTAINER, "loop a", "slot"));
        let mut session = SyncSession::new(device());
        // must not hang or overflow
        let tree = normalize(&rows, &device(), None, &mut session).unwrap();
        assert!(tree.nodes.contains_key("3001"));
        assert!(!tree.branches.is_empty());
    }
}
