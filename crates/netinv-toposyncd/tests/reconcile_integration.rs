//! End-to-end reconciliation scenarios against the in-memory store.

use netinv_common::{classes, AttrMap, FindingKind, InventoryRef, InventoryStore, MemoryInventory};
use netinv_toposyncd::{DiscoveredRow, DiscoveryPayload, InterfaceRow, TopoSync};

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

fn iface(name: &str, alias: &str, speed: &str) -> InterfaceRow {
    InterfaceRow {
        name: name.to_string(),
        alias: alias.to_string(),
        speed: speed.to_string(),
    }
}

/// chassis -> slot 0/0 -> board 0/0 -> Gi0/0/1, plus an empty second slot
/// and a power supply.
fn sample_payload() -> DiscoveryPayload {
    DiscoveryPayload {
        structure: vec![
            {
                let mut chassis = row("1", "0", 3, "CISCO-ASR-9001", "ASR chassis");
                chassis.vendor = "Cisco".to_string();
                chassis.model = "ASR-9001".to_string();
                chassis.serial = "FOC111".to_string();
                chassis
            },
            row("1001", "1", 5, "slot 0/0", "chassis slot"),
            row("1002", "1001", 9, "board 0/0", "line card"),
            row("1003", "1002", 10, "Gi0/0/1", "GigabitEthernet"),
            row("1007", "1002", 10, "Gi0/0/2", "GigabitEthernet"),
            row("1004", "1", 5, "slot 0/1", "chassis slot"),
            row("1005", "1004", 9, "board 0/1", "line card"),
            row("1006", "1", 6, "Power Supply 0", "psu"),
        ],
        interfaces: vec![iface("Gi0/0/1", "", "1000"), iface("Gi0/0/2", "", "1000")],
    }
}

fn seed_device(store: &MemoryInventory) -> InventoryRef {
    store.seed_root("Router", "edge-1", AttrMap::new())
}

#[tokio::test]
async fn first_run_builds_the_tree() {
    let store = MemoryInventory::new();
    let device = seed_device(&store);
    let payload = sample_payload();

    let findings = TopoSync::new(&store, device.clone())
        .sync(&payload)
        .await
        .unwrap();

    assert!(findings.iter().all(|f| f.kind != FindingKind::Error));

    let slot = store.find_by_name(classes::SLOT, "slot 0/0").unwrap();
    let board = store.find_by_name(classes::IP_BOARD, "board 0/0").unwrap();
    let port = store.find_by_name(classes::OPTICAL_PORT, "gi0/0/1").unwrap();
    assert_eq!(store.parent_id(&slot.id).as_deref(), Some(device.id.as_str()));
    assert_eq!(store.parent_id(&board.id).as_deref(), Some(slot.id.as_str()));
    assert_eq!(store.parent_id(&port.id).as_deref(), Some(board.id.as_str()));

    // the sibling branch reuses the board created for the first port
    let port2 = store.find_by_name(classes::OPTICAL_PORT, "gi0/0/2").unwrap();
    assert_eq!(store.parent_id(&port2.id).as_deref(), Some(board.id.as_str()));

    // interface pass applied the reported speed to the new port
    assert_eq!(
        port.attributes.get(classes::attrs::HIGH_SPEED).unwrap(),
        "1000"
    );
    // root attributes merged in place, name untouched
    let root = store.object("Router", &device.id).await.unwrap();
    assert_eq!(root.name, "edge-1");
    assert_eq!(
        root.attributes.get(classes::attrs::DESCRIPTION).unwrap(),
        "ASR chassis"
    );
    assert!(root.attributes.contains_key(classes::attrs::VENDOR));
}

#[tokio::test]
async fn second_identical_run_is_silent() {
    let store = MemoryInventory::new();
    let device = seed_device(&store);
    let payload = sample_payload();

    TopoSync::new(&store, device.clone())
        .sync(&payload)
        .await
        .unwrap();
    let findings = TopoSync::new(&store, device)
        .sync(&payload)
        .await
        .unwrap();

    assert_eq!(findings, Vec::new());
}

#[tokio::test]
async fn unchanged_nodes_keep_their_ids() {
    let store = MemoryInventory::new();
    let device = seed_device(&store);
    let payload = sample_payload();

    TopoSync::new(&store, device.clone())
        .sync(&payload)
        .await
        .unwrap();
    let port_before = store.find_by_name(classes::OPTICAL_PORT, "gi0/0/1").unwrap();
    let slot_before = store.find_by_name(classes::SLOT, "slot 0/1").unwrap();

    TopoSync::new(&store, device).sync(&payload).await.unwrap();

    let port_after = store.find_by_name(classes::OPTICAL_PORT, "gi0/0/1").unwrap();
    let slot_after = store.find_by_name(classes::SLOT, "slot 0/1").unwrap();
    assert_eq!(port_before.id, port_after.id);
    assert_eq!(slot_before.id, slot_after.id);
}

#[tokio::test]
async fn reparented_port_moves_exactly_once() {
    let store = MemoryInventory::new();
    let device = seed_device(&store);
    TopoSync::new(&store, device.clone())
        .sync(&sample_payload())
        .await
        .unwrap();
    let port_before = store.find_by_name(classes::OPTICAL_PORT, "gi0/0/1").unwrap();

    // the port now reports under board 0/1
    let mut moved = sample_payload();
    moved
        .structure
        .iter_mut()
        .find(|r| r.id == "1003")
        .unwrap()
        .parent_id = "1005".to_string();

    let findings = TopoSync::new(&store, device).sync(&moved).await.unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::Success);
    assert!(findings[0].message.contains("moved under"));

    let port_after = store.find_by_name(classes::OPTICAL_PORT, "gi0/0/1").unwrap();
    let board_b = store.find_by_name(classes::IP_BOARD, "board 0/1").unwrap();
    assert_eq!(port_after.id, port_before.id);
    assert_eq!(
        store.parent_id(&port_after.id).as_deref(),
        Some(board_b.id.as_str())
    );
}

#[tokio::test]
async fn missing_first_level_child_is_deleted_once() {
    let store = MemoryInventory::new();
    let device = seed_device(&store);
    TopoSync::new(&store, device.clone())
        .sync(&sample_payload())
        .await
        .unwrap();

    let mut shrunk = sample_payload();
    shrunk.structure.retain(|r| r.id != "1004" && r.id != "1005");

    let findings = TopoSync::new(&store, device).sync(&shrunk).await.unwrap();

    let deletions: Vec<_> = findings
        .iter()
        .filter(|f| f.message == "deleted")
        .collect();
    assert_eq!(deletions.len(), 1);
    assert!(deletions[0].subject.contains("slot 0/1"));
    assert!(store.find_by_name(classes::SLOT, "slot 0/1").is_none());
    // the subtree went with it, without its own finding
    assert!(store.find_by_name(classes::IP_BOARD, "board 0/1").is_none());
}

#[tokio::test]
async fn description_change_yields_one_minimal_update() {
    // chassis -> slot -> board -> usb0 with an empty description
    let payload = DiscoveryPayload {
        structure: vec![
            row("1", "0", 3, "CISCO2901/K9", "2901 chassis"),
            row("1001", "1", 5, "slot 0", "chassis slot"),
            row("1002", "1001", 9, "board 0", "line card"),
            row("1003", "1002", 10, "usb0", ""),
        ],
        interfaces: vec![],
    };
    let store = MemoryInventory::new();
    let device = seed_device(&store);
    TopoSync::new(&store, device.clone())
        .sync(&payload)
        .await
        .unwrap();

    let mut changed = payload.clone();
    changed
        .structure
        .iter_mut()
        .find(|r| r.id == "1003")
        .unwrap()
        .description = "Uplink".to_string();

    let findings = TopoSync::new(&store, device).sync(&changed).await.unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::Success);
    assert_eq!(findings[0].message, "attributes updated: description=Uplink");
    assert!(findings[0].subject.contains("usb0"));
}

#[tokio::test]
async fn new_tunnel_row_creates_and_relates() {
    let store = MemoryInventory::new();
    let device = seed_device(&store);
    store.seed_service("MPLSService", "CustomerX-L3VPN");
    TopoSync::new(&store, device.clone())
        .sync(&sample_payload())
        .await
        .unwrap();

    let mut with_tunnel = sample_payload();
    with_tunnel
        .interfaces
        .push(iface("Tu0", "CustomerX-L3VPN", ""));

    let findings = TopoSync::new(&store, device.clone())
        .sync(&with_tunnel)
        .await
        .unwrap();

    assert_eq!(findings.len(), 2);
    assert!(findings.iter().all(|f| f.kind == FindingKind::Success));
    assert!(findings[0].message.contains("created in"));
    assert!(findings[1].message.contains("related to service"));

    let tunnel = store.find_by_name(classes::MPLS_TUNNEL, "tu0").unwrap();
    let service = store.services().await.unwrap()[0].clone();
    assert!(store.related(&service.id, &tunnel.id, classes::REL_USES));
}

#[tokio::test]
async fn root_rename_does_not_break_matching() {
    let store = MemoryInventory::new();
    let device = seed_device(&store);
    let payload = sample_payload();
    TopoSync::new(&store, device.clone())
        .sync(&payload)
        .await
        .unwrap();

    let mut rename = AttrMap::new();
    rename.insert(classes::attrs::NAME.to_string(), "edge-1-new".to_string());
    store
        .update_object("Router", &device.id, &rename)
        .await
        .unwrap();

    let findings = TopoSync::new(&store, device).sync(&payload).await.unwrap();

    // nothing recreated, nothing deleted: first-level children still match
    // against the renamed root
    assert_eq!(findings, Vec::new());
}

#[tokio::test]
async fn empty_payload_fails_before_any_mutation() {
    let store = MemoryInventory::new();
    let device = seed_device(&store);
    store.seed_child(&device, classes::SLOT, "slot 0/0", AttrMap::new());

    let payload = DiscoveryPayload::default();
    let result = TopoSync::new(&store, device).sync(&payload).await;

    assert!(result.is_err());
    // the pre-existing structure is untouched
    assert!(store.find_by_name(classes::SLOT, "slot 0/0").is_some());
    assert_eq!(store.object_count(), 2);
}

#[tokio::test]
async fn unclassifiable_rows_do_not_abort_the_run() {
    let mut payload = sample_payload();
    // port row with no name and no description cannot be classified
    payload.structure.push(row("9999", "1", 10, "", ""));

    let store = MemoryInventory::new();
    let device = seed_device(&store);
    let findings = TopoSync::new(&store, device)
        .sync(&payload)
        .await
        .unwrap();

    assert!(findings
        .iter()
        .any(|f| f.kind == FindingKind::Error && f.message.contains("could not be classified")));
    // the rest of the tree still synchronized
    assert!(store.find_by_name(classes::OPTICAL_PORT, "gi0/0/1").is_some());
}
