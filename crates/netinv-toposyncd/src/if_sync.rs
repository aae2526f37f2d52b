//! Flat interface-table reconciliation.
//!
//! The second, independent pass: the interface table carries no structure,
//! only names, so rows are classified by name pattern and matched against
//! the registries the snapshot reader built. Plain names are ports, port
//! channels, loopbacks or tunnels; a dot marks a VLAN sub-interface and a
//! `.si.` marker a service instance, both hanging under their base
//! interface. Aliases that name an existing service become idempotent
//! `uses` relationships.

use tracing::instrument;

use netinv_common::{
    classes, ifname, AttrMap, Finding, InventoryRef, InventoryStore,
};

use crate::discovery::InterfaceRow;
use crate::executor::Executor;
use crate::session::SyncSession;
use crate::snapshot::{find_by_name, RegistryEntry, Snapshot};

/// Lazily loaded service catalog plus the idempotent relate operation.
struct ServiceLinker {
    services: Option<Vec<InventoryRef>>,
}

impl ServiceLinker {
    fn new() -> Self {
        Self { services: None }
    }

    async fn load<S: InventoryStore + ?Sized>(
        &mut self,
        store: &S,
        session: &mut SyncSession,
    ) -> &[InventoryRef] {
        if self.services.is_none() {
            match store.services().await {
                Ok(services) => self.services = Some(services),
                Err(err) => {
                    session.log(Finding::error(
                        "service catalog",
                        format!("services not read: {err}"),
                    ));
                    self.services = Some(Vec::new());
                }
            }
        }
        self.services.as_deref().unwrap_or_default()
    }

    /// Relates `target` to the service named by `alias`, if one exists and
    /// the relationship is not already in place.
    async fn relate<S: InventoryStore + ?Sized>(
        &mut self,
        store: &S,
        session: &mut SyncSession,
        alias: &str,
        target: &InventoryRef,
    ) {
        if alias.trim().is_empty() {
            return;
        }
        let service = self
            .load(store, session)
            .await
            .iter()
            .find(|s| s.name == alias)
            .cloned();
        let Some(service) = service else {
            session.log(Finding::warning(
                target.to_string(),
                format!("service {alias} not found, interface left unrelated"),
            ));
            return;
        };

        match store
            .special_attribute(&service.class, &service.id, classes::REL_USES)
            .await
        {
            Ok(related) if related.iter().any(|r| r.id == target.id) => {
                session.log(Finding::info(
                    target.to_string(),
                    format!("already related to service {}", service.name),
                ));
                return;
            }
            Ok(_) => {}
            Err(err) => {
                session.log(Finding::error(
                    target.to_string(),
                    format!("service relationships not read: {err}"),
                ));
                return;
            }
        }

        match store
            .create_special_relationship(
                &service.class,
                &service.id,
                &target.class,
                &target.id,
                classes::REL_USES,
            )
            .await
        {
            Ok(()) => session.log(Finding::success(
                target.to_string(),
                format!("related to service {}", service.name),
            )),
            Err(err) => session.log(Finding::error(
                target.to_string(),
                format!("not related to service {}: {err}", service.name),
            )),
        }
    }
}

/// Attribute map for a freshly created interface.
fn interface_attributes(name: &str, row: &InterfaceRow) -> AttrMap {
    let mut attrs = AttrMap::new();
    attrs.insert(classes::attrs::NAME.to_string(), name.to_string());
    if !row.speed.is_empty() {
        attrs.insert(classes::attrs::HIGH_SPEED.to_string(), row.speed.clone());
    }
    if !row.alias.is_empty() {
        attrs.insert(classes::attrs::IF_ALIAS.to_string(), row.alias.clone());
    }
    attrs
}

/// Delta for a matched interface: speed, alias, and the canonical rename.
fn interface_delta(entry: &RegistryEntry, canonical_name: &str, row: &InterfaceRow) -> AttrMap {
    let mut delta = AttrMap::new();
    if !row.speed.is_empty()
        && entry.obj.attributes.get(classes::attrs::HIGH_SPEED) != Some(&row.speed)
    {
        delta.insert(classes::attrs::HIGH_SPEED.to_string(), row.speed.clone());
    }
    if !row.alias.is_empty()
        && entry.obj.attributes.get(classes::attrs::IF_ALIAS) != Some(&row.alias)
    {
        delta.insert(classes::attrs::IF_ALIAS.to_string(), row.alias.clone());
    }
    if entry.obj.name != canonical_name {
        delta.insert(classes::attrs::NAME.to_string(), canonical_name.to_string());
    }
    delta
}

/// Reconciles the flat interface table against the registries, then deletes
/// the stale logical interfaces nothing matched.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn reconcile_interfaces<S: InventoryStore + ?Sized>(
    store: &S,
    session: &mut SyncSession,
    snapshot: &mut Snapshot,
    rows: &[InterfaceRow],
) {
    let device = session.device.clone();
    let executor = Executor::new(store);
    let mut linker = ServiceLinker::new();

    for row in rows {
        if !ifname::is_syncable(&row.name) {
            continue;
        }
        if row.name.contains('.') {
            reconcile_sub_interface(store, &executor, session, snapshot, &mut linker, row).await;
        } else {
            reconcile_plain_interface(
                store, &executor, session, snapshot, &mut linker, &device, row,
            )
            .await;
        }
    }

    // stale-logical cleanup: what no row matched is gone from the device
    for entry in snapshot
        .registry
        .virtual_ports
        .iter()
        .chain(&snapshot.registry.tunnels)
        .chain(&snapshot.registry.service_instances)
    {
        if !session.is_matched(&entry.obj.id) {
            executor.delete(session, &entry.to_ref()).await;
        }
    }
    // physical ports are conservative: report, never auto-delete
    for entry in &snapshot.registry.physical {
        if !session.is_matched(&entry.obj.id) {
            session.log(Finding::warning(
                entry.obj.to_string(),
                "port matched by neither the structure nor the interface table",
            ));
        }
    }
}

/// A plain (undotted) row: physical port, port channel, loopback or tunnel.
async fn reconcile_plain_interface<S: InventoryStore + ?Sized>(
    store: &S,
    executor: &Executor<'_, S>,
    session: &mut SyncSession,
    snapshot: &mut Snapshot,
    linker: &mut ServiceLinker,
    device: &InventoryRef,
    row: &InterfaceRow,
) {
    let lower = row.name.to_lowercase();
    let canonical = ifname::normalize(&row.name);

    let bucket: &[RegistryEntry] = if lower.starts_with("tu") {
        &snapshot.registry.tunnels
    } else if lower.starts_with("lo") || row.name.starts_with("Po") {
        &snapshot.registry.virtual_ports
    } else {
        &snapshot.registry.physical
    };

    if let Some(entry) = find_by_name(bucket, &row.name).cloned() {
        session.mark_matched(&entry.obj.id);
        let delta = interface_delta(&entry, &canonical, row);
        executor.update(session, &entry.to_ref(), &delta).await;
        linker
            .relate(store, session, &row.alias, &entry.to_ref())
            .await;
        return;
    }

    // nothing stored under that name: create, picking class and attachment
    // by name shape
    let (class, special, parent) = if lower.starts_with("tu") {
        (classes::MPLS_TUNNEL, true, device.clone())
    } else if lower.starts_with("lo") {
        (classes::VIRTUAL_PORT, true, device.clone())
    } else if row.name.starts_with("Po") && row.name.len() < 4 {
        (classes::PORT_CHANNEL, false, device.clone())
    } else if lower == "gi0" {
        (classes::ELECTRICAL_PORT, false, device.clone())
    } else if lower.starts_with("se") {
        (classes::SERIAL_PORT, false, device.clone())
    } else if let Some(xcvr) = find_by_name(&snapshot.registry.transceivers, &row.name) {
        // a transceiver named like the interface carries the new port
        (classes::OPTICAL_PORT, false, xcvr.to_ref())
    } else {
        if row.name.contains('/') {
            session.log(Finding::warning(
                row.name.clone(),
                "interface has no resolvable physical parent, left uncreated",
            ));
        }
        return;
    };

    let attrs = interface_attributes(&canonical, row);
    if let Some(id) = executor
        .create(session, class, &canonical, &parent, &attrs, None, special)
        .await
    {
        let created = RegistryEntry {
            obj: netinv_common::InventoryObject::new(id, class, canonical.clone(), attrs),
            parent,
        };
        linker
            .relate(store, session, &row.alias, &created.to_ref())
            .await;
        if class == classes::MPLS_TUNNEL {
            snapshot.registry.tunnels.push(created);
        } else if classes::is_physical_port(class) {
            snapshot.registry.physical.push(created);
        } else {
            snapshot.registry.virtual_ports.push(created);
        }
    }
}

/// A dotted row: VLAN sub-interface or service instance under its base
/// interface.
async fn reconcile_sub_interface<S: InventoryStore + ?Sized>(
    store: &S,
    executor: &Executor<'_, S>,
    session: &mut SyncSession,
    snapshot: &mut Snapshot,
    linker: &mut ServiceLinker,
    row: &InterfaceRow,
) {
    let base_name = ifname::base_interface(&row.name);
    let (segment, class) = match ifname::service_instance_segment(&row.name) {
        Some(segment) => (segment.to_string(), classes::SERVICE_INSTANCE),
        None => match ifname::sub_interface_segment(&row.name) {
            Some(segment) => (segment.to_string(), classes::VIRTUAL_PORT),
            None => return,
        },
    };

    let base = find_by_name(&snapshot.registry.physical, base_name)
        .or_else(|| find_by_name(&snapshot.registry.virtual_ports, base_name))
        .cloned();
    let Some(base) = base else {
        session.log(Finding::warning(
            row.name.clone(),
            format!("base interface {base_name} not found, row skipped"),
        ));
        return;
    };
    // the base interface itself is in use, even when only its children
    // appear in the table
    session.mark_matched(&base.obj.id);

    let bucket: &[RegistryEntry] = if class == classes::SERVICE_INSTANCE {
        &snapshot.registry.service_instances
    } else {
        &snapshot.registry.virtual_ports
    };
    let existing = bucket
        .iter()
        .find(|e| e.parent.id == base.obj.id && e.obj.name == segment)
        .cloned();

    if let Some(entry) = existing {
        session.mark_matched(&entry.obj.id);
        let delta = interface_delta(&entry, &segment, row);
        executor.update(session, &entry.to_ref(), &delta).await;
        linker
            .relate(store, session, &row.alias, &entry.to_ref())
            .await;
        return;
    }

    let attrs = interface_attributes(&segment, row);
    let base_ref = base.to_ref();
    if let Some(id) = executor
        .create(session, class, &segment, &base_ref, &attrs, None, false)
        .await
    {
        let created = RegistryEntry {
            obj: netinv_common::InventoryObject::new(id, class, segment, attrs),
            parent: base_ref.clone(),
        };
        linker
            .relate(store, session, &row.alias, &created.to_ref())
            .await;
        if class == classes::SERVICE_INSTANCE {
            snapshot.registry.service_instances.push(created);
        } else {
            snapshot.registry.virtual_ports.push(created);
        }
    }
}
