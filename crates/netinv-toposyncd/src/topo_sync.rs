//! TopoSync - the device-topology reconciliation engine.
//!
//! One instance reconciles one device. A run is strictly sequential: the
//! payload is normalized, the containment schema brought up to date, the
//! persisted structure read, branches matched and mutated, stale nodes
//! removed, and the flat interface table reconciled. All run-scoped state
//! lives in a session created per call, so the engine is re-entrant per run;
//! the caller must still guarantee at most one concurrent run per device,
//! since concurrent runs can double-create nodes.

use tracing::{info, instrument};

use netinv_common::{
    classes, compare_attributes, Finding, InventoryRef, InventoryStore, SyncResult,
};

use crate::branch_sync;
use crate::discovery::{self, DiscoveryPayload};
use crate::executor::Executor;
use crate::hierarchy;
use crate::if_sync;
use crate::list_types::ListTypeResolver;
use crate::session::SyncSession;
use crate::snapshot;

/// Reconciles discovery payloads into the persisted inventory for one device.
pub struct TopoSync<'a, S: ?Sized> {
    store: &'a S,
    device: InventoryRef,
    model_hint: Option<String>,
}

impl<'a, S: InventoryStore + ?Sized> TopoSync<'a, S> {
    pub fn new(store: &'a S, device: InventoryRef) -> Self {
        Self {
            store,
            device,
            model_hint: None,
        }
    }

    /// Sets the device-model hint some classification rules key off.
    pub fn with_model_hint(mut self, hint: impl Into<String>) -> Self {
        self.model_hint = Some(hint.into());
        self
    }

    /// Runs one reconciliation and returns the ordered finding log.
    ///
    /// Setup failures (unusable payload, unreadable device) propagate before
    /// any mutation; after setup every failure is a per-node finding.
    #[instrument(skip_all, fields(device = %self.device))]
    pub async fn sync(&self, payload: &DiscoveryPayload) -> SyncResult<Vec<Finding>> {
        // re-read the root so matching sees its current display name
        let root = self
            .store
            .object(&self.device.class, &self.device.id)
            .await?;
        let device = root.to_ref();
        let mut session = SyncSession::new(device.clone());
        session.mark_matched(&device.id);

        let tree = discovery::normalize(
            &payload.structure,
            &device,
            self.model_hint.as_deref(),
            &mut session,
        )?;
        info!(
            branches = tree.branches.len(),
            interfaces = payload.interfaces.len(),
            "payload normalized"
        );

        hierarchy::update_class_hierarchy(self.store, &mut session, &tree.class_pairs).await;

        let mut snap = snapshot::read_snapshot(self.store, &mut session, &device).await?;

        let mut resolver = ListTypeResolver::new();
        self.update_root(&mut session, &mut resolver, &root, &tree)
            .await;

        branch_sync::reconcile_branches(self.store, &mut session, &mut resolver, &tree, &mut snap)
            .await;
        branch_sync::delete_stale(self.store, &mut session, &snap).await;

        if_sync::reconcile_interfaces(self.store, &mut session, &mut snap, &payload.interfaces)
            .await;

        Ok(session.into_findings())
    }

    /// Merges the chassis row's attribute delta into the device root.
    /// The root is updated in place, never recreated, and its display name
    /// is left to the operator.
    async fn update_root(
        &self,
        session: &mut SyncSession,
        resolver: &mut ListTypeResolver,
        root: &netinv_common::InventoryObject,
        tree: &discovery::DiscoveredTree,
    ) {
        let Some(chassis) = &tree.chassis else {
            return;
        };
        let mut incoming = branch_sync::build_attributes(
            self.store, session, resolver, chassis, &root.name,
        )
        .await;
        incoming.remove(classes::attrs::NAME);
        let delta = compare_attributes(&root.attributes, &incoming);
        Executor::new(self.store)
            .update(session, &root.to_ref(), &delta)
            .await;
    }
}
