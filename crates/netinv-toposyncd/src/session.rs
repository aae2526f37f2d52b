//! Run-scoped reconciliation state.
//!
//! Everything a run accumulates lives here and is discarded with the session:
//! the identity map from discovery ids to persisted ids, the set of persisted
//! nodes the run has accounted for, and the ordered finding log. Passing the
//! session explicitly keeps the engine re-entrant per run.

use std::collections::{HashMap, HashSet};

use netinv_common::{Finding, InventoryRef};

/// Mutable state threaded through every pass of one reconciliation run.
#[derive(Debug)]
pub struct SyncSession {
    /// The device root as currently persisted.
    pub device: InventoryRef,
    /// Ordered outcome log returned to the caller.
    findings: Vec<Finding>,
    /// Discovery-space id -> persisted id, for nodes matched or created
    /// earlier in the same run.
    identity: HashMap<String, String>,
    /// Persisted ids accounted for by this run; everything else is a
    /// staleness candidate.
    matched: HashSet<String>,
}

impl SyncSession {
    pub fn new(device: InventoryRef) -> Self {
        Self {
            device,
            findings: Vec::new(),
            identity: HashMap::new(),
            matched: HashSet::new(),
        }
    }

    /// Appends an outcome record.
    pub fn log(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Resolves a discovery-space id to the persisted id it mapped to
    /// earlier in this run.
    pub fn resolve(&self, discovery_id: &str) -> Option<&str> {
        self.identity.get(discovery_id).map(String::as_str)
    }

    /// Records a discovery-space id -> persisted id mapping.
    pub fn record_identity(&mut self, discovery_id: &str, persisted_id: &str) {
        self.identity
            .insert(discovery_id.to_string(), persisted_id.to_string());
    }

    /// Marks a persisted node as accounted for by this run.
    pub fn mark_matched(&mut self, persisted_id: &str) {
        self.matched.insert(persisted_id.to_string());
    }

    pub fn is_matched(&self, persisted_id: &str) -> bool {
        self.matched.contains(persisted_id)
    }

    /// Consumes the session, yielding the ordered finding log.
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    #[cfg(test)]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }
}
