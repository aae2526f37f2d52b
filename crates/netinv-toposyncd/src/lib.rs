//! toposyncd - device-topology reconciliation for the netinv inventory.
//!
//! Merges a freshly discovered device structure (physical chassis/slot/board/
//! port tree plus a flat logical-interface table) into the persisted
//! hierarchical inventory: new nodes are created, changed attributes updated,
//! reparented nodes moved, stale nodes deleted and logical interfaces related
//! to service records, while unchanged nodes keep their identity across runs.
//!
//! # Passes
//!
//! 1. [`discovery`]: classify raw rows, build the filtered adjacency
//! 2. [`hierarchy`]: declare newly observed containment pairs in the schema
//! 3. [`snapshot`]: read the persisted tree into branches and registries
//! 4. [`branch_sync`]: align discovered branches against persisted ones
//! 5. [`if_sync`]: reconcile the flat interface table
//!
//! [`TopoSync`] wires the passes together; [`session::SyncSession`] carries
//! the run-scoped state (identity map, matched set, finding log). Matching is
//! a bounded prefix/suffix alignment over real device trees, not a general
//! tree diff.

pub mod branch_sync;
pub mod discovery;
pub mod executor;
pub mod hierarchy;
pub mod if_sync;
pub mod list_types;
pub mod session;
pub mod snapshot;
pub mod topo_sync;

pub use discovery::{DiscoveredRow, DiscoveryPayload, InterfaceRow};
pub use session::SyncSession;
pub use topo_sync::TopoSync;
