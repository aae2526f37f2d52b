//! Common infrastructure for the netinv synchronization daemons.
//!
//! This crate provides the pieces every sync daemon needs:
//!
//! - [`object`]: the inventory object model (`InventoryRef`, `InventoryObject`)
//! - [`classes`]: inventory class-name constants and predicates
//! - [`finding`]: per-run outcome records returned to the caller
//! - [`store`]: the [`InventoryStore`] trait, the boundary to the persistence
//!   backend owned by the platform
//! - [`memstore`]: [`MemoryInventory`], an in-memory reference backend used by
//!   tests and demo binaries
//! - [`ifname`]: interface-name filtering and canonical normalization
//! - [`error`]: error types shared across daemons
//!
//! # Architecture
//!
//! Sync daemons follow this pattern:
//!
//! 1. Receive a discovery payload from a polling source
//! 2. Read the persisted device structure through [`InventoryStore`]
//! 3. Reconcile the two, issuing create/update/move/delete calls
//! 4. Return an ordered list of [`Finding`]s for audit and display
//!
//! The store is always an external collaborator: nothing in this workspace
//! owns persistence.

pub mod classes;
pub mod error;
pub mod finding;
pub mod ifname;
pub mod memstore;
pub mod object;
pub mod store;

// Re-export commonly used items at crate root
pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use finding::{Finding, FindingKind};
pub use memstore::MemoryInventory;
pub use object::{compare_attributes, AttrMap, InventoryObject, InventoryRef};
pub use store::InventoryStore;
