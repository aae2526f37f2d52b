//! Vendor/model catalog resolution.
//!
//! Discovered vendor and model strings are free text; the inventory stores
//! them as references into catalog (list-type) classes. Resolution is exact
//! name match first, then a best-effort fuzzy compare, then creation. The
//! catalog only ever grows.

use std::collections::HashMap;

use netinv_common::{Finding, InventoryStore};

use crate::session::SyncSession;

/// Resolves free-text names to catalog item ids, creating items on demand.
///
/// Keeps a per-run cache so the same name is never resolved (or created)
/// twice in one run.
#[derive(Debug, Default)]
pub struct ListTypeResolver {
    resolved: HashMap<(String, String), String>,
}

impl ListTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `raw_name` inside the catalog `class`, creating the item if
    /// nothing matches. Returns `None` on empty input or store failure
    /// (reported as a finding).
    pub async fn resolve<S: InventoryStore + ?Sized>(
        &mut self,
        store: &S,
        session: &mut SyncSession,
        class: &str,
        raw_name: &str,
    ) -> Option<String> {
        let name = raw_name.trim();
        if name.is_empty() {
            return None;
        }
        let cache_key = (class.to_string(), name.to_string());
        if let Some(id) = self.resolved.get(&cache_key) {
            return Some(id.clone());
        }

        let items = match store.list_type_items(class).await {
            Ok(items) => items,
            Err(err) => {
                session.log(Finding::error(
                    format!("{name} [{class}]"),
                    format!("catalog lookup failed: {err}"),
                ));
                return None;
            }
        };

        if let Some(item) = items.iter().find(|i| i.name == name) {
            self.resolved.insert(cache_key, item.id.clone());
            return Some(item.id.clone());
        }
        if let Some(item) = best_fuzzy_match(name, &items) {
            self.resolved.insert(cache_key, item.id.clone());
            return Some(item.id.clone());
        }

        match store.create_list_type_item(class, name).await {
            Ok(id) => {
                session.log(Finding::success(
                    format!("{name} [{class}]"),
                    "added to the catalog",
                ));
                self.resolved.insert(cache_key, id.clone());
                Some(id)
            }
            Err(err) => {
                session.log(Finding::error(
                    format!("{name} [{class}]"),
                    format!("catalog item not created: {err}"),
                ));
                None
            }
        }
    }
}

/// Case-insensitive, then positional character-overlap comparison.
///
/// An existing item matches when every character position of the incoming
/// name lines up with it, which tolerates trailing revision suffixes on the
/// stored side but nothing else.
fn best_fuzzy_match<'a>(
    name: &str,
    items: &'a [netinv_common::InventoryRef],
) -> Option<&'a netinv_common::InventoryRef> {
    let wanted = name.trim().to_lowercase();
    for item in items {
        let existing = item.name.trim().to_lowercase();
        if wanted == existing {
            return Some(item);
        }
        let overlap = wanted
            .chars()
            .zip(existing.chars())
            .filter(|(a, b)| a == b)
            .count();
        if overlap == wanted.chars().count() {
            return Some(item);
        }
    }
    None
}
