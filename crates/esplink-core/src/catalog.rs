// ── Catalog cache ──
//
// Linkable external objects, keyed by id. Refresh is replace-all; a failed
// refresh keeps whatever was cached before.

use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use tracing::{debug, warn};

use esplink_api::PanelClient;

use crate::error::CoreError;
use crate::link::LinkValue;
use crate::model::CatalogEntry;

type Entries = IndexMap<String, CatalogEntry>;

/// Read-mostly cache of the object catalog.
pub struct CatalogCache {
    entries: ArcSwap<Entries>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(IndexMap::new()),
        }
    }

    /// Fetch the catalog and swap it in. On error the old catalog stays.
    pub async fn refresh(&self, client: &PanelClient) -> Result<usize, CoreError> {
        match client.list_objects().await {
            Ok(objects) => {
                let count = self.replace(objects.into_iter().map(CatalogEntry::from));
                debug!(count, "object catalog refreshed");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "object catalog refresh failed, keeping previous catalog");
                Err(e.into())
            }
        }
    }

    /// Replace the cached entries. Later duplicates of an id win.
    pub fn replace(&self, entries: impl IntoIterator<Item = CatalogEntry>) -> usize {
        let map: Entries = entries.into_iter().map(|e| (e.id.clone(), e)).collect();
        let count = map.len();
        self.entries.store(Arc::new(map));
        count
    }

    pub fn get(&self, id: &str) -> Option<CatalogEntry> {
        self.entries.load().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.load().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.entries.load().values().cloned().collect()
    }

    /// Human-readable target of a link, using the catalog description
    /// when the object is known.
    pub fn describe(&self, link: &LinkValue) -> String {
        match link {
            LinkValue::Unmapped => String::new(),
            LinkValue::Mapped { object, property } => match self.get(object) {
                Some(entry) if !entry.description.is_empty() => {
                    format!("{} ({object}).{property}", entry.description)
                }
                _ => link.to_link_string(),
            },
        }
    }

    /// Property names for an object, empty when unknown.
    pub fn properties(&self, id: &str) -> Vec<String> {
        self.entries
            .load()
            .get(id)
            .map(|e| e.properties.clone())
            .unwrap_or_default()
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(id: &str, description: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.into(),
            description: description.into(),
            properties: vec!["temp".into()],
        }
    }

    #[test]
    fn replace_keeps_order_and_dedupes() {
        let cache = CatalogCache::new();
        let n = cache.replace([entry("b", "B"), entry("a", "A"), entry("b", "B2")]);
        assert_eq!(n, 2);
        let ids: Vec<_> = cache.entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(cache.get("b").map(|e| e.description), Some("B2".into()));
    }

    #[test]
    fn describe_uses_catalog_description() {
        let cache = CatalogCache::new();
        cache.replace([entry("Room", "Living room")]);
        assert_eq!(
            cache.describe(&LinkValue::mapped("Room", "temp")),
            "Living room (Room).temp"
        );
        assert_eq!(cache.describe(&LinkValue::mapped("Gone", "x")), "Gone.x");
        assert_eq!(cache.describe(&LinkValue::Unmapped), "");
    }

    #[test]
    fn properties_for_unknown_object_are_empty() {
        let cache = CatalogCache::new();
        cache.replace([entry("Room", "")]);
        assert_eq!(cache.properties("Room"), vec!["temp".to_owned()]);
        assert!(cache.properties("Nope").is_empty());
        assert!(cache.contains("Room"));
        assert!(!cache.is_empty());
    }
}
