// ── Generic reactive entity collection ──
//
// Ordered copy-on-write storage with push-based change notification via a
// `watch` channel. Each mutation runs inside one `send_if_modified`
// closure, so readers only ever see whole snapshots.

use std::sync::Arc;

use tokio::sync::watch;

/// An ordered, reactive collection for a single entity type.
///
/// The published value is the collection itself: readers clone the outer
/// `Arc` and keep a consistent view for as long as they like. Writers
/// clone-on-write only the entities they touch.
pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self { snapshot }
    }

    /// Swap in a new set of entities. Earlier snapshots stay valid but stale.
    pub(crate) fn replace_all(&self, entities: Vec<T>) {
        let values: Vec<Arc<T>> = entities.into_iter().map(Arc::new).collect();
        // `send_replace` updates unconditionally, even with zero receivers.
        self.snapshot.send_replace(Arc::new(values));
    }

    /// Run `f` against the entity at the first position matching `pred`.
    ///
    /// `f` gets a uniquely owned copy of the entity and returns whether it
    /// changed anything. Subscribers are notified only on change. Returns
    /// `None` when nothing matched, otherwise `f`'s verdict.
    pub(crate) fn modify_first<P, F>(&self, pred: P, f: F) -> Option<bool>
    where
        P: Fn(&T) -> bool,
        F: FnOnce(&mut T) -> bool,
    {
        let mut outcome = None;
        self.snapshot.send_if_modified(|snap| {
            let Some(idx) = snap.iter().position(|e| pred(&**e)) else {
                return false;
            };
            let entities = Arc::make_mut(snap);
            let changed = f(Arc::make_mut(&mut entities[idx]));
            outcome = Some(changed);
            changed
        });
        outcome
    }

    /// First entity matching `pred`.
    pub(crate) fn find(&self, pred: impl Fn(&T) -> bool) -> Option<Arc<T>> {
        self.snapshot.borrow().iter().find(|e| pred(&***e)).cloned()
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn replace_all_keeps_order() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.replace_all(vec!["b".into(), "a".into()]);
        let snap = col.snapshot();
        assert_eq!(*snap[0], "b");
        assert_eq!(*snap[1], "a");
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn old_snapshot_survives_replace() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.replace_all(vec!["old".into()]);
        let before = col.snapshot();
        col.replace_all(vec!["new".into()]);
        assert_eq!(*before[0], "old");
        assert_eq!(*col.snapshot()[0], "new");
    }

    #[test]
    fn modify_first_is_copy_on_write() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.replace_all(vec!["x".into(), "x".into()]);
        let before = col.snapshot();

        let outcome = col.modify_first(|s| s == "x", |s| {
            s.push('!');
            true
        });
        assert_eq!(outcome, Some(true));

        let after = col.snapshot();
        assert_eq!(*after[0], "x!");
        assert_eq!(*after[1], "x");
        assert_eq!(*before[0], "x");
    }

    #[test]
    fn modify_first_misses_without_notifying() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.replace_all(vec!["a".into()]);
        let mut rx = col.subscribe();
        rx.borrow_and_update();

        assert_eq!(col.modify_first(|s| s == "zzz", |_| true), None);
        assert_eq!(col.modify_first(|s| s == "a", |_| false), Some(false));
        assert!(!rx.has_changed().unwrap());
    }
}
