//! Cache of query table-id results, invalidated by component write ticks.
//!
//! Archetype scans ([`storage::Storage::supporting`]) are cheap for small worlds but
//! grow with the number of tables. Most queries are re-invoked every frame with an
//! unchanged shape, so this cache lets a query skip the rescan entirely when nothing
//! it cares about has been written since the last time it ran.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::ecs::{component, storage};

/// A cached table-id list for one `(components, with, without)` query shape.
#[derive(Debug, Clone)]
struct Entry {
    table_ids: Vec<storage::TableId>,
    last_validated_tick: u64,
}

/// Maps a query's component/filter shape to the list of tables it currently matches.
///
/// Entries are keyed by the sorted numeric ids of the query's required components, its
/// `with` filter, and its `without` filter, so two queries built in a different
/// parameter order (but with the same shape) share a cache entry. A cache hit still
/// costs a hash lookup and key format; it trades that for a full scan over every table
/// in the world.
#[derive(Debug, Default)]
pub struct Cache {
    entries: RefCell<HashMap<String, Entry>>,
}

impl Cache {
    fn key(components: &[component::Id], with: &[component::Id], without: &[component::Id]) -> String {
        fn fmt(ids: &[component::Id]) -> String {
            let mut sorted: Vec<usize> = ids.iter().map(component::Id::index).collect();
            sorted.sort_unstable();
            sorted.iter().map(usize::to_string).collect::<Vec<_>>().join(",")
        }
        format!("{}|{}|{}", fmt(components), fmt(with), fmt(without))
    }

    /// Look up, or rebuild and cache, the table list for a `(components, with,
    /// without)` query shape.
    ///
    /// `relevant` is the full set of component ids whose writes should invalidate this
    /// entry (`components ∪ with ∪ without`, including optionally-queried
    /// components). If the entry exists and every relevant component's last write
    /// tick is at or before the entry's `last_validated_tick`, the cached table list
    /// is returned without calling `rebuild`. Otherwise `rebuild` is invoked, the
    /// result is cached at `current_tick`, and returned.
    pub fn get_or_rebuild(
        &self,
        components: &[component::Id],
        with: &[component::Id],
        without: &[component::Id],
        relevant: &[component::Id],
        last_write_tick: impl Fn(component::Id) -> u64,
        current_tick: u64,
        rebuild: impl FnOnce() -> Vec<storage::TableId>,
    ) -> Vec<storage::TableId> {
        let key = Self::key(components, with, without);
        let max_write = relevant
            .iter()
            .map(|id| last_write_tick(*id))
            .max()
            .unwrap_or(0);

        if let Some(entry) = self.entries.borrow().get(&key)
            && max_write <= entry.last_validated_tick
        {
            return entry.table_ids.clone();
        }

        let table_ids = rebuild();
        self.entries.borrow_mut().insert(
            key,
            Entry {
                table_ids: table_ids.clone(),
                last_validated_tick: current_tick,
            },
        );
        table_ids
    }

    /// Drop every cached entry. Useful after bulk structural changes that don't go
    /// through the normal write-tracking path.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Number of distinct query shapes currently cached.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
