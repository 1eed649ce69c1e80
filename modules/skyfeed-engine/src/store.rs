use std::collections::HashMap;

use skyfeed_common::{ContentItem, Engagement, SessionStats, SortOrder};

use crate::fanout::dedup_first;
use crate::overlay::apply_engagement;

/// The deduplicated, ordered collection of items accumulated in one session.
///
/// Items are kept sorted by `created_at` under the active order after every
/// mutation. Ties fall back to insertion order.
#[derive(Debug, Clone, Default)]
pub struct AggregateStore {
    items: Vec<ContentItem>,
    /// id -> insertion sequence; doubles as the membership set.
    seqs: HashMap<String, u64>,
    /// id -> position in `items`, rebuilt after each sort.
    positions: HashMap<String, usize>,
    next_seq: u64,
    order: SortOrder,
}

impl AggregateStore {
    pub fn new(order: SortOrder) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    /// Drop everything and load `items` as the new contents. Returns the item count.
    pub fn replace(&mut self, items: Vec<ContentItem>) -> usize {
        self.items.clear();
        self.seqs.clear();
        self.positions.clear();
        self.next_seq = 0;
        self.merge(dedup_first(items))
    }

    /// Union `incoming` into the store by id. Items already present are
    /// discarded so the stored copy keeps its viewer state. Returns how many
    /// items were inserted.
    pub fn merge(&mut self, incoming: Vec<ContentItem>) -> usize {
        let mut inserted = 0;
        for item in incoming {
            if self.seqs.contains_key(&item.id) {
                continue;
            }
            self.seqs.insert(item.id.clone(), self.next_seq);
            self.next_seq += 1;
            self.items.push(item);
            inserted += 1;
        }
        self.sort();
        inserted
    }

    /// Change the active order and resort.
    pub fn resort(&mut self, order: SortOrder) {
        self.order = order;
        self.sort();
    }

    fn sort(&mut self) {
        let order = self.order;
        let seqs = &self.seqs;
        self.items.sort_by(|a, b| {
            order
                .compare(&a.created_at, &b.created_at)
                .then_with(|| seqs.get(&a.id).cmp(&seqs.get(&b.id)))
        });
        self.positions = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id.clone(), i))
            .collect();
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// All items, sorted under the active order.
    pub fn all(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&ContentItem> {
        self.positions.get(id).map(|&i| &self.items[i])
    }

    /// Mutable access for viewer-state updates. Callers must not touch
    /// `id` or `created_at`.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut ContentItem> {
        match self.positions.get(id) {
            Some(&i) => self.items.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seqs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// Ids of items the engagement overlay has not yet run for.
    pub fn ids_needing_enrichment(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| !i.enriched)
            .map(|i| i.id.clone())
            .collect()
    }

    /// Apply a batched lookup to the listed ids. Items already enriched are
    /// left alone. Returns how many items were updated.
    pub fn apply_engagement(&mut self, ids: &[String], records: &HashMap<String, Engagement>) -> usize {
        let mut updated = 0;
        for id in ids {
            if let Some(item) = self.get_mut(id) {
                if !item.enriched {
                    apply_engagement(item, records.get(id));
                    updated += 1;
                }
            }
        }
        updated
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            total_items: self.items.len(),
            total_engagement: self.items.iter().map(|i| i.engagement_count).sum(),
            total_views: self.items.iter().map(|i| i.view_count).sum(),
        }
    }
}
