use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, info};

use skyfeed_common::Partition;

/// Built-in partition universe: astronomy topics used to slice the image search space.
pub const DEFAULT_PARTITIONS: &[&str] = &[
    "nebula",
    "galaxy",
    "mars",
    "jupiter",
    "saturn",
    "moon",
    "sun",
    "earth",
    "hubble",
    "james webb",
    "apollo",
    "astronaut",
    "international space station",
    "comet",
    "aurora",
    "supernova",
    "black hole",
    "milky way",
    "rover",
    "rocket launch",
    "solar eclipse",
    "asteroid",
    "venus",
    "star cluster",
];

/// Decides which partitions to dispatch on each aggregation cycle.
///
/// Unused partitions are drawn first. Once every partition has been consumed the
/// scheduler keeps sampling from the full universe until [`reset`](Self::reset)
/// clears the consumed set.
#[derive(Debug, Clone)]
pub struct PartitionScheduler {
    universe: Vec<Partition>,
    consumed: HashSet<Partition>,
}

impl PartitionScheduler {
    pub fn new<I, S>(universe: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Partition>,
    {
        let mut seen = HashSet::new();
        let universe: Vec<Partition> = universe
            .into_iter()
            .map(Into::into)
            .map(|p: Partition| p.trim().to_string())
            .filter(|p| !p.is_empty() && seen.insert(p.to_lowercase()))
            .collect();
        Self {
            universe,
            consumed: HashSet::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_PARTITIONS.iter().copied())
    }

    /// Pick the partitions for the next cycle and mark them consumed.
    ///
    /// `explicit_query`, when given and not already selected, is appended as an
    /// ad-hoc partition for this cycle only.
    pub fn select_next<R: Rng + ?Sized>(
        &mut self,
        batch_size: usize,
        explicit_query: Option<&str>,
        rng: &mut R,
    ) -> Vec<Partition> {
        let remaining: Vec<&Partition> = self
            .universe
            .iter()
            .filter(|p| !self.consumed.contains(*p))
            .collect();

        let mut selected: Vec<Partition> = if remaining.is_empty() {
            if !self.universe.is_empty() {
                info!(
                    universe = self.universe.len(),
                    "Partition universe exhausted, resampling from full set"
                );
            }
            self.universe
                .choose_multiple(rng, batch_size)
                .cloned()
                .collect()
        } else {
            remaining
                .choose_multiple(rng, batch_size)
                .map(|p| (*p).clone())
                .collect()
        };

        for p in &selected {
            self.consumed.insert(p.clone());
        }

        if let Some(query) = explicit_query.map(str::trim).filter(|q| !q.is_empty()) {
            let already = selected.iter().any(|p| p.eq_ignore_ascii_case(query));
            if !already {
                selected.push(query.to_string());
            }
        }

        debug!(
            selected = ?selected,
            consumed = self.consumed.len(),
            universe = self.universe.len(),
            "Partitions selected"
        );
        selected
    }

    /// Clear the consumed set. Only called on an explicit session reset.
    pub fn reset(&mut self) {
        self.consumed.clear();
    }

    /// True once every partition in the universe has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.universe.iter().all(|p| self.consumed.contains(p))
    }

    pub fn consumed(&self) -> &HashSet<Partition> {
        &self.consumed
    }

    pub fn universe(&self) -> &[Partition] {
        &self.universe
    }
}

impl Default for PartitionScheduler {
    fn default() -> Self {
        Self::with_defaults()
    }
}
