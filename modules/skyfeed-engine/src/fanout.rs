use std::collections::HashSet;

use futures::future::join_all;
use tracing::info;

use skyfeed_common::{ContentItem, Partition};

use crate::upstream::UpstreamClient;

/// Everything one cycle produced, after intra-cycle dedup.
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    pub items: Vec<ContentItem>,
    /// Partitions in dispatch order.
    pub partitions: Vec<Partition>,
    pub failed_partitions: Vec<Partition>,
}

impl CycleOutcome {
    /// At least one partition was dispatched and none of them succeeded.
    pub fn is_total_failure(&self) -> bool {
        !self.partitions.is_empty() && self.failed_partitions.len() == self.partitions.len()
    }
}

/// Dispatches one upstream call per partition concurrently and waits for all
/// of them to settle before returning.
#[derive(Clone)]
pub struct FanOutFetcher {
    upstream: UpstreamClient,
}

impl FanOutFetcher {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    pub async fn run_cycle(&self, partitions: &[Partition]) -> CycleOutcome {
        // join_all preserves input order, which is the dedup tie-break.
        let fetches = join_all(partitions.iter().map(|p| self.upstream.fetch(p))).await;

        let mut failed_partitions = Vec::new();
        let mut all_items = Vec::new();
        for fetch in fetches {
            if fetch.failed() {
                failed_partitions.push(fetch.partition);
            } else {
                all_items.extend(fetch.items);
            }
        }

        let fetched = all_items.len();
        let items = dedup_first(all_items);
        info!(
            partitions = partitions.len(),
            failed = failed_partitions.len(),
            fetched,
            unique = items.len(),
            "Fan-out cycle settled"
        );

        CycleOutcome {
            items,
            partitions: partitions.to_vec(),
            failed_partitions,
        }
    }
}

/// Drop later items whose id was already seen, keeping the first occurrence.
pub fn dedup_first(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::testing::{record, MockSearch};

    fn fetcher(search: MockSearch) -> FanOutFetcher {
        FanOutFetcher::new(UpstreamClient::new(
            Arc::new(search),
            15,
            "https://fallback/img.jpg".into(),
        ))
    }

    fn parts(names: &[&str]) -> Vec<Partition> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn earlier_partition_wins_duplicate() {
        let search = MockSearch::new()
            .on_search("nebula", vec![record("shared", "From nebula", "2020-01-01")])
            .on_search(
                "galaxy",
                vec![
                    record("shared", "From galaxy", "2020-01-01"),
                    record("g1", "Galaxy only", "2020-01-02"),
                ],
            );

        let outcome = fetcher(search).run_cycle(&parts(&["nebula", "galaxy"])).await;

        assert_eq!(outcome.items.len(), 2);
        let shared = outcome.items.iter().find(|i| i.id == "shared").unwrap();
        assert_eq!(shared.title, "From nebula");
        assert_eq!(shared.source_partition, "nebula");
    }

    #[tokio::test]
    async fn partial_failure_is_not_total() {
        let search = MockSearch::new()
            .failing("a")
            .failing("b")
            .failing("c")
            .on_search("d", vec![record("d1", "Survivor", "2021-06-01")]);

        let outcome = fetcher(search).run_cycle(&parts(&["a", "b", "c", "d"])).await;

        assert!(!outcome.is_total_failure());
        assert_eq!(outcome.failed_partitions.len(), 3);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].id, "d1");
    }

    #[tokio::test]
    async fn every_partition_failing_is_total() {
        let search = MockSearch::new().failing("a").failing("b");
        let outcome = fetcher(search).run_cycle(&parts(&["a", "b"])).await;
        assert!(outcome.is_total_failure());
        assert!(outcome.items.is_empty());
    }

    #[tokio::test]
    async fn empty_results_are_not_failures() {
        let search = MockSearch::new().on_search("a", vec![]).on_search("b", vec![]);
        let outcome = fetcher(search).run_cycle(&parts(&["a", "b"])).await;
        assert!(!outcome.is_total_failure());
        assert!(outcome.items.is_empty());
    }

    #[tokio::test]
    async fn all_partitions_dispatched() {
        let search = Arc::new(MockSearch::new());
        let fetcher = FanOutFetcher::new(UpstreamClient::new(
            search.clone(),
            15,
            "https://fallback/img.jpg".into(),
        ));

        fetcher.run_cycle(&parts(&["x", "y", "z"])).await;

        let mut calls = search.calls();
        calls.sort();
        assert_eq!(calls, parts(&["x", "y", "z"]));
    }

    #[test]
    fn dedup_keeps_first() {
        let items = vec![
            crate::testing::item("a", "first", 10),
            crate::testing::item("b", "b", 20),
            crate::testing::item("a", "second", 30),
        ];
        let out = dedup_first(items);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "first");
    }
}
