use skyfeed_common::{ContentItem, ViewFilter, ALL_CATEGORIES};

/// Derive the slice the UI renders: category filter, then free-text filter,
/// then a stable sort under the filter's order. Pure; recompute on any change.
pub fn project(items: &[ContentItem], filter: &ViewFilter) -> Vec<ContentItem> {
    let category = normalized(&filter.category);
    let category = category.filter(|c| c != ALL_CATEGORIES);
    let query = normalized(&filter.query);

    let mut view: Vec<ContentItem> = items
        .iter()
        .filter(|item| category.as_deref().map_or(true, |c| matches_category(item, c)))
        .filter(|item| query.as_deref().map_or(true, |q| matches_query(item, q)))
        .cloned()
        .collect();

    view.sort_by(|a, b| filter.order.compare(&a.created_at, &b.created_at));
    view
}

fn normalized(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// `category` must already be lowercase.
fn matches_category(item: &ContentItem, category: &str) -> bool {
    item.source_partition.to_lowercase().contains(category)
        || item.title.to_lowercase().contains(category)
        || item.tags.iter().any(|t| t.to_lowercase().contains(category))
}

/// `query` must already be lowercase.
fn matches_query(item: &ContentItem, query: &str) -> bool {
    item.title.to_lowercase().contains(query)
        || item.description.to_lowercase().contains(query)
        || item.tags.iter().any(|t| t.to_lowercase().contains(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::item;
    use skyfeed_common::SortOrder;

    fn sample() -> Vec<ContentItem> {
        let mut a = item("a", "Crab Nebula", 300);
        a.source_partition = "nebula".into();
        a.description = "Supernova remnant".into();
        let mut b = item("b", "Olympus Mons", 100);
        b.source_partition = "mars".into();
        b.tags = vec!["Volcano".into()];
        let mut c = item("c", "Red planet sunset", 200);
        c.source_partition = "rover".into();
        c.tags = vec!["Mars".into()];
        vec![a, b, c]
    }

    fn ids(v: &[ContentItem]) -> Vec<&str> {
        v.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn all_category_keeps_everything_sorted() {
        let view = project(&sample(), &ViewFilter::default());
        assert_eq!(ids(&view), vec!["a", "c", "b"]);
    }

    #[test]
    fn category_matches_partition_title_or_tag() {
        let filter = ViewFilter {
            category: "MARS".into(),
            ..Default::default()
        };
        let view = project(&sample(), &filter);
        assert_eq!(ids(&view), vec!["c", "b"]);
    }

    #[test]
    fn query_matches_description_and_tags() {
        let filter = ViewFilter {
            query: "supernova".into(),
            ..Default::default()
        };
        assert_eq!(ids(&project(&sample(), &filter)), vec!["a"]);

        let filter = ViewFilter {
            query: "volcano".into(),
            ..Default::default()
        };
        assert_eq!(ids(&project(&sample(), &filter)), vec!["b"]);
    }

    #[test]
    fn category_and_query_combine() {
        let filter = ViewFilter {
            category: "mars".into(),
            query: "sunset".into(),
            order: SortOrder::OldestFirst,
        };
        assert_eq!(ids(&project(&sample(), &filter)), vec!["c"]);
    }

    #[test]
    fn oldest_first_order() {
        let filter = ViewFilter {
            order: SortOrder::OldestFirst,
            ..Default::default()
        };
        let view = project(&sample(), &filter);
        assert_eq!(ids(&view), vec!["b", "c", "a"]);
        assert!(SortOrder::OldestFirst.is_sorted(&view));
    }

    #[test]
    fn projection_does_not_mutate_input() {
        let items = sample();
        let before = items.clone();
        let _ = project(&items, &ViewFilter::default());
        assert_eq!(items, before);
    }
}
