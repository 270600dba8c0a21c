use ahash::HashSet;
use itertools::Itertools as _;

use super::geometry::{contains_rect, overlaps};
use super::store::LayoutStore;

/// Human-readable descriptions of everything that is wrong with the store's arrangement.
///
/// Empty means healthy. Overlaps are reported separately by [`overlapping_pairs`] since a
/// drop can legitimately leave two widgets overlapping until the push settles.
pub fn layout_integrity_issues<Content>(store: &LayoutStore<Content>) -> Vec<String> {
    let mut issues: Vec<String> = Vec::new();
    let layout = store.layout();
    let bounds = store.bounds();

    let mut seen: HashSet<&str> = HashSet::default();
    for item in &layout.items {
        if !seen.insert(item.id.as_str()) {
            issues.push(format!("integrity: duplicate layout item {}", item.id));
        }

        let Some(widget) = store.widget(&item.id) else {
            issues.push(format!("integrity: layout item {} has no widget", item.id));
            continue;
        };

        if !item.rect.is_finite() {
            issues.push(format!("integrity: {} has non-finite rect {:?}", item.id, item.rect));
            continue;
        }
        if !widget.constraints.is_satisfied_by(item.rect.size()) {
            issues.push(format!(
                "integrity: {} size {:?} violates {:?}",
                item.id,
                item.rect.size(),
                widget.constraints
            ));
        }
        if !contains_rect(bounds, item.rect) {
            issues.push(format!(
                "integrity: {} rect {:?} outside container {:?}",
                item.id, item.rect, bounds
            ));
        }
    }

    let z_sorted: Vec<&str> = layout.z_order.iter().map(|id| id.as_str()).sorted().collect();
    let items_sorted: Vec<&str> = layout.items.iter().map(|i| i.id.as_str()).sorted().collect();
    if z_sorted != items_sorted {
        issues.push(format!(
            "integrity: z-order {z_sorted:?} does not match items {items_sorted:?}"
        ));
    }

    issues
}

/// Pairs of placed widgets whose rects overlap.
pub fn overlapping_pairs<Content>(store: &LayoutStore<Content>) -> Vec<(String, String)> {
    store
        .placed_rects()
        .iter()
        .tuple_combinations()
        .filter(|((_, a), (_, b))| overlaps(*a, *b))
        .map(|((a, _), (b, _))| (a.to_string(), b.to_string()))
        .collect()
}

pub(crate) fn debug_check<Content>(store: &LayoutStore<Content>, context: &str) {
    for issue in layout_integrity_issues(store) {
        log::warn!("{context}: {issue}");
    }
}
