//! Splits one shared source list into several page sections ("Trending",
//! "Top Rated", "Action", ...) so that no identifier shows up twice.
//!
//! This is a heuristic bucketing pass, not a recommender. It guarantees only
//! that the sections are disjoint and that the result is deterministic for a
//! fixed source list and section order. Sections defined earlier win any
//! identifier that several predicates match.

use std::collections::HashSet;

use serde::Serialize;

use super::{CatalogItem, ContentId};

/// Identifiers already handed out during one assembly pass.
#[derive(Debug, Default, Clone)]
pub struct UsedIdSet {
    ids: HashSet<ContentId>,
}

impl UsedIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.ids.contains(id)
    }

    /// Returns false if the id was already claimed.
    pub fn claim(&mut self, id: ContentId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub struct SectionSpec<'a, T> {
    pub name: String,
    pub predicate: Box<dyn Fn(&T) -> bool + 'a>,
    pub quota: usize,
}

impl<'a, T> SectionSpec<'a, T> {
    pub fn new(name: impl Into<String>, quota: usize, predicate: impl Fn(&T) -> bool + 'a) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            quota,
        }
    }
}

impl<T> std::fmt::Debug for SectionSpec<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionSpec")
            .field("name", &self.name)
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatedSection {
    pub name: String,
    pub ids: Vec<ContentId>,
    pub quota: usize,
    /// How many of `ids` came from the unfiltered backfill.
    pub backfilled: usize,
}

impl AllocatedSection {
    /// Number of items missing to reach the quota. Not an error.
    pub fn shortfall(&self) -> usize {
        self.quota.saturating_sub(self.ids.len())
    }
}

/// Sections in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub sections: Vec<AllocatedSection>,
}

impl Allocation {
    pub fn get(&self, name: &str) -> Option<&AllocatedSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn total(&self) -> usize {
        self.sections.iter().map(|section| section.ids.len()).sum()
    }
}

pub fn allocate_unique<T: CatalogItem>(source: &[T], specs: &[SectionSpec<'_, T>]) -> Allocation {
    let mut used = UsedIdSet::new();
    let mut sections = Vec::with_capacity(specs.len());

    for spec in specs {
        let mut ids = Vec::with_capacity(spec.quota);

        for item in source {
            if ids.len() >= spec.quota {
                break;
            }
            let id = item.content_id();
            if (spec.predicate)(item) && !used.contains(id) {
                used.claim(id.clone());
                ids.push(id.clone());
            }
        }

        let matched = ids.len();
        for item in source {
            if ids.len() >= spec.quota {
                break;
            }
            let id = item.content_id();
            if !used.contains(id) {
                used.claim(id.clone());
                ids.push(id.clone());
            }
        }

        sections.push(AllocatedSection {
            name: spec.name.clone(),
            backfilled: ids.len() - matched,
            ids,
            quota: spec.quota,
        });
    }

    Allocation { sections }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SeriesId;

    fn id(n: u64) -> ContentId {
        ContentId::Series(SeriesId::new(n).unwrap())
    }

    fn source(n: u64) -> Vec<ContentId> {
        (1..=n).map(id).collect()
    }

    fn value(item: &ContentId) -> u64 {
        match item {
            ContentId::Series(s) => s.get(),
            ContentId::Movie(_) => 0,
        }
    }

    #[test]
    fn earlier_sections_win_shared_ids() {
        let source = source(10);
        let specs = vec![
            SectionSpec::new("a", 3, |i: &ContentId| value(i) % 2 == 0),
            SectionSpec::new("b", 3, |i: &ContentId| value(i) % 2 == 0),
        ];
        let allocation = allocate_unique(&source, &specs);

        assert_eq!(allocation.get("a").unwrap().ids, vec![id(2), id(4), id(6)]);
        assert_eq!(allocation.get("b").unwrap().ids, vec![id(8), id(10), id(1)]);
        assert_eq!(allocation.get("b").unwrap().backfilled, 1);
    }

    #[test]
    fn sections_are_disjoint() {
        let source = source(50);
        let specs = vec![
            SectionSpec::new("trending", 7, |_: &ContentId| true),
            SectionSpec::new("threes", 7, |i: &ContentId| value(i) % 3 == 0),
            SectionSpec::new("fives", 7, |i: &ContentId| value(i) % 5 == 0),
        ];
        let allocation = allocate_unique(&source, &specs);

        let mut seen = HashSet::new();
        for section in &allocation.sections {
            for id in &section.ids {
                assert!(seen.insert(id.clone()), "duplicate {id}");
            }
        }
        assert_eq!(allocation.total(), 21);
    }

    #[test]
    fn backfill_takes_unfiltered_items_in_source_order() {
        let source = source(6);
        let specs = vec![SectionSpec::new("big", 4, |i: &ContentId| value(i) > 5)];
        let allocation = allocate_unique(&source, &specs);
        let section = allocation.get("big").unwrap();
        assert_eq!(section.ids, vec![id(6), id(1), id(2), id(3)]);
        assert_eq!(section.backfilled, 3);
        assert_eq!(section.shortfall(), 0);
    }

    #[test]
    fn exhausted_source_reports_shortfall() {
        let source = source(5);
        let specs = vec![
            SectionSpec::new("first", 4, |_: &ContentId| true),
            SectionSpec::new("second", 4, |_: &ContentId| true),
        ];
        let allocation = allocate_unique(&source, &specs);
        assert_eq!(allocation.get("first").unwrap().shortfall(), 0);
        let second = allocation.get("second").unwrap();
        assert_eq!(second.ids, vec![id(5)]);
        assert_eq!(second.shortfall(), 3);
    }

    #[test]
    fn allocation_is_deterministic() {
        let source = source(30);
        let build = || {
            vec![
                SectionSpec::new("odd", 5, |i: &ContentId| value(i) % 2 == 1),
                SectionSpec::new("even", 5, |i: &ContentId| value(i) % 2 == 0),
            ]
        };
        assert_eq!(allocate_unique(&source, &build()), allocate_unique(&source, &build()));
    }

    #[test]
    fn duplicate_ids_in_source_are_allocated_once() {
        let source = vec![id(1), id(1), id(2)];
        let specs = vec![SectionSpec::new("all", 3, |_: &ContentId| true)];
        let allocation = allocate_unique(&source, &specs);
        assert_eq!(allocation.get("all").unwrap().ids, vec![id(1), id(2)]);
    }

    #[test]
    fn zero_quota_takes_nothing() {
        let source = source(3);
        let specs = vec![SectionSpec::new("none", 0, |_: &ContentId| true)];
        let allocation = allocate_unique(&source, &specs);
        assert!(allocation.get("none").unwrap().ids.is_empty());
    }
}
