// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::{BTreeMap, BTreeSet};

use crate::range::SymbolRange;
use crate::symbol_map::SymbolMap;
use crate::symbol_set::SymbolSet;

/// A symbol map whose sets are pairwise disjoint, together with the mapping
/// from each set identifier in the source map to the identifiers of the
/// fragments it was broken into.
#[derive(Debug, Default)]
pub struct RemappedSymbolMap {
    map: SymbolMap,
    old_to_new: BTreeMap<usize, BTreeSet<usize>>,
}

impl RemappedSymbolMap {
    /// Splits the overlapping sets in `source` so that any given symbol is in
    /// at most one set.
    ///
    /// Every span between two consecutive range endpoints that is covered by
    /// at least one source set becomes a set of the new map. An empty source
    /// set (epsilon) is carried through unchanged.
    pub fn deduplicate(source: &SymbolMap) -> Self {
        let mut remapped = RemappedSymbolMap::default();

        // Collect the endpoints of every range in every set
        let mut endpoints = BTreeSet::<i32>::new();
        for (_, symbols) in source.iter() {
            for range in symbols.iter() {
                endpoints.insert(range.lower());
                endpoints.insert(range.upper());
            }
        }
        let endpoints: Vec<i32> = endpoints.into_iter().collect();

        for (old_id, symbols) in source.iter() {
            if symbols.is_empty() {
                // Epsilon survives deduplication untouched
                let eps_id = remapped.map.identifier_for_symbols(&SymbolSet::epsilon());
                remapped.old_to_new.entry(old_id).or_default().insert(eps_id);
                continue;
            }
            for window in endpoints.windows(2) {
                let (lower, upper) = (window[0], window[1]);
                if symbols.contains(lower) {
                    let fragment = SymbolSet::from(SymbolRange::new(lower, upper));
                    let new_id = remapped.map.identifier_for_symbols(&fragment);
                    remapped.old_to_new.entry(old_id).or_default().insert(new_id);
                }
            }
        }

        remapped
    }

    pub fn map(&self) -> &SymbolMap {
        &self.map
    }

    pub fn into_map(self) -> SymbolMap {
        self.map
    }

    /// The identifiers in the new map that the old set was fragmented into.
    pub fn new_symbols(&self, old_identifier: usize) -> impl Iterator<Item = usize> + '_ {
        self.old_to_new
            .get(&old_identifier)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(remapped: &RemappedSymbolMap, old: usize) -> BTreeSet<usize> {
        remapped.new_symbols(old).collect()
    }

    #[test]
    fn overlapping_pair_splits_into_three() {
        let mut source = SymbolMap::new();
        let first = source.identifier_for_symbols(&SymbolSet::from(SymbolRange::new(0, 20)));
        let second = source.identifier_for_symbols(&SymbolSet::from(SymbolRange::new(10, 30)));

        let remapped = RemappedSymbolMap::deduplicate(&source);
        assert_eq!(remapped.map().count_sets(), 3);
        assert!(!remapped.map().has_duplicates());

        let low = remapped
            .map()
            .find_identifier_for_symbols(&SymbolSet::from(SymbolRange::new(0, 10)))
            .unwrap();
        let mid = remapped
            .map()
            .find_identifier_for_symbols(&SymbolSet::from(SymbolRange::new(10, 20)))
            .unwrap();
        let high = remapped
            .map()
            .find_identifier_for_symbols(&SymbolSet::from(SymbolRange::new(20, 30)))
            .unwrap();

        assert_eq!(ids(&remapped, first), [low, mid].iter().copied().collect());
        assert_eq!(ids(&remapped, second), [mid, high].iter().copied().collect());
    }

    #[test]
    fn nested_sets_split_along_every_endpoint() {
        let mut source = SymbolMap::new();
        let first = source.identifier_for_symbols(&SymbolSet::from(SymbolRange::new(10, 20)));
        let second = source.identifier_for_symbols(&SymbolSet::from(SymbolRange::new(30, 40)));
        let third = source.identifier_for_symbols(&SymbolSet::from(SymbolRange::new(0, 50)));

        let remapped = RemappedSymbolMap::deduplicate(&source);
        assert_eq!(remapped.map().count_sets(), 5);
        assert!(!remapped.map().has_duplicates());
        assert_eq!(ids(&remapped, first).len(), 1);
        assert_eq!(ids(&remapped, second).len(), 1);
        assert_eq!(ids(&remapped, third).len(), 5);
    }

    #[test]
    fn fragment_union_covers_the_original() {
        let mut source = SymbolMap::new();
        let mut original = SymbolSet::from(SymbolRange::new(5, 25));
        original.insert(SymbolRange::new(40, 60));
        let old_id = source.identifier_for_symbols(&original);
        source.identifier_for_symbols(&SymbolSet::from(SymbolRange::new(20, 45)));

        let remapped = RemappedSymbolMap::deduplicate(&source);
        let mut rebuilt = SymbolSet::new();
        for new_id in remapped.new_symbols(old_id) {
            rebuilt |= remapped.map().symbols_for_id(new_id);
        }
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn epsilon_survives() {
        let mut source = SymbolMap::new();
        let eps = source.identifier_for_symbols(&SymbolSet::epsilon());
        source.identifier_for_symbols(&SymbolSet::from(SymbolRange::new(0, 10)));

        let remapped = RemappedSymbolMap::deduplicate(&source);
        assert_eq!(ids(&remapped, eps).len(), 1);
        let new_eps = ids(&remapped, eps).into_iter().next().unwrap();
        assert!(remapped.map().symbols_for_id(new_eps).is_empty());
    }
}
