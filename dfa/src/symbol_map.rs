// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::BTreeMap;

use crate::symbol_set::SymbolSet;

/// A bijection between symbol sets and small integer identifiers.
///
/// Identifiers count from zero in the order the sets were first interned.
#[derive(Debug, Default, Clone)]
pub struct SymbolMap {
    id_for_symbols: BTreeMap<SymbolSet, usize>,
    symbols_for_id: Vec<SymbolSet>,
}

impl SymbolMap {
    pub fn new() -> Self {
        SymbolMap::default()
    }

    pub fn count_sets(&self) -> usize {
        self.symbols_for_id.len()
    }

    /// Returns the identifier for a set of symbols, assigning a new one as needed.
    pub fn identifier_for_symbols(&mut self, symbols: &SymbolSet) -> usize {
        if let Some(&id) = self.id_for_symbols.get(symbols) {
            return id;
        }
        let new_id = self.symbols_for_id.len();
        self.id_for_symbols.insert(symbols.clone(), new_id);
        self.symbols_for_id.push(symbols.clone());
        new_id
    }

    /// Returns the identifier for a set of symbols if it is present in the map.
    pub fn find_identifier_for_symbols(&self, symbols: &SymbolSet) -> Option<usize> {
        self.id_for_symbols.get(symbols).copied()
    }

    pub fn symbols_for_id(&self, identifier: usize) -> &SymbolSet {
        &self.symbols_for_id[identifier]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &SymbolSet)> {
        self.symbols_for_id.iter().enumerate()
    }

    /// Slow check for overlapping sets; deduplicated maps must return false.
    pub fn has_duplicates(&self) -> bool {
        for (check_id, check_set) in self.iter() {
            for check_range in check_set.iter() {
                for (against_id, against_set) in self.iter() {
                    if against_id == check_id {
                        continue;
                    }
                    for against_range in against_set.iter() {
                        if against_range.overlaps(check_range) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::SymbolRange;

    #[test]
    fn interning_returns_existing_identifiers() {
        let mut map = SymbolMap::new();
        let first = SymbolSet::from(SymbolRange::new(0, 10));
        let second = SymbolSet::from(SymbolRange::new(10, 20));
        let id_a = map.identifier_for_symbols(&first);
        let id_b = map.identifier_for_symbols(&second);
        assert_ne!(id_a, id_b);
        assert_eq!(map.identifier_for_symbols(&first), id_a);
        assert_eq!(map.find_identifier_for_symbols(&second), Some(id_b));
        assert_eq!(map.count_sets(), 2);
        assert_eq!(map.symbols_for_id(id_a), &first);
    }

    #[test]
    fn duplicate_detection() {
        let mut map = SymbolMap::new();
        map.identifier_for_symbols(&SymbolSet::from(SymbolRange::new(0, 20)));
        assert!(!map.has_duplicates());
        map.identifier_for_symbols(&SymbolSet::from(SymbolRange::new(10, 30)));
        assert!(map.has_duplicates());
    }
}
