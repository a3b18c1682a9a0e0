// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::fmt;
use std::iter::FromIterator;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::slice;

use crate::range::SymbolRange;
use crate::MAX_SYMBOL;

/// An ordered collection of non-overlapping, non-adjacent symbol ranges.
///
/// Ranges that touch or overlap are merged on insertion, so two sets that
/// describe the same symbols always compare equal. The complement is taken
/// over `[0, MAX_SYMBOL)`; code points at or above `MAX_SYMBOL` are outside
/// the model.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolSet(Vec<SymbolRange>);

impl SymbolSet {
    pub fn new() -> Self {
        SymbolSet::default()
    }

    /// The empty set, which doubles as the epsilon transition label.
    pub fn epsilon() -> Self {
        SymbolSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count_ranges(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> slice::Iter<'_, SymbolRange> {
        self.0.iter()
    }

    pub fn contains(&self, symbol: i32) -> bool {
        // Find the last range starting at or before the symbol
        match self.0.binary_search_by(|r| r.lower().cmp(&symbol)) {
            Ok(_) => true,
            Err(0) => false,
            Err(index) => self.0[index - 1].contains(symbol),
        }
    }

    /// Merges a range into the set, coalescing with any ranges it touches.
    pub fn insert(&mut self, new_range: SymbolRange) {
        // Index of the first range whose lower bound is >= the new range's
        let mut first = self
            .0
            .partition_point(|r| r.lower() < new_range.lower());

        // The preceding range may reach far enough to merge with the new one
        if first > 0 && self.0[first - 1].upper() >= new_range.lower() {
            first -= 1;
        }

        if first == self.0.len() || !new_range.can_merge(&self.0[first]) {
            self.0.insert(first, new_range);
            return;
        }

        // Accumulate every range the new one touches into a single range
        let mut merged = new_range;
        let mut last = first;
        while last < self.0.len() && merged.can_merge(&self.0[last]) {
            merged = merged.merge(&self.0[last]);
            last += 1;
        }
        self.0.splice(first..last, Some(merged));
    }

    /// Removes the symbols in the given range from this set.
    pub fn exclude_range(&mut self, exclude: SymbolRange) {
        let mut first = self
            .0
            .partition_point(|r| r.lower() < exclude.lower());
        if first > 0 && self.0[first - 1].upper() > exclude.lower() {
            first -= 1;
        }
        if first == self.0.len() || !self.0[first].overlaps(&exclude) {
            return;
        }
        let mut last = first;
        while last < self.0.len() && self.0[last].overlaps(&exclude) {
            last += 1;
        }
        let initial = self.0[first];
        let final_range = self.0[last - 1];
        let mut replacement = Vec::new();
        if initial.lower() < exclude.lower() {
            replacement.push(SymbolRange::new(initial.lower(), exclude.lower()));
        }
        if final_range.upper() > exclude.upper() {
            replacement.push(SymbolRange::new(exclude.upper(), final_range.upper()));
        }
        self.0.splice(first..last, replacement);
    }

    pub fn exclude(&mut self, other: &SymbolSet) {
        for range in other.iter() {
            self.exclude_range(*range);
        }
    }

    /// Inverts the set in place, bounded by `[0, MAX_SYMBOL)`.
    pub fn invert(&mut self) {
        let mut gaps = Vec::with_capacity(self.0.len() + 1);
        let mut last_upper = 0;
        for range in self.0.iter() {
            if range.lower() > last_upper {
                gaps.push(SymbolRange::new(last_upper, range.lower()));
            }
            last_upper = range.upper();
        }
        if last_upper < MAX_SYMBOL {
            gaps.push(SymbolRange::new(last_upper, MAX_SYMBOL));
        }
        self.0 = gaps;
    }
}

impl From<SymbolRange> for SymbolSet {
    fn from(range: SymbolRange) -> Self {
        SymbolSet(vec![range])
    }
}

impl FromIterator<SymbolRange> for SymbolSet {
    fn from_iter<T: IntoIterator<Item = SymbolRange>>(iter: T) -> Self {
        let mut set = SymbolSet::new();
        for range in iter {
            set.insert(range);
        }
        set
    }
}

impl BitOrAssign<&SymbolSet> for SymbolSet {
    fn bitor_assign(&mut self, rhs: &SymbolSet) {
        for range in rhs.iter() {
            self.insert(*range);
        }
    }
}

impl BitOrAssign<SymbolRange> for SymbolSet {
    fn bitor_assign(&mut self, rhs: SymbolRange) {
        self.insert(rhs);
    }
}

impl BitOr for &SymbolSet {
    type Output = SymbolSet;

    fn bitor(self, rhs: &SymbolSet) -> SymbolSet {
        let mut result = self.clone();
        result |= rhs;
        result
    }
}

impl BitAnd for &SymbolSet {
    type Output = SymbolSet;

    fn bitand(self, rhs: &SymbolSet) -> SymbolSet {
        // a & b == !(!a | !b)
        let mut result = !self.clone();
        result |= &!rhs.clone();
        result.invert();
        result
    }
}

impl Not for SymbolSet {
    type Output = SymbolSet;

    fn not(mut self) -> SymbolSet {
        self.invert();
        self
    }
}

impl fmt::Display for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<epsilon>");
        }
        let mut string = "{".to_string();
        for (index, range) in self.iter().enumerate() {
            if index > 0 {
                string += ", ";
            }
            string += &range.to_string();
        }
        string += "}";
        write!(f, "{}", string)
    }
}
