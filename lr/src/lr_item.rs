// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::{btree_set, BTreeSet};
use std::fmt;
use std::iter::FromIterator;
use std::ops::{BitOr, BitOrAssign};

use contextfree::Grammar;

/// An LR(0) item: a rule with a dot position in `0..=rule.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LrItem {
    rule: usize,
    dot: usize,
}

impl LrItem {
    pub fn new(rule: usize) -> Self {
        Self { rule, dot: 0 }
    }

    pub fn rule(&self) -> usize {
        self.rule
    }

    pub fn dot(&self) -> usize {
        self.dot
    }

    pub fn shifted(&self) -> Self {
        Self {
            rule: self.rule,
            dot: self.dot + 1,
        }
    }

    pub fn is_reducible(&self, grammar: &Grammar) -> bool {
        self.dot >= grammar.rule(self.rule).len()
    }

    /// The item identifier after the dot, if any.
    pub fn next_symbol(&self, grammar: &Grammar) -> Option<usize> {
        grammar.rule(self.rule).items().get(self.dot).copied()
    }

    /// The item identifiers after the next symbol.
    pub fn rhs_tail<'a>(&self, grammar: &'a Grammar) -> &'a [usize] {
        let items = grammar.rule(self.rule).items();
        &items[(self.dot + 1).min(items.len())..]
    }
}

impl fmt::Display for LrItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(rule {}, dot {})", self.rule, self.dot)
    }
}

/// A set of lookahead symbols, as grammar item identifiers; terminals,
/// end-of-input and end-of-guard markers all appear here.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LookaheadSet(BTreeSet<usize>);

impl LookaheadSet {
    pub fn new() -> Self {
        LookaheadSet::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, item: usize) -> bool {
        self.0.contains(&item)
    }

    pub fn insert(&mut self, item: usize) -> bool {
        self.0.insert(item)
    }

    pub fn iter(&self) -> btree_set::Iter<'_, usize> {
        self.0.iter()
    }
}

impl BitOrAssign<&Self> for LookaheadSet {
    fn bitor_assign(&mut self, rhs: &Self) {
        self.0 = (&self.0).bitor(&rhs.0);
    }
}

impl FromIterator<usize> for LookaheadSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self(BTreeSet::from_iter(iter))
    }
}
