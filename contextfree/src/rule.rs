// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

/// An ordered sequence of items reducing to a nonterminal-like item.
///
/// Rules live in the grammar's arena and refer to items by their interned
/// identifiers; the rule's own identity is its arena index, assigned on
/// insertion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rule {
    ident: usize,
    nonterminal: usize,
    items: Vec<usize>,
}

impl Rule {
    pub(crate) fn new(ident: usize, nonterminal: usize, items: Vec<usize>) -> Self {
        Self {
            ident,
            nonterminal,
            items,
        }
    }

    pub fn ident(&self) -> usize {
        self.ident
    }

    /// The item identifier of the left hand side.
    pub fn nonterminal(&self) -> usize {
        self.nonterminal
    }

    pub fn items(&self) -> &[usize] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
