// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::fmt;

/// A grammar symbol.
///
/// The EBNF wrappers and guards behave as anonymous nonterminals: the grammar
/// synthesizes their productions when the item is interned and `Grammar`
/// answers `rules_for_item` for them like any other nonterminal. The ordinal
/// carried by those variants identifies the interned structure, so
/// structurally equal wrappers are one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Item {
    /// A terminal from the terminal dictionary.
    Terminal(usize),
    /// A named nonterminal; the ordinal indexes the grammar's name table.
    Nonterminal(usize),
    /// Matches the empty string.
    Empty,
    /// The end-of-input marker used by the augmented start rule.
    EndOfInput,
    /// The end-of-guard marker for the guard with the given ordinal.
    EndOfGuard(usize),
    /// Zero or one occurrence of its rule.
    Optional(usize),
    /// Zero or more occurrences of its rule.
    RepeatZero(usize),
    /// One or more occurrences of its rule.
    RepeatOne(usize),
    /// Exactly one of its rules.
    Alternate(usize),
    /// A lookahead predicate defined by its single rule.
    Guard(usize),
}

impl Item {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Item::Terminal(_))
    }

    pub fn is_guard(&self) -> bool {
        matches!(self, Item::Guard(_))
    }

    /// True if the LALR closure should expand this item's rules.
    pub fn is_nonterminal_like(&self) -> bool {
        matches!(
            self,
            Item::Nonterminal(_)
                | Item::Optional(_)
                | Item::RepeatZero(_)
                | Item::RepeatOne(_)
                | Item::Alternate(_)
                | Item::Guard(_)
        )
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Item::Terminal(symbol) => write!(f, "t{}", symbol),
            Item::Nonterminal(ordinal) => write!(f, "n{}", ordinal),
            Item::Empty => write!(f, "<empty>"),
            Item::EndOfInput => write!(f, "<eoi>"),
            Item::EndOfGuard(ordinal) => write!(f, "<eog{}>", ordinal),
            Item::Optional(ordinal) => write!(f, "opt{}", ordinal),
            Item::RepeatZero(ordinal) => write!(f, "rep0_{}", ordinal),
            Item::RepeatOne(ordinal) => write!(f, "rep1_{}", ordinal),
            Item::Alternate(ordinal) => write!(f, "alt{}", ordinal),
            Item::Guard(ordinal) => write!(f, "guard{}", ordinal),
        }
    }
}
