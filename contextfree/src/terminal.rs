// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::{BTreeMap, BTreeSet};

/// Maps terminal names to dense identifiers counting from zero.
///
/// A terminal may be *split*: the split gets a fresh identifier whose parent
/// is the original (chains of splits are flattened so the parent is always
/// the ultimate ancestor). Splits display under their parent's name but are
/// distinct symbols to the parser. Identifiers are never reused.
#[derive(Debug, Default, Clone)]
pub struct TerminalDictionary {
    max_symbol: usize,
    name_to_symbol: BTreeMap<String, usize>,
    symbol_to_name: BTreeMap<usize, String>,
    parent_for: BTreeMap<usize, usize>,
    children_for: BTreeMap<usize, BTreeSet<usize>>,
}

impl TerminalDictionary {
    pub fn new() -> Self {
        TerminalDictionary::default()
    }

    pub fn count_symbols(&self) -> usize {
        self.max_symbol
    }

    /// Adds a new anonymous symbol and returns its identifier.
    pub fn add_symbol(&mut self) -> usize {
        let new_symbol = self.max_symbol;
        self.max_symbol += 1;
        new_symbol
    }

    /// Adds a named symbol and returns its identifier.
    pub fn add_named_symbol(&mut self, name: &str) -> usize {
        let new_symbol = self.add_symbol();
        self.name_to_symbol.insert(name.to_string(), new_symbol);
        self.symbol_to_name.insert(new_symbol, name.to_string());
        new_symbol
    }

    pub fn symbol_for_name(&self, name: &str) -> Option<usize> {
        self.name_to_symbol.get(name).copied()
    }

    /// The display name for a symbol; a split answers with its parent's name.
    pub fn name_for_symbol(&self, symbol: usize) -> Option<&str> {
        match self.symbol_to_name.get(&symbol) {
            Some(name) => Some(name),
            None => {
                let parent = self.parent_for.get(&symbol)?;
                self.symbol_to_name.get(parent).map(|name| name.as_str())
            }
        }
    }

    /// Splits a symbol: allocates a fresh identifier recorded as a child of
    /// the symbol's ultimate ancestor.
    pub fn split(&mut self, symbol: usize) -> usize {
        let parent = self.parent_of(symbol).unwrap_or(symbol);
        let new_symbol = self.add_symbol();
        self.parent_for.insert(new_symbol, parent);
        self.children_for.entry(parent).or_default().insert(new_symbol);
        new_symbol
    }

    /// The ultimate ancestor of a split symbol, or None for unsplit symbols.
    pub fn parent_of(&self, symbol: usize) -> Option<usize> {
        self.parent_for.get(&symbol).copied()
    }

    pub fn children_of(&self, symbol: usize) -> impl Iterator<Item = usize> + '_ {
        self.children_for
            .get(&symbol)
            .into_iter()
            .flat_map(|children| children.iter().copied())
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, usize)> {
        self.name_to_symbol
            .iter()
            .map(|(name, &symbol)| (name.as_str(), symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_symbols_round_trip() {
        let mut terminals = TerminalDictionary::new();
        let number = terminals.add_named_symbol("number");
        let ident = terminals.add_named_symbol("ident");
        assert_eq!(terminals.symbol_for_name("number"), Some(number));
        assert_eq!(terminals.name_for_symbol(ident), Some("ident"));
        assert_eq!(terminals.count_symbols(), 2);
        assert_ne!(number, ident);
    }

    #[test]
    fn splits_inherit_names_and_track_parents() {
        let mut terminals = TerminalDictionary::new();
        let keyword = terminals.add_named_symbol("if");
        let split = terminals.split(keyword);
        assert_ne!(split, keyword);
        assert_eq!(terminals.parent_of(split), Some(keyword));
        assert_eq!(terminals.name_for_symbol(split), Some("if"));
        assert_eq!(terminals.symbol_for_name("if"), Some(keyword));
    }

    #[test]
    fn split_chains_flatten_to_the_ancestor() {
        let mut terminals = TerminalDictionary::new();
        let original = terminals.add_named_symbol("while");
        let first = terminals.split(original);
        let second = terminals.split(first);
        assert_eq!(terminals.parent_of(second), Some(original));
        let children: Vec<usize> = terminals.children_of(original).collect();
        assert_eq!(children, vec![first, second]);
    }

    #[test]
    fn identifiers_are_never_reused() {
        let mut terminals = TerminalDictionary::new();
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..4 {
            assert!(seen.insert(terminals.add_symbol()));
        }
        let named = terminals.add_named_symbol("x");
        assert!(seen.insert(named));
        assert!(seen.insert(terminals.split(named)));
    }
}
