// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::BTreeMap;

/// A parser action, keyed in the action table by the grammar item identifier
/// of the symbol it fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Action {
    /// Shift the symbol and move to the state.
    Shift(usize),
    /// Shift, substituting the strong terminal for the weak one that matched.
    ShiftStrong(usize),
    /// Reduce by the rule.
    Reduce(usize),
    /// Reduce by the rule, but only if the lookahead can be shifted after the
    /// reduction completes.
    WeakReduce(usize),
    /// Move to the state after a reduction to this nonterminal.
    Goto(usize),
    /// The input matches the language.
    Accept,
    /// Try the guard with the given index; on success advance over the guard
    /// item, otherwise fall through to the next candidate action.
    Guard(usize),
    /// Discard the lookahead symbol.
    Ignore,
}

impl Action {
    /// Evaluation order when several actions share a symbol: guards first,
    /// then weak reduces, then shifts; plain reduces last.
    pub fn score(&self) -> u8 {
        match self {
            Action::Guard(_) => 0,
            Action::WeakReduce(_) => 1,
            Action::Shift(_) | Action::ShiftStrong(_) => 2,
            Action::Reduce(_) => 3,
            Action::Accept => 4,
            Action::Ignore => 5,
            Action::Goto(_) => 6,
        }
    }

    pub fn is_unconditional(&self) -> bool {
        matches!(
            self,
            Action::Shift(_) | Action::ShiftStrong(_) | Action::Reduce(_) | Action::Accept
        )
    }
}

/// The actions of one state, keyed by grammar item identifier. A key may
/// hold several candidate actions, kept in evaluation order.
#[derive(Debug, Default, Clone)]
pub struct ActionSet(BTreeMap<usize, Vec<Action>>);

impl ActionSet {
    pub fn new() -> Self {
        ActionSet::default()
    }

    /// Adds an action unless an identical one is already present.
    pub fn add(&mut self, symbol: usize, action: Action) {
        let actions = self.0.entry(symbol).or_default();
        if !actions.contains(&action) {
            actions.push(action);
            actions.sort_by_key(|action| action.score());
        }
    }

    pub fn remove_symbol(&mut self, symbol: usize) -> Option<Vec<Action>> {
        self.0.remove(&symbol)
    }

    pub fn set_actions(&mut self, symbol: usize, actions: Vec<Action>) {
        debug_assert!(!actions.is_empty());
        self.0.insert(symbol, actions);
    }

    pub fn actions_for(&self, symbol: usize) -> &[Action] {
        self.0
            .get(&symbol)
            .map(|actions| actions.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_actions_for(&self, symbol: usize) -> bool {
        self.0.contains_key(&symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Action])> {
        self.0
            .iter()
            .map(|(&symbol, actions)| (symbol, actions.as_slice()))
    }

    pub fn symbols(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.keys().copied()
    }
}
