// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::{BTreeMap, BTreeSet};

use contextfree::{Grammar, Item, TerminalDictionary};
use dfa::ndfa::AcceptAction;
use dfa::Ndfa;

use crate::action::{Action, ActionSet};

/// The weak/strong terminal relation and the action rewriter built on it.
///
/// A weak terminal borrows the actions of its strong equivalent in states
/// that don't give it a meaning of its own; this implements contextual
/// keywords without splitting the state machine.
#[derive(Debug, Default, Clone)]
pub struct WeakSymbols {
    strong_to_weak: BTreeMap<usize, BTreeSet<usize>>,
    weak_symbols: BTreeSet<usize>,
}

impl WeakSymbols {
    pub fn new() -> Self {
        WeakSymbols::default()
    }

    pub fn is_weak(&self, symbol: usize) -> bool {
        self.weak_symbols.contains(&symbol)
    }

    pub fn weak_equivalents_of(&self, strong: usize) -> impl Iterator<Item = usize> + '_ {
        self.strong_to_weak
            .get(&strong)
            .into_iter()
            .flat_map(|weak| weak.iter().copied())
    }

    /// Sorted (weak, strong) pairs, for the packed tables.
    pub fn weak_to_strong_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (&strong, weak_set) in self.strong_to_weak.iter() {
            for &weak in weak_set.iter() {
                pairs.push((weak, strong));
            }
        }
        pairs.sort();
        pairs
    }

    /// Determines the strong equivalent of every weak terminal from the
    /// accepting states of a lexer DFA.
    ///
    /// In each accepting state the strongest symbol is the one with the
    /// lowest identifier that is not weak. A weak terminal equivalent to
    /// different strong terminals in different states is split, and the
    /// offending state rewritten to accept the split, so each context keeps
    /// a unique identifier.
    pub fn add_symbols(
        &mut self,
        dfa: &mut Ndfa,
        weak: &BTreeSet<usize>,
        terminals: &mut TerminalDictionary,
    ) {
        if weak.is_empty() {
            return;
        }

        let mut weak_to_strong: BTreeMap<usize, usize> = BTreeMap::new();
        for state in 0..dfa.count_states() {
            let accept = dfa.actions_for_state(state).to_vec();
            if accept.is_empty() {
                continue;
            }

            let mut strongest: Option<usize> = None;
            let mut used_weak = BTreeSet::new();
            for action in accept.iter() {
                if weak.contains(&action.symbol) {
                    used_weak.insert(action.symbol);
                    continue;
                }
                if strongest.map(|s| action.symbol < s).unwrap_or(true) {
                    strongest = Some(action.symbol);
                }
            }
            let strongest = match strongest {
                Some(symbol) => symbol,
                None => continue,
            };
            if used_weak.is_empty() {
                continue;
            }

            for weak_symbol in used_weak {
                match weak_to_strong.get(&weak_symbol) {
                    None => {
                        weak_to_strong.insert(weak_symbol, strongest);
                    }
                    Some(&existing) if existing == strongest => (),
                    Some(_) => {
                        // The weak symbol means something else here: split it
                        // so this context has its own identifier
                        let split_symbol = terminals.split(weak_symbol);
                        dfa.clear_accept(state);
                        dfa.accept(state, AcceptAction::new(split_symbol));
                        weak_to_strong.insert(split_symbol, strongest);
                    }
                }
            }
        }

        for (weak_symbol, strong_symbol) in weak_to_strong {
            self.strong_to_weak
                .entry(strong_symbol)
                .or_default()
                .insert(weak_symbol);
            self.weak_symbols.insert(weak_symbol);
        }
        self.weak_symbols.extend(weak.iter().copied());
    }

    /// Registers an explicit strong/weak pairing.
    pub fn add_pair(&mut self, strong: usize, weak: usize) {
        self.strong_to_weak.entry(strong).or_default().insert(weak);
        self.weak_symbols.insert(weak);
    }

    /// Rewrites one state's actions:
    ///
    ///  * reduces on weak terminals become weak reduces;
    ///  * every action on a strong terminal is copied onto its weak
    ///    equivalents that have no blocking action of their own, with shifts
    ///    becoming strong shifts (the strong identifier is substituted at
    ///    runtime);
    ///  * states referencing no strong terminal with weak equivalents pass
    ///    through untouched.
    ///
    /// Applying the rewriter twice leaves the table unchanged.
    pub fn rewrite_actions(&self, actions: &mut ActionSet, grammar: &Grammar) {
        let terminal_for_key: BTreeMap<usize, usize> = actions
            .symbols()
            .filter_map(|key| match grammar.item(key) {
                Item::Terminal(symbol) => Some((key, symbol)),
                _ => None,
            })
            .collect();

        let have_strong = terminal_for_key.values().any(|symbol| {
            !self.is_weak(*symbol)
                && self
                    .strong_to_weak
                    .get(symbol)
                    .map(|weak| !weak.is_empty())
                    .unwrap_or(false)
        });
        if !have_strong {
            return;
        }

        // Weak terminals whose own actions rule out borrowing the strong
        // symbol's: anything other than a weak reduce or a guard blocks
        let mut blocked: BTreeSet<usize> = BTreeSet::new();

        for (&key, &symbol) in terminal_for_key.iter() {
            if !self.is_weak(symbol) {
                continue;
            }
            let rewritten: Vec<Action> = actions
                .actions_for(key)
                .iter()
                .map(|action| match action {
                    Action::Reduce(rule) => Action::WeakReduce(*rule),
                    other => *other,
                })
                .collect();
            if rewritten
                .iter()
                .any(|action| !matches!(action, Action::WeakReduce(_) | Action::Guard(_)))
            {
                blocked.insert(symbol);
            }
            actions.set_actions(key, rewritten);
        }

        for (&key, &symbol) in terminal_for_key.iter() {
            if self.is_weak(symbol) {
                continue;
            }
            let weak_equivalents = match self.strong_to_weak.get(&symbol) {
                Some(weak) => weak,
                None => continue,
            };
            let strong_actions = actions.actions_for(key).to_vec();
            for &weak_symbol in weak_equivalents.iter() {
                if blocked.contains(&weak_symbol) {
                    continue;
                }
                let weak_key = match grammar.find_identifier_for_item(Item::Terminal(weak_symbol))
                {
                    Some(weak_key) => weak_key,
                    None => continue,
                };
                for action in strong_actions.iter() {
                    // Shifts substitute the strong identifier at runtime;
                    // reduces stay conditional on the weak symbol so a second
                    // rewrite pass finds nothing left to change
                    let derived = match action {
                        Action::Shift(state) => Action::ShiftStrong(*state),
                        Action::Reduce(rule) => Action::WeakReduce(*rule),
                        other => *other,
                    };
                    actions.add(weak_key, derived);
                }
            }
        }
    }
}
