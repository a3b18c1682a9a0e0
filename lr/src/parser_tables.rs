// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::{BTreeMap, BTreeSet};

use contextfree::{Grammar, Item};

use crate::action::Action;
use crate::lalr_builder::LalrBuilder;
use crate::weak_symbols::WeakSymbols;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Guard,
    WeakReduce,
    Shift,
    ShiftStrong,
    Reduce,
    Goto,
    Accept,
    Ignore,
}

impl ActionKind {
    /// Ranks actions in the order they should be tried for one symbol.
    fn score(&self) -> u8 {
        match self {
            ActionKind::Guard => 0,
            ActionKind::WeakReduce => 1,
            ActionKind::Shift | ActionKind::ShiftStrong => 2,
            ActionKind::Reduce => 3,
            ActionKind::Accept => 4,
            ActionKind::Ignore => 5,
            ActionKind::Goto => 6,
        }
    }
}

/// One packed action: the symbol it fires on, the kind and a payload whose
/// meaning depends on the kind (next state for shifts and gotos, an index
/// into the reduce-rule table for reduces, an index into the guard table for
/// guards).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedAction {
    pub symbol: usize,
    pub kind: ActionKind,
    pub payload: usize,
}

/// What a reduce needs at runtime: the nonterminal's item identifier for the
/// goto lookup, the source rule for the semantic action, and how many
/// entries to pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceRule {
    pub nonterminal: usize,
    pub rule: usize,
    pub length: usize,
}

/// What a guard needs at runtime: the state its nested parser starts in,
/// its end-of-guard marker and the guard item to advance over on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardInfo {
    pub guard_item: usize,
    pub eog_item: usize,
    pub start_state: usize,
}

/// The flattened parser tables: per state a sorted array of terminal actions
/// (keyed by terminal symbol identifier) and one of nonterminal actions
/// (keyed by grammar item identifier; end-of-input and end-of-guard markers
/// live here). Immutable after construction and shareable between any
/// number of parse sessions.
#[derive(Debug, Clone)]
pub struct ParserTables {
    terminal_actions: Vec<Vec<PackedAction>>,
    nonterminal_actions: Vec<Vec<PackedAction>>,
    reduce_rules: Vec<ReduceRule>,
    end_of_input: usize,
    guards: Vec<GuardInfo>,
    end_of_guard_states: Vec<usize>,
    weak_to_strong: Vec<(usize, usize)>,
}

impl ParserTables {
    pub fn new(
        builder: &LalrBuilder,
        grammar: &Grammar,
        weak_symbols: Option<&WeakSymbols>,
        ignored_symbols: &BTreeSet<usize>,
    ) -> Self {
        let mut reduce_rules: Vec<ReduceRule> = Vec::new();
        let mut reduce_index_for_rule: BTreeMap<usize, usize> = BTreeMap::new();
        let mut index_for_rule = |rule_id: usize, reduce_rules: &mut Vec<ReduceRule>| {
            *reduce_index_for_rule.entry(rule_id).or_insert_with(|| {
                let rule = grammar.rule(rule_id);
                reduce_rules.push(ReduceRule {
                    nonterminal: rule.nonterminal(),
                    rule: rule_id,
                    length: rule.len(),
                });
                reduce_rules.len() - 1
            })
        };

        let guards: Vec<GuardInfo> = builder
            .guards()
            .iter()
            .map(|guard| GuardInfo {
                guard_item: guard.guard_item,
                eog_item: guard.eog_item,
                start_state: guard.start_state,
            })
            .collect();
        let eog_items: BTreeSet<usize> = guards.iter().map(|guard| guard.eog_item).collect();

        let mut terminal_actions = Vec::with_capacity(builder.count_states());
        let mut nonterminal_actions = Vec::with_capacity(builder.count_states());
        let mut end_of_guard_states = Vec::new();

        for state in builder.states() {
            let mut terminals: Vec<PackedAction> = Vec::new();
            let mut nonterminals: Vec<PackedAction> = Vec::new();
            let mut has_end_of_guard = false;

            for (key, candidates) in state.actions().iter() {
                for action in candidates {
                    let (kind, payload) = match action {
                        Action::Shift(next) => (ActionKind::Shift, *next),
                        Action::ShiftStrong(next) => (ActionKind::ShiftStrong, *next),
                        Action::Reduce(rule) => {
                            (ActionKind::Reduce, index_for_rule(*rule, &mut reduce_rules))
                        }
                        Action::WeakReduce(rule) => (
                            ActionKind::WeakReduce,
                            index_for_rule(*rule, &mut reduce_rules),
                        ),
                        Action::Goto(next) => (ActionKind::Goto, *next),
                        Action::Accept => (ActionKind::Accept, 0),
                        Action::Guard(index) => (ActionKind::Guard, *index),
                        Action::Ignore => (ActionKind::Ignore, 0),
                    };
                    match grammar.item(key) {
                        Item::Terminal(symbol) => terminals.push(PackedAction {
                            symbol,
                            kind,
                            payload,
                        }),
                        _ => {
                            if eog_items.contains(&key) {
                                has_end_of_guard = true;
                            }
                            nonterminals.push(PackedAction {
                                symbol: key,
                                kind,
                                payload,
                            });
                        }
                    }
                }
            }

            // Ignored symbols are discarded wherever nothing expects them
            for &ignored in ignored_symbols.iter() {
                if !terminals.iter().any(|action| action.symbol == ignored) {
                    terminals.push(PackedAction {
                        symbol: ignored,
                        kind: ActionKind::Ignore,
                        payload: 0,
                    });
                }
            }

            terminals.sort_by_key(|action| (action.symbol, action.kind.score()));
            nonterminals.sort_by_key(|action| (action.symbol, action.kind.score()));
            if has_end_of_guard {
                end_of_guard_states.push(state.ident());
            }
            terminal_actions.push(terminals);
            nonterminal_actions.push(nonterminals);
        }

        let weak_to_strong = weak_symbols
            .map(|weak| weak.weak_to_strong_pairs())
            .unwrap_or_default();

        Self {
            terminal_actions,
            nonterminal_actions,
            reduce_rules,
            end_of_input: builder.end_of_input(),
            guards,
            end_of_guard_states,
            weak_to_strong,
        }
    }

    pub fn count_states(&self) -> usize {
        self.terminal_actions.len()
    }

    pub fn end_of_input(&self) -> usize {
        self.end_of_input
    }

    pub fn reduce_rule(&self, index: usize) -> &ReduceRule {
        &self.reduce_rules[index]
    }

    pub fn count_reduce_rules(&self) -> usize {
        self.reduce_rules.len()
    }

    pub fn guard(&self, index: usize) -> &GuardInfo {
        &self.guards[index]
    }

    pub fn has_end_of_guard_actions(&self, state: usize) -> bool {
        self.end_of_guard_states.binary_search(&state).is_ok()
    }

    /// The candidate actions for a terminal symbol, in evaluation order.
    pub fn find_terminal(&self, state: usize, symbol: usize) -> &[PackedAction] {
        Self::find(&self.terminal_actions[state], symbol)
    }

    /// The candidate actions for a nonterminal-side symbol (nonterminals,
    /// end-of-input, end-of-guard markers), in evaluation order.
    pub fn find_nonterminal(&self, state: usize, symbol: usize) -> &[PackedAction] {
        Self::find(&self.nonterminal_actions[state], symbol)
    }

    fn find(actions: &[PackedAction], symbol: usize) -> &[PackedAction] {
        let start = actions.partition_point(|action| action.symbol < symbol);
        let end = actions.partition_point(|action| action.symbol <= symbol);
        &actions[start..end]
    }

    /// The strong terminal substituted when a weak terminal strong-shifts.
    pub fn strong_for_weak(&self, weak: usize) -> Option<usize> {
        self.weak_to_strong
            .binary_search_by_key(&weak, |&(weak_symbol, _)| weak_symbol)
            .ok()
            .map(|index| self.weak_to_strong[index].1)
    }

    /// The terminal symbols a state is prepared to act on, for error
    /// messages.
    pub fn expected_terminals(&self, state: usize) -> Vec<usize> {
        let mut expected: Vec<usize> = self.terminal_actions[state]
            .iter()
            .filter(|action| action.kind != ActionKind::Ignore)
            .map(|action| action.symbol)
            .collect();
        expected.dedup();
        expected
    }
}
