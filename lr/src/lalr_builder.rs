// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use contextfree::grammar::FirstsTable;
use contextfree::{Grammar, Item};

use crate::action::{Action, ActionSet};
use crate::lr_item::{LookaheadSet, LrItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedState {
    Unprocessed,
    NeedsReprocessing,
    Processed,
}

impl Default for ProcessedState {
    fn default() -> Self {
        ProcessedState::Unprocessed
    }
}

#[derive(Debug, Default)]
pub struct LalrStateData {
    ident: usize,
    items: RefCell<BTreeMap<LrItem, LookaheadSet>>,
    goto_table: RefCell<BTreeMap<usize, usize>>,
    actions: RefCell<ActionSet>,
    processed_state: Cell<ProcessedState>,
}

/// A state of the LALR(1) machine: a set of LR items with propagated
/// lookahead sets, the goto table filled during construction and the action
/// set filled afterwards. Two states with equal kernels are the same state.
#[derive(Debug, Clone)]
pub struct LalrState(Rc<LalrStateData>);

impl PartialEq for LalrState {
    fn eq(&self, other: &Self) -> bool {
        self.0.ident == other.0.ident
    }
}

impl Eq for LalrState {}

impl PartialOrd for LalrState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LalrState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.ident.cmp(&other.0.ident)
    }
}

impl LalrState {
    pub fn ident(&self) -> usize {
        self.0.ident
    }

    pub fn is_processed(&self) -> bool {
        self.0.processed_state.get() == ProcessedState::Processed
    }

    pub fn needs_reprocessing(&self) -> bool {
        self.0.processed_state.get() == ProcessedState::NeedsReprocessing
    }

    fn mark_as_processed(&self) {
        self.0.processed_state.set(ProcessedState::Processed);
    }

    pub fn items(&self) -> BTreeMap<LrItem, LookaheadSet> {
        self.0.items.borrow().clone()
    }

    pub fn goto_for(&self, symbol: usize) -> Option<usize> {
        self.0.goto_table.borrow().get(&symbol).copied()
    }

    pub fn goto_table(&self) -> BTreeMap<usize, usize> {
        self.0.goto_table.borrow().clone()
    }

    pub fn actions(&self) -> ActionSet {
        self.0.actions.borrow().clone()
    }

    pub fn with_actions<R>(&self, action: impl FnOnce(&mut ActionSet) -> R) -> R {
        action(&mut self.0.actions.borrow_mut())
    }

    fn kernel_key_set(&self, kernel_rules: &BTreeSet<usize>) -> BTreeSet<LrItem> {
        self.0
            .items
            .borrow()
            .keys()
            .filter(|item| item.dot() > 0 || kernel_rules.contains(&item.rule()))
            .copied()
            .collect()
    }

    fn irreducible_items(&self, grammar: &Grammar) -> Vec<LrItem> {
        self.0
            .items
            .borrow()
            .keys()
            .filter(|item| !item.is_reducible(grammar))
            .copied()
            .collect()
    }

    fn generate_goto_kernel(&self, grammar: &Grammar, symbol: usize) -> BTreeMap<LrItem, LookaheadSet> {
        let mut kernel = BTreeMap::new();
        for (item, lookaheads) in self.0.items.borrow().iter() {
            if item.next_symbol(grammar) == Some(symbol) {
                kernel.insert(item.shifted(), lookaheads.clone());
            }
        }
        kernel
    }

    /// Merges the kernel lookaheads of an equivalent item set into this
    /// state; growth marks the state for reprocessing so the additions
    /// propagate to its successors.
    fn merge_lookahead_sets(
        &self,
        item_set: &BTreeMap<LrItem, LookaheadSet>,
        kernel_rules: &BTreeSet<usize>,
    ) -> bool {
        let mut additions = 0;
        {
            let mut items = self.0.items.borrow_mut();
            for (key, other_lookaheads) in item_set
                .iter()
                .filter(|(k, _)| k.dot() > 0 || kernel_rules.contains(&k.rule()))
            {
                let lookaheads = items
                    .get_mut(key)
                    .expect("key sets should be identical to get here");
                let current_len = lookaheads.len();
                *lookaheads |= other_lookaheads;
                additions += lookaheads.len() - current_len;
            }
        }
        if additions > 0 && self.is_processed() {
            self.0
                .processed_state
                .set(ProcessedState::NeedsReprocessing);
        }
        additions > 0
    }
}

/// Everything known about one guard after machine construction.
#[derive(Debug, Clone, Copy)]
pub struct GuardData {
    pub guard_item: usize,
    pub eog_item: usize,
    pub start_rule: usize,
    pub start_state: usize,
}

/// A pair of actions competing for the same symbol in the same state.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub state: usize,
    pub symbol: usize,
    pub actions: Vec<Action>,
    /// The reducible items whose lookahead sets pulled the symbol in, for
    /// explaining where the conflict comes from.
    pub reducible_items: Vec<LrItem>,
}

/// Builds the LALR(1) machine for a grammar: LR(0) kernels found by goto
/// exploration, lookaheads propagated by merging until a fixed point, then
/// an action table per state.
#[derive(Debug)]
pub struct LalrBuilder {
    states: Vec<LalrState>,
    kernel_rules: BTreeSet<usize>,
    start_rule: usize,
    end_of_input: usize,
    guards: Vec<GuardData>,
    conflicts: Vec<Conflict>,
}

impl LalrBuilder {
    /// Augments the grammar with the start rule and the guard-start rules,
    /// then constructs the machine.
    pub fn build(grammar: &mut Grammar, start_nonterminal: usize) -> Self {
        let augmented_start = grammar.id_for_nonterminal("@start");
        let start_rule = grammar.add_rule(augmented_start, vec![start_nonterminal]);
        let end_of_input = grammar.end_of_input_id();

        let mut guards = Vec::new();
        let mut kernel_rules = BTreeSet::new();
        kernel_rules.insert(start_rule);
        for guard_item in grammar.guards() {
            let eog_item = grammar.end_of_guard_for(guard_item);
            let guard_start_rule = grammar.add_rule(eog_item, vec![guard_item]);
            kernel_rules.insert(guard_start_rule);
            guards.push(GuardData {
                guard_item,
                eog_item,
                start_rule: guard_start_rule,
                start_state: 0,
            });
        }

        let firsts = grammar.compute_firsts();
        let terminal_items = terminal_item_map(grammar);

        let mut builder = Self {
            states: Vec::new(),
            kernel_rules,
            start_rule,
            end_of_input,
            guards,
            conflicts: Vec::new(),
        };

        // The main start state then one start state per guard
        let mut kernel = BTreeMap::new();
        kernel.insert(
            LrItem::new(start_rule),
            [end_of_input].iter().copied().collect::<LookaheadSet>(),
        );
        builder.closure(grammar, &firsts, &terminal_items, &mut kernel);
        builder.new_state(kernel);

        for index in 0..builder.guards.len() {
            let guard = builder.guards[index];
            let mut kernel = BTreeMap::new();
            kernel.insert(
                LrItem::new(guard.start_rule),
                [guard.eog_item].iter().copied().collect::<LookaheadSet>(),
            );
            builder.closure(grammar, &firsts, &terminal_items, &mut kernel);
            let state = builder.new_state(kernel);
            builder.guards[index].start_state = state.ident();
        }

        builder.explore(grammar, &firsts, &terminal_items);
        builder.construct_actions(grammar, &firsts, &terminal_items);
        builder
    }

    pub fn count_states(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, ident: usize) -> &LalrState {
        &self.states[ident]
    }

    pub fn states(&self) -> impl Iterator<Item = &LalrState> {
        self.states.iter()
    }

    pub fn start_rule(&self) -> usize {
        self.start_rule
    }

    pub fn end_of_input(&self) -> usize {
        self.end_of_input
    }

    pub fn guards(&self) -> &[GuardData] {
        &self.guards
    }

    /// Detects symbols with more than one unconditional action; call after
    /// the action rewriters have run.
    pub fn detect_conflicts(&mut self, grammar: &Grammar) -> usize {
        self.conflicts.clear();
        for state in self.states.iter() {
            let actions = state.actions();
            for (symbol, candidates) in actions.iter() {
                let unconditional = candidates
                    .iter()
                    .filter(|action| action.is_unconditional())
                    .count();
                if unconditional > 1 {
                    let reducible_items = state
                        .items()
                        .iter()
                        .filter(|(item, lookaheads)| {
                            item.is_reducible(grammar) && lookaheads.contains(symbol)
                        })
                        .map(|(item, _)| *item)
                        .collect();
                    self.conflicts.push(Conflict {
                        state: state.ident(),
                        symbol,
                        actions: candidates.to_vec(),
                        reducible_items,
                    });
                }
            }
        }
        self.conflicts.len()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    fn new_state(&mut self, items: BTreeMap<LrItem, LookaheadSet>) -> LalrState {
        let ident = self.states.len();
        let data = LalrStateData {
            ident,
            items: RefCell::new(items),
            goto_table: RefCell::new(BTreeMap::new()),
            actions: RefCell::new(ActionSet::new()),
            processed_state: Cell::new(ProcessedState::Unprocessed),
        };
        let state = LalrState(Rc::new(data));
        self.states.push(state.clone());
        state
    }

    fn first_unprocessed_state(&self) -> Option<LalrState> {
        Some(self.states.iter().find(|x| !x.is_processed())?.clone())
    }

    fn equivalent_state(&self, item_set: &BTreeMap<LrItem, LookaheadSet>) -> Option<LalrState> {
        let target_keys: BTreeSet<LrItem> = item_set
            .keys()
            .filter(|item| item.dot() > 0 || self.kernel_rules.contains(&item.rule()))
            .copied()
            .collect();
        if target_keys.is_empty() {
            return None;
        }
        self.states
            .iter()
            .find(|state| state.kernel_key_set(&self.kernel_rules) == target_keys)
            .cloned()
    }

    /// Expands an item set with the closure of its nonterminal-like next
    /// symbols, computing LALR(1) lookaheads from the firsts of each item's
    /// tail.
    ///
    /// A guard's rule is only expanded inside the guard's own start state
    /// (where the kernel is its start rule): everywhere else the guard is
    /// matched by the runtime lookahead check, not by parsing, so closing
    /// over its productions would leak them into the surrounding states.
    fn closure(
        &self,
        grammar: &Grammar,
        firsts: &FirstsTable,
        terminal_items: &BTreeMap<usize, usize>,
        items: &mut BTreeMap<LrItem, LookaheadSet>,
    ) {
        let mut additions_made = true;
        while additions_made {
            additions_made = false;
            // Snapshot to avoid mutating while iterating
            let closable: Vec<(LrItem, LookaheadSet)> = items
                .iter()
                .filter(|(item, _)| {
                    item.next_symbol(grammar)
                        .map(|next| {
                            let next_item = grammar.item(next);
                            next_item.is_nonterminal_like()
                                && (!next_item.is_guard()
                                    || self.kernel_rules.contains(&item.rule()))
                        })
                        .unwrap_or(false)
                })
                .map(|(item, lookaheads)| (*item, lookaheads.clone()))
                .collect();

            for (item, lookaheads) in closable {
                let next = item.next_symbol(grammar).expect("closable item");
                let tail_firsts = firsts.first_of_sequence(item.rhs_tail(grammar));
                let mut new_lookaheads = LookaheadSet::new();
                for &token in tail_firsts.tokens.iter() {
                    new_lookaheads.insert(terminal_items[&token]);
                }
                if tail_firsts.transparent {
                    for &lookahead in lookaheads.iter() {
                        new_lookaheads.insert(lookahead);
                    }
                }

                for &rule in grammar.rules_for_item(next) {
                    let prospective = LrItem::new(rule);
                    match items.get_mut(&prospective) {
                        Some(existing) => {
                            let len = existing.len();
                            *existing |= &new_lookaheads;
                            additions_made = additions_made || existing.len() > len;
                        }
                        None => {
                            items.insert(prospective, new_lookaheads.clone());
                            additions_made = true;
                        }
                    }
                }
            }
        }
    }

    /// The goto exploration loop: every novel kernel becomes a state, and
    /// lookahead growth reopens the states it touches until a fixed point.
    fn explore(
        &mut self,
        grammar: &Grammar,
        firsts: &FirstsTable,
        terminal_items: &BTreeMap<usize, usize>,
    ) {
        while let Some(unprocessed) = self.first_unprocessed_state() {
            unprocessed.mark_as_processed();
            let mut already_done = BTreeSet::new();
            for item in unprocessed.irreducible_items(grammar) {
                let symbol = item.next_symbol(grammar).expect("not reducible");
                if !already_done.insert(symbol) {
                    continue;
                }
                let mut item_set = unprocessed.generate_goto_kernel(grammar, symbol);
                self.closure(grammar, firsts, terminal_items, &mut item_set);
                let goto_state = match self.equivalent_state(&item_set) {
                    Some(equivalent) => {
                        if equivalent.merge_lookahead_sets(&item_set, &self.kernel_rules) {
                            // Re-run the closure so the non-kernel lookaheads
                            // catch up with the merged kernel
                            let mut merged = equivalent.items();
                            self.closure(grammar, firsts, terminal_items, &mut merged);
                            *equivalent.0.items.borrow_mut() = merged;
                        }
                        equivalent
                    }
                    None => self.new_state(item_set),
                };
                unprocessed
                    .0
                    .goto_table
                    .borrow_mut()
                    .insert(symbol, goto_state.ident());
            }
        }
    }

    fn construct_actions(
        &mut self,
        grammar: &Grammar,
        firsts: &FirstsTable,
        terminal_items: &BTreeMap<usize, usize>,
    ) {
        let guard_start_rules: BTreeMap<usize, usize> = self
            .guards
            .iter()
            .map(|guard| (guard.start_rule, guard.eog_item))
            .collect();
        let guard_index_for_item: BTreeMap<usize, usize> = self
            .guards
            .iter()
            .enumerate()
            .map(|(index, guard)| (guard.guard_item, index))
            .collect();

        for state in self.states.iter() {
            let items = state.items();
            let mut actions = ActionSet::new();
            for (item, lookaheads) in items.iter() {
                if item.is_reducible(grammar) {
                    if item.rule() == self.start_rule {
                        actions.add(self.end_of_input, Action::Accept);
                    } else if let Some(&eog_item) = guard_start_rules.get(&item.rule()) {
                        actions.add(eog_item, Action::Accept);
                    } else {
                        for &lookahead in lookaheads.iter() {
                            actions.add(lookahead, Action::Reduce(item.rule()));
                        }
                    }
                    continue;
                }

                let next = item.next_symbol(grammar).expect("irreducible item");
                let goto_state = state
                    .goto_for(next)
                    .expect("goto exploration covered every next symbol");
                match grammar.item(next) {
                    Item::Terminal(_) => actions.add(next, Action::Shift(goto_state)),
                    // Inside the guard's own start state the guard is parsed
                    // directly, so only the goto is wanted; a guard action
                    // there would send the nested parser into itself
                    Item::Guard(_) if !guard_start_rules.contains_key(&item.rule()) => {
                        let guard_index = guard_index_for_item[&next];
                        let guard_rule = grammar.rules_for_item(next)[0];
                        let rule_firsts =
                            firsts.first_of_sequence(grammar.rule(guard_rule).items());
                        let mut keys = LookaheadSet::new();
                        for &token in rule_firsts.tokens.iter() {
                            keys.insert(terminal_items[&token]);
                        }
                        if rule_firsts.transparent {
                            // An empty guard fires on whatever may follow it
                            let tail_firsts = firsts.first_of_sequence(item.rhs_tail(grammar));
                            for &token in tail_firsts.tokens.iter() {
                                keys.insert(terminal_items[&token]);
                            }
                            if tail_firsts.transparent {
                                for &lookahead in lookaheads.iter() {
                                    keys.insert(lookahead);
                                }
                            }
                        }
                        for &key in keys.iter() {
                            actions.add(key, Action::Guard(guard_index));
                        }
                        actions.add(next, Action::Goto(goto_state));
                    }
                    _ => actions.add(next, Action::Goto(goto_state)),
                }
            }
            *state.0.actions.borrow_mut() = actions;
        }
    }

    /// A human-readable dump of one state, for the description file and for
    /// conflict reports.
    pub fn state_description(
        &self,
        state: usize,
        grammar: &Grammar,
        terminals: &contextfree::TerminalDictionary,
    ) -> String {
        let state = &self.states[state];
        let mut string = format!("\nState<{}>:\n  Items:\n", state.ident());
        for (item, lookaheads) in state.items().iter() {
            let rule = grammar.rule(item.rule());
            let mut rendered = format!(
                "    {}:",
                grammar.item_to_string(rule.nonterminal(), terminals)
            );
            for (index, &symbol) in rule.items().iter().enumerate() {
                if index == item.dot() {
                    rendered += " .";
                }
                rendered += &format!(" {}", grammar.item_to_string(symbol, terminals));
            }
            if item.dot() >= rule.len() {
                rendered += " .";
            }
            let lookahead_names: Vec<String> = lookaheads
                .iter()
                .map(|&la| grammar.item_to_string(la, terminals))
                .collect();
            string += &format!("{} [{}]\n", rendered, lookahead_names.join(", "));
        }
        string += "  Actions:\n";
        for (symbol, candidates) in state.actions().iter() {
            for action in candidates {
                string += &format!(
                    "    {} -> {:?}\n",
                    grammar.item_to_string(symbol, terminals),
                    action
                );
            }
        }
        string
    }
}

/// Maps terminal symbol identifiers to their interned item identifiers.
pub fn terminal_item_map(grammar: &Grammar) -> BTreeMap<usize, usize> {
    grammar
        .items()
        .filter_map(|(item_id, item)| match item {
            Item::Terminal(symbol) => Some((symbol, item_id)),
            _ => None,
        })
        .collect()
}
