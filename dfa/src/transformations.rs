// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

// The various to_x passes for the NDFA, separated out as they are rather
// large and there are a lot of them.

use std::collections::{BTreeMap, BTreeSet};

use crate::ndfa::{AcceptAction, Ndfa, State, Transition};
use crate::remapped_symbol_map::RemappedSymbolMap;
use crate::symbol_map::SymbolMap;
use crate::symbol_set::SymbolSet;

impl Ndfa {
    /// Extends the set with every state reachable through epsilon transitions.
    pub fn closure(&self, states: &mut BTreeSet<usize>) {
        let epsilon_id = match self
            .symbols()
            .find_identifier_for_symbols(&SymbolSet::epsilon())
        {
            Some(id) => id,
            None => return,
        };

        let mut new_states: Vec<usize> = states.iter().copied().collect();
        while let Some(state) = new_states.pop() {
            for transition in self.state(state).transitions() {
                if transition.symbol_set != epsilon_id {
                    continue;
                }
                if states.insert(transition.new_state) {
                    new_states.push(transition.new_state);
                }
            }
        }
    }

    /// Returns an equivalent NDFA whose symbol sets are pairwise disjoint.
    ///
    /// A transition whose set overlapped others becomes one transition per
    /// fragment. Required before `to_dfa`, which keys each DFA transition by
    /// a single symbol set identifier.
    pub fn to_ndfa_with_unique_symbols(&self) -> Ndfa {
        let remapped = RemappedSymbolMap::deduplicate(self.symbols());

        let mut states = Vec::with_capacity(self.count_states());
        for state_id in 0..self.count_states() {
            let mut new_state = State::default();
            for transition in self.state(state_id).transitions() {
                for new_symbols in remapped.new_symbols(transition.symbol_set) {
                    new_state.add(Transition {
                        symbol_set: new_symbols,
                        new_state: transition.new_state,
                    });
                }
            }
            states.push(new_state);
        }

        let accept = self.clone_accept_table();
        Ndfa::from_parts(states, remapped.into_map(), accept)
    }

    /// Builds a DFA by subset construction.
    ///
    /// Each requested start state becomes a start state of the result, in
    /// order. The symbol map must already be deduplicated. If any state in a
    /// subset carries an eager accept, the subset gets no outgoing
    /// transitions, cutting greedy matching short.
    pub fn to_dfa(&self, initial_states: &[usize]) -> Ndfa {
        if initial_states.is_empty() {
            return Ndfa::new();
        }

        let epsilon_id = self
            .symbols()
            .find_identifier_for_symbols(&SymbolSet::epsilon());

        let mut states: Vec<State> = Vec::new();
        let mut accept: BTreeMap<usize, Vec<AcceptAction>> = BTreeMap::new();
        let mut state_sets: Vec<BTreeSet<usize>> = Vec::new();
        let mut state_map: BTreeMap<BTreeSet<usize>, usize> = BTreeMap::new();
        let mut remaining: Vec<usize> = Vec::new();

        for &initial in initial_states {
            let mut state_set = BTreeSet::new();
            state_set.insert(initial);
            self.closure(&mut state_set);

            let state_id = states.len();
            states.push(State::default());
            state_sets.push(state_set.clone());
            // A duplicate initial state still gets its own entry; the first
            // becomes the canonical one in the map
            state_map.entry(state_set).or_insert(state_id);
            remaining.push(state_id);
        }

        while let Some(next) = remaining.pop() {
            let mut states_for_symbol: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
            let mut actions: Vec<AcceptAction> = Vec::new();
            let mut is_eager = false;

            for &constituent in state_sets[next].clone().iter() {
                for transition in self.state(constituent).transitions() {
                    if Some(transition.symbol_set) == epsilon_id {
                        continue;
                    }
                    states_for_symbol
                        .entry(transition.symbol_set)
                        .or_default()
                        .insert(transition.new_state);
                }
                for action in self.actions_for_state(constituent) {
                    actions.push(*action);
                    if action.eager {
                        is_eager = true;
                    }
                }
            }

            if !actions.is_empty() {
                actions.sort();
                actions.dedup();
                accept.insert(next, actions);
            }

            // Eager states accept immediately: no transitions out of them
            if is_eager {
                continue;
            }

            for (symbol_set, mut targets) in states_for_symbol {
                self.closure(&mut targets);
                let target_state = match state_map.get(&targets) {
                    Some(&existing) => existing,
                    None => {
                        let new_state = states.len();
                        states.push(State::default());
                        state_sets.push(targets.clone());
                        state_map.insert(targets, new_state);
                        remaining.push(new_state);
                        new_state
                    }
                };
                states[next].add(Transition {
                    symbol_set,
                    new_state: target_state,
                });
            }
        }

        let mut result = Ndfa::from_parts(states, self.symbols().clone(), accept);
        result.set_deterministic(true);
        result
    }

    /// Compacts a DFA by partition refinement, merging behaviourally
    /// equivalent states.
    ///
    /// The initial partition has one block per start state, one block per
    /// accept-action signature and one block for the non-accepting states;
    /// blocks are split until no block's members disagree on the block
    /// reached for any symbol set.
    pub fn to_compact_dfa(&self, initial_states: &[usize]) -> Ndfa {
        let mut blocks: Vec<BTreeSet<usize>> = Vec::new();
        let mut old_to_new: BTreeMap<usize, usize> = BTreeMap::new();

        for &initial in initial_states {
            let mut block = BTreeSet::new();
            block.insert(initial);
            old_to_new.insert(initial, blocks.len());
            blocks.push(block);
        }

        // All non-accepting states share one block to begin with
        let non_accepting = blocks.len();
        blocks.push(BTreeSet::new());

        let mut block_for_actions: BTreeMap<Vec<AcceptAction>, usize> = BTreeMap::new();
        for state_id in 0..self.count_states() {
            if old_to_new.contains_key(&state_id) {
                continue;
            }
            let actions = self.actions_for_state(state_id);
            if actions.is_empty() {
                blocks[non_accepting].insert(state_id);
                old_to_new.insert(state_id, non_accepting);
            } else {
                let mut signature = actions.to_vec();
                signature.sort();
                signature.dedup();
                let target = match block_for_actions.get(&signature) {
                    Some(&block) => block,
                    None => {
                        blocks.push(BTreeSet::new());
                        block_for_actions.insert(signature, blocks.len() - 1);
                        blocks.len() - 1
                    }
                };
                blocks[target].insert(state_id);
                old_to_new.insert(state_id, target);
            }
        }

        // Split any block whose members disagree on a destination block
        let mut changed = true;
        while changed {
            changed = false;
            for block_id in 0..blocks.len() {
                if blocks[block_id].len() <= 1 {
                    continue;
                }
                let members: Vec<usize> = blocks[block_id].iter().copied().collect();
                let template = self.destination_blocks(members[0], &old_to_new);

                let mut to_split: Vec<usize> = Vec::new();
                for &member in &members[1..] {
                    if self.destination_blocks(member, &old_to_new) != template {
                        to_split.push(member);
                    }
                }
                if !to_split.is_empty() {
                    changed = true;
                    blocks.push(BTreeSet::new());
                    let split_block = blocks.len() - 1;
                    for member in to_split {
                        blocks[block_id].remove(&member);
                        blocks[split_block].insert(member);
                        old_to_new.insert(member, split_block);
                    }
                }
            }
        }

        // Number the non-empty blocks densely and rebuild from a template
        // member of each
        let mut block_ident: BTreeMap<usize, usize> = BTreeMap::new();
        for (block_id, block) in blocks.iter().enumerate() {
            if !block.is_empty() {
                let ident = block_ident.len();
                block_ident.insert(block_id, ident);
            }
        }

        let mut states: Vec<State> = Vec::new();
        let mut accept: BTreeMap<usize, Vec<AcceptAction>> = BTreeMap::new();
        for (block_id, block) in blocks.iter().enumerate() {
            if block.is_empty() {
                continue;
            }
            let new_id = block_ident[&block_id];
            debug_assert_eq!(new_id, states.len());
            let template = *block.iter().next().unwrap();
            let mut new_state = State::default();
            for transition in self.state(template).transitions() {
                new_state.add(Transition {
                    symbol_set: transition.symbol_set,
                    new_state: block_ident[&old_to_new[&transition.new_state]],
                });
            }
            states.push(new_state);
            let actions = self.actions_for_state(template);
            if !actions.is_empty() {
                accept.insert(new_id, actions.to_vec());
            }
        }

        let mut result = Ndfa::from_parts(states, self.symbols().clone(), accept);
        result.set_deterministic(self.is_deterministic());
        result
    }

    fn destination_blocks(
        &self,
        state: usize,
        old_to_new: &BTreeMap<usize, usize>,
    ) -> BTreeMap<usize, usize> {
        self.state(state)
            .transitions()
            .map(|t| (t.symbol_set, old_to_new[&t.new_state]))
            .collect()
    }

    /// Merges symbol sets that produce the same transition in every state,
    /// shrinking the symbol translation table. Most effective after
    /// `to_compact_dfa`.
    pub fn to_ndfa_with_merged_symbols(&self) -> Ndfa {
        // Signature of a symbol set: the state it leads to from every state
        let mut signature_for_symbol: Vec<Vec<Option<usize>>> = Vec::new();
        for symbol_id in 0..self.symbols().count_sets() {
            let mut signature = Vec::with_capacity(self.count_states());
            for state_id in 0..self.count_states() {
                signature.push(
                    self.state(state_id)
                        .transitions()
                        .find(|t| t.symbol_set == symbol_id)
                        .map(|t| t.new_state),
                );
            }
            signature_for_symbol.push(signature);
        }

        // Merge symbols with identical signatures, keeping first-seen order
        let mut new_id_for_signature: BTreeMap<Vec<Option<usize>>, usize> = BTreeMap::new();
        let mut symbol_for_symbol: Vec<usize> = Vec::new();
        let mut merged_sets: Vec<SymbolSet> = Vec::new();
        for (symbol_id, signature) in signature_for_symbol.iter().enumerate() {
            let new_id = match new_id_for_signature.get(signature) {
                Some(&id) => id,
                None => {
                    let id = merged_sets.len();
                    new_id_for_signature.insert(signature.clone(), id);
                    merged_sets.push(SymbolSet::new());
                    id
                }
            };
            merged_sets[new_id] |= self.symbols().symbols_for_id(symbol_id);
            symbol_for_symbol.push(new_id);
        }

        let mut new_symbol_map = SymbolMap::new();
        for merged in merged_sets.iter() {
            new_symbol_map.identifier_for_symbols(merged);
        }

        let mut states = Vec::with_capacity(self.count_states());
        for state_id in 0..self.count_states() {
            let mut new_state = State::default();
            for transition in self.state(state_id).transitions() {
                new_state.add(Transition {
                    symbol_set: symbol_for_symbol[transition.symbol_set],
                    new_state: transition.new_state,
                });
            }
            states.push(new_state);
        }

        let mut result = Ndfa::from_parts(states, new_symbol_map, self.clone_accept_table());
        result.set_deterministic(self.is_deterministic());
        result
    }

    /// True if no state has an epsilon transition or two transitions sharing
    /// a symbol set identifier.
    pub fn verify_is_dfa(&self) -> bool {
        let epsilon_id = self
            .symbols()
            .find_identifier_for_symbols(&SymbolSet::epsilon());
        for state_id in 0..self.count_states() {
            let mut used_symbols = BTreeSet::new();
            for transition in self.state(state_id).transitions() {
                if Some(transition.symbol_set) == epsilon_id {
                    return false;
                }
                if !used_symbols.insert(transition.symbol_set) {
                    return false;
                }
            }
        }
        true
    }

    /// True if the symbol map contains no overlapping sets.
    pub fn verify_no_symbol_overlap(&self) -> bool {
        !self.symbols().has_duplicates()
    }

    /// Runs the deterministic automaton over a sequence of code points and
    /// reports whether it ends in an accepting state.
    pub fn matches_symbols(&self, symbols: &[i32]) -> bool {
        let mut state = 0;
        for &symbol in symbols {
            let next = self
                .state(state)
                .transitions()
                .find(|t| self.symbols().symbols_for_id(t.symbol_set).contains(symbol))
                .map(|t| t.new_state);
            match next {
                Some(next_state) => state = next_state,
                None => return false,
            }
        }
        !self.actions_for_state(state).is_empty()
    }

    pub fn matches(&self, text: &str) -> bool {
        let symbols: Vec<i32> = text.chars().map(|c| c as i32).collect();
        self.matches_symbols(&symbols)
    }

    fn clone_accept_table(&self) -> BTreeMap<usize, Vec<AcceptAction>> {
        self.accepting_states()
            .map(|(state, actions)| (state, actions.to_vec()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::SymbolRange;

    fn literal_ndfa(word: &str, symbol: usize) -> Ndfa {
        let mut ndfa = Ndfa::new();
        let mut state = 0;
        for ch in word.chars() {
            let next = ndfa.add_state();
            ndfa.add_transition(
                state,
                &SymbolSet::from(SymbolRange::single(ch as i32)),
                next,
            );
            state = next;
        }
        ndfa.accept(state, AcceptAction::new(symbol));
        ndfa
    }

    #[test]
    fn epsilon_closure_follows_chains() {
        let mut ndfa = Ndfa::new();
        let s1 = ndfa.add_state();
        let s2 = ndfa.add_state();
        let s3 = ndfa.add_state();
        ndfa.add_epsilon_transition(0, s1);
        ndfa.add_epsilon_transition(s1, s2);
        ndfa.add_transition(s2, &SymbolSet::from(SymbolRange::new(0, 10)), s3);

        let mut states = BTreeSet::new();
        states.insert(0);
        ndfa.closure(&mut states);
        assert_eq!(states, [0, s1, s2].iter().copied().collect());
    }

    #[test]
    fn determinization_preserves_the_language() {
        let mut ndfa = literal_ndfa("while", 1);
        // Second alternative sharing the start state
        let mut state = 0;
        for ch in "when".chars() {
            let next = ndfa.add_state();
            ndfa.add_transition(
                state,
                &SymbolSet::from(SymbolRange::single(ch as i32)),
                next,
            );
            state = next;
        }
        ndfa.accept(state, AcceptAction::new(2));

        let dfa = ndfa.to_ndfa_with_unique_symbols().to_dfa(&[0]);
        assert!(dfa.verify_is_dfa());
        assert!(dfa.verify_no_symbol_overlap());
        assert!(dfa.matches("while"));
        assert!(dfa.matches("when"));
        assert!(!dfa.matches("whil"));
        assert!(!dfa.matches("whenever"));
    }

    #[test]
    fn eager_accept_cuts_matching_short() {
        let mut ndfa = Ndfa::new();
        // a+ with an eager accept: the DFA must not loop past the first 'a'
        let s1 = ndfa.add_state();
        ndfa.add_transition(0, &SymbolSet::from(SymbolRange::single('a' as i32)), s1);
        ndfa.add_transition(s1, &SymbolSet::from(SymbolRange::single('a' as i32)), s1);
        ndfa.accept(s1, AcceptAction::eager(1));

        let dfa = ndfa.to_ndfa_with_unique_symbols().to_dfa(&[0]);
        let accepting = (0..dfa.count_states())
            .find(|&s| !dfa.actions_for_state(s).is_empty())
            .unwrap();
        assert_eq!(dfa.state(accepting).count_transitions(), 0);
    }

    #[test]
    fn minimization_merges_equivalent_states() {
        // Two paths accepting the same terminal; the tails are equivalent
        let mut ndfa = Ndfa::new();
        let a = SymbolSet::from(SymbolRange::single('a' as i32));
        let b = SymbolSet::from(SymbolRange::single('b' as i32));
        let c = SymbolSet::from(SymbolRange::single('c' as i32));
        let s1 = ndfa.add_state();
        let s2 = ndfa.add_state();
        let s3 = ndfa.add_state();
        let s4 = ndfa.add_state();
        ndfa.add_transition(0, &a, s1);
        ndfa.add_transition(0, &b, s2);
        ndfa.add_transition(s1, &c, s3);
        ndfa.add_transition(s2, &c, s4);
        ndfa.accept(s3, AcceptAction::new(1));
        ndfa.accept(s4, AcceptAction::new(1));

        let dfa = ndfa.to_ndfa_with_unique_symbols().to_dfa(&[0]);
        let compact = dfa.to_compact_dfa(&[0]);
        assert!(compact.count_states() < dfa.count_states());
        for text in ["ac", "bc"] {
            assert_eq!(dfa.matches(text), compact.matches(text));
        }
        for text in ["a", "b", "c", "abc", ""] {
            assert_eq!(dfa.matches(text), compact.matches(text));
        }
    }

    #[test]
    fn merged_symbols_shrink_the_map() {
        // 'a' and 'b' behave identically everywhere so their sets merge
        let mut ndfa = Ndfa::new();
        let s1 = ndfa.add_state();
        ndfa.add_transition(0, &SymbolSet::from(SymbolRange::single('a' as i32)), s1);
        ndfa.add_transition(0, &SymbolSet::from(SymbolRange::single('b' as i32)), s1);
        ndfa.accept(s1, AcceptAction::new(1));

        let dfa = ndfa.to_ndfa_with_unique_symbols().to_dfa(&[0]);
        let merged = dfa.to_compact_dfa(&[0]).to_ndfa_with_merged_symbols();
        assert!(merged.symbols().count_sets() < dfa.symbols().count_sets());
        assert!(merged.matches("a"));
        assert!(merged.matches("b"));
        assert!(!merged.matches("c"));
    }
}
