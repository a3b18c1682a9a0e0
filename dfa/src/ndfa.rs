// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::BTreeMap;

use crate::range::SymbolRange;
use crate::symbol_map::SymbolMap;
use crate::symbol_set::SymbolSet;
use crate::unicode;

/// A request to report a terminal symbol when a state accepts.
///
/// Eager accepts suppress any further matching from the state: the longest
/// match rule does not apply past them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AcceptAction {
    pub symbol: usize,
    pub eager: bool,
}

impl AcceptAction {
    pub fn new(symbol: usize) -> Self {
        Self {
            symbol,
            eager: false,
        }
    }

    pub fn eager(symbol: usize) -> Self {
        Self {
            symbol,
            eager: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub symbol_set: usize,
    pub new_state: usize,
}

#[derive(Debug, Default, Clone)]
pub struct State {
    transitions: Vec<Transition>,
}

impl State {
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    pub fn count_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub(crate) fn add(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }
}

/// A nondeterministic finite automaton with epsilon transitions.
///
/// States are numbered from zero; state 0 is the default start state. The
/// automaton owns its states and symbol map by value, and the transformation
/// passes return freshly owned automata.
#[derive(Debug, Default, Clone)]
pub struct Ndfa {
    states: Vec<State>,
    symbols: SymbolMap,
    accept: BTreeMap<usize, Vec<AcceptAction>>,
    is_deterministic: bool,
}

impl Ndfa {
    pub fn new() -> Self {
        let mut ndfa = Ndfa::default();
        ndfa.states.push(State::default());
        ndfa
    }

    pub(crate) fn from_parts(
        states: Vec<State>,
        symbols: SymbolMap,
        accept: BTreeMap<usize, Vec<AcceptAction>>,
    ) -> Self {
        Self {
            states,
            symbols,
            accept,
            is_deterministic: false,
        }
    }

    pub(crate) fn set_deterministic(&mut self, is_deterministic: bool) {
        self.is_deterministic = is_deterministic;
    }

    pub fn is_deterministic(&self) -> bool {
        self.is_deterministic
    }

    pub fn count_states(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, state: usize) -> &State {
        &self.states[state]
    }

    pub fn symbols(&self) -> &SymbolMap {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolMap {
        &mut self.symbols
    }

    pub fn epsilon_id(&mut self) -> usize {
        self.symbols.identifier_for_symbols(&SymbolSet::epsilon())
    }

    /// Adds a new state with no transitions and returns its identifier.
    pub fn add_state(&mut self) -> usize {
        let new_state = self.states.len();
        self.states.push(State::default());
        new_state
    }

    pub fn add_transition(&mut self, from_state: usize, symbols: &SymbolSet, to_state: usize) {
        debug_assert!(from_state < self.states.len() && to_state < self.states.len());
        let symbol_id = self.symbols.identifier_for_symbols(symbols);
        self.states[from_state].add(Transition {
            symbol_set: symbol_id,
            new_state: to_state,
        });
    }

    pub fn add_epsilon_transition(&mut self, from_state: usize, to_state: usize) {
        self.add_transition(from_state, &SymbolSet::epsilon(), to_state);
    }

    pub fn accept(&mut self, state: usize, action: AcceptAction) {
        self.accept.entry(state).or_default().push(action);
    }

    /// Removes every accept action from the state.
    pub fn clear_accept(&mut self, state: usize) {
        self.accept.remove(&state);
    }

    pub fn actions_for_state(&self, state: usize) -> &[AcceptAction] {
        self.accept
            .get(&state)
            .map(|actions| actions.as_slice())
            .unwrap_or(&[])
    }

    pub fn accepting_states(&self) -> impl Iterator<Item = (usize, &[AcceptAction])> {
        self.accept
            .iter()
            .map(|(&state, actions)| (state, actions.as_slice()))
    }

    pub fn builder(&mut self) -> NdfaBuilder<'_> {
        NdfaBuilder::new(self)
    }
}

/// The surrogate pair for a UTF-32 value, per section 3.9 of the Unicode
/// standard.
fn surrogate_pair(ucs32: i32) -> (i32, i32) {
    let lower = 0xdc00 | (ucs32 & 0x3ff);
    let higher1 = (ucs32 >> 10) & 0x3f;
    let higher2 = (ucs32 >> 16) - 1;
    let higher = 0xd800 | higher1 | (higher2 << 6);
    (higher, lower)
}

/// Expands a transition on a range of code points at or above U+10000 into
/// transitions over UTF-16 surrogate pairs, using fresh intermediate states.
fn add_surrogate_transition(
    ndfa: &mut Ndfa,
    surrogate_range: SymbolRange,
    current_state: usize,
    target_state: usize,
) {
    if surrogate_range.lower() >= 0x110000 {
        return;
    }
    if surrogate_range.upper() > 0x110000 {
        let clipped = SymbolRange::new(surrogate_range.lower(), 0x110000);
        add_surrogate_transition(ndfa, clipped, current_state, target_state);
        return;
    }

    let (lower_hi, lower_lo) = surrogate_pair(surrogate_range.lower());
    let (upper_hi, upper_lo) = surrogate_pair(surrogate_range.upper() - 1);

    if lower_hi == upper_hi {
        // One high surrogate covers the whole range
        let tmp_state = ndfa.add_state();
        ndfa.add_transition(
            current_state,
            &SymbolSet::from(SymbolRange::single(lower_hi)),
            tmp_state,
        );
        ndfa.add_transition(
            tmp_state,
            &SymbolSet::from(SymbolRange::new(lower_lo, upper_lo + 1)),
            target_state,
        );
    } else {
        // Low end: from the first low surrogate to the end of the low range
        let tmp_state1 = ndfa.add_state();
        ndfa.add_transition(
            current_state,
            &SymbolSet::from(SymbolRange::single(lower_hi)),
            tmp_state1,
        );
        ndfa.add_transition(
            tmp_state1,
            &SymbolSet::from(SymbolRange::new(lower_lo, 0xe000)),
            target_state,
        );

        // High end: from the start of the low range to the last low surrogate
        let tmp_state2 = ndfa.add_state();
        ndfa.add_transition(
            current_state,
            &SymbolSet::from(SymbolRange::single(upper_hi)),
            tmp_state2,
        );
        ndfa.add_transition(
            tmp_state2,
            &SymbolSet::from(SymbolRange::new(0xdc00, upper_lo + 1)),
            target_state,
        );

        // Any high surrogate strictly between the two accepts any low surrogate
        if upper_hi - 1 > lower_hi {
            let tmp_state3 = ndfa.add_state();
            ndfa.add_transition(
                current_state,
                &SymbolSet::from(SymbolRange::new(lower_hi + 1, upper_hi)),
                tmp_state3,
            );
            ndfa.add_transition(
                tmp_state3,
                &SymbolSet::from(SymbolRange::new(0xdc00, 0xe000)),
                target_state,
            );
        }
    }
}

/// Incremental construction state for an NDFA.
///
/// The builder keeps a current and previous state so that postfix operators
/// can wire loops, and a stack of group entries so that parenthesised
/// subexpressions and `|` alternatives can be rejoined.
#[derive(Debug)]
pub struct NdfaBuilder<'a> {
    ndfa: &'a mut Ndfa,
    current_state: usize,
    previous_state: usize,
    next_state: Option<usize>,
    // (initial state, final state of the current alternative chain)
    stack: Vec<(Option<usize>, Option<usize>)>,
    generate_surrogates: bool,
    case_insensitive: bool,
}

impl<'a> NdfaBuilder<'a> {
    fn new(ndfa: &'a mut Ndfa) -> Self {
        Self {
            ndfa,
            current_state: 0,
            previous_state: 0,
            next_state: None,
            stack: Vec::new(),
            generate_surrogates: false,
            case_insensitive: false,
        }
    }

    pub fn set_generate_surrogates(&mut self, generate: bool) {
        self.generate_surrogates = generate;
    }

    pub fn set_case_insensitive(&mut self, case_insensitive: bool) {
        self.case_insensitive = case_insensitive;
    }

    pub fn ndfa(&mut self) -> &mut Ndfa {
        self.ndfa
    }

    pub fn current_state(&self) -> usize {
        self.current_state
    }

    pub fn previous_state(&self) -> usize {
        self.previous_state
    }

    pub fn goto_state(&mut self, state: usize) {
        self.current_state = state;
    }

    pub fn goto_state_with_previous(&mut self, state: usize, previous: usize) {
        self.current_state = state;
        self.previous_state = previous;
    }

    /// The next transition moves to the given state rather than a fresh one.
    pub fn set_next_state(&mut self, state: usize) {
        self.next_state = Some(state);
    }

    /// Adds a transition on the given symbols from the current state, moving
    /// to the target state (a fresh one unless `set_next_state` was called).
    pub fn transit(&mut self, symbols: &SymbolSet) {
        let next_state = match self.next_state.take() {
            Some(state) => state,
            None => self.ndfa.add_state(),
        };

        let symbols = if self.case_insensitive {
            unicode::case_fold_set(symbols)
        } else {
            symbols.clone()
        };

        if self.generate_surrogates && !symbols.is_empty() {
            let mut surrogates = SymbolSet::new();
            let mut non_surrogates = SymbolSet::new();
            for range in symbols.iter() {
                if range.upper() > 0x10000 {
                    if range.lower() <= 0xffff {
                        non_surrogates.insert(SymbolRange::new(range.lower(), 0x10000));
                        surrogates.insert(SymbolRange::new(0x10000, range.upper()));
                    } else {
                        surrogates.insert(*range);
                    }
                } else {
                    non_surrogates.insert(*range);
                }
            }

            if !surrogates.is_empty() {
                if !non_surrogates.is_empty() {
                    self.ndfa
                        .add_transition(self.current_state, &non_surrogates, next_state);
                }
                let ranges: Vec<SymbolRange> = surrogates.iter().copied().collect();
                for range in ranges {
                    add_surrogate_transition(self.ndfa, range, self.current_state, next_state);
                }
                self.previous_state = self.current_state;
                self.current_state = next_state;
                return;
            }
        }

        self.ndfa
            .add_transition(self.current_state, &symbols, next_state);
        self.previous_state = self.current_state;
        self.current_state = next_state;
    }

    pub fn transit_symbol(&mut self, symbol: i32) {
        self.transit(&SymbolSet::from(SymbolRange::single(symbol)));
    }

    pub fn epsilon(&mut self) {
        // Case folding and surrogates never apply to the empty set
        let next_state = match self.next_state.take() {
            Some(state) => state,
            None => self.ndfa.add_state(),
        };
        self.ndfa
            .add_epsilon_transition(self.current_state, next_state);
        self.previous_state = self.current_state;
        self.current_state = next_state;
    }

    /// Starts a group: remembers the current state so that `pop` and
    /// `begin_or` can return to it.
    pub fn push(&mut self) {
        self.stack.push((Some(self.current_state), None));
    }

    /// Ends a group. If an alternative chain is open, the current state is
    /// joined to its final state first. The previous state becomes the
    /// group's initial state so postfix operators apply to the whole group.
    pub fn pop(&mut self) -> bool {
        match self.stack.pop() {
            Some((initial, alt_final)) => {
                if let Some(final_state) = alt_final {
                    self.set_next_state(final_state);
                    self.epsilon();
                }
                if let Some(initial_state) = initial {
                    self.previous_state = initial_state;
                }
                true
            }
            None => false,
        }
    }

    /// Begins or continues an alternative: the current state is joined to the
    /// shared final state for the group and construction resumes from the
    /// group's initial state.
    pub fn begin_or(&mut self) {
        if self.stack.is_empty() {
            self.stack.push((Some(0), None));
        }
        let initial_state = self.stack.last().unwrap().0.unwrap_or(0);
        let previous_state = self.previous_state;

        if let Some(final_state) = self.stack.last().unwrap().1 {
            self.ndfa
                .add_epsilon_transition(self.current_state, final_state);
        } else {
            self.epsilon();
            self.stack.last_mut().unwrap().1 = Some(self.current_state);
            self.previous_state = previous_state;
        }

        self.current_state = initial_state;
    }

    /// Moves to the state after the current alternative chain, if one is open.
    pub fn rejoin(&mut self) {
        let top = match self.stack.last() {
            Some(&top) => top,
            None => return,
        };
        let final_state = match top.1 {
            Some(state) => state,
            None => return,
        };
        self.set_next_state(final_state);
        self.epsilon();
        self.stack.last_mut().unwrap().1 = None;
        if top.0.is_none() {
            self.stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_refer_to_existing_states() {
        let mut ndfa = Ndfa::new();
        let symbols = SymbolSet::from(SymbolRange::new('a' as i32, 'b' as i32));
        let state1 = ndfa.add_state();
        ndfa.add_transition(0, &symbols, state1);
        ndfa.accept(state1, AcceptAction::new(0));
        assert_eq!(ndfa.count_states(), 2);
        for state in 0..ndfa.count_states() {
            for transition in ndfa.state(state).transitions() {
                assert!(transition.new_state < ndfa.count_states());
            }
        }
        assert_eq!(ndfa.actions_for_state(state1), &[AcceptAction::new(0)]);
    }

    #[test]
    fn builder_or_rejoins_to_shared_final_state() {
        let mut ndfa = Ndfa::new();
        let mut cons = ndfa.builder();
        cons.push();
        cons.transit_symbol('a' as i32);
        cons.begin_or();
        cons.transit_symbol('b' as i32);
        cons.pop();
        let final_state = cons.current_state();
        ndfa.accept(final_state, AcceptAction::new(0));

        // Both branches must reach the accepting state through epsilons
        let dfa = ndfa.to_dfa(&[0]);
        assert!(dfa.matches("a"));
        assert!(dfa.matches("b"));
        assert!(!dfa.matches("c"));
    }

    #[test]
    fn surrogate_pairs_split_astral_ranges() {
        assert_eq!(surrogate_pair(0x10000), (0xd800, 0xdc00));
        assert_eq!(surrogate_pair(0x10ffff), (0xdbff, 0xdfff));
        assert_eq!(surrogate_pair(0x1d11e), (0xd834, 0xdd1e));

        let mut ndfa = Ndfa::new();
        let mut cons = ndfa.builder();
        cons.set_generate_surrogates(true);
        cons.transit(&SymbolSet::from(SymbolRange::single(0x1d11e)));
        let final_state = cons.current_state();
        ndfa.accept(final_state, AcceptAction::new(0));

        let dfa = ndfa.to_dfa(&[0]);
        assert!(dfa.matches_symbols(&[0xd834, 0xdd1e]));
        assert!(!dfa.matches_symbols(&[0x1d11e]));
    }
}
