// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::fmt;

use crate::ndfa::Ndfa;
use crate::position::Position;

/// One row of the flattened transition table: the ranges are sorted and
/// non-overlapping, so lookup is a binary search.
#[derive(Debug, Default, Clone)]
struct LexerState {
    // (lower, upper, target) over [lower, upper)
    transitions: Vec<(i32, i32, usize)>,
    accept: Option<(usize, bool)>,
}

impl LexerState {
    fn next_state(&self, symbol: i32) -> Option<usize> {
        let index = self
            .transitions
            .partition_point(|&(lower, _, _)| lower <= symbol);
        if index == 0 {
            return None;
        }
        let (lower, upper, target) = self.transitions[index - 1];
        if symbol >= lower && symbol < upper {
            Some(target)
        } else {
            None
        }
    }
}

/// An immutable table-driven lexer built from a deterministic automaton.
///
/// Where a state carries several accept actions the lowest terminal
/// identifier wins, matching the priority used everywhere else in the
/// pipeline. The tables may be shared read-only between any number of
/// streams.
#[derive(Debug, Clone)]
pub struct Lexer {
    states: Vec<LexerState>,
}

impl Lexer {
    pub fn new(dfa: &Ndfa) -> Self {
        debug_assert!(dfa.verify_is_dfa());
        let mut states = Vec::with_capacity(dfa.count_states());
        for state_id in 0..dfa.count_states() {
            let mut transitions = Vec::new();
            for transition in dfa.state(state_id).transitions() {
                let symbols = dfa.symbols().symbols_for_id(transition.symbol_set);
                for range in symbols.iter() {
                    transitions.push((range.lower(), range.upper(), transition.new_state));
                }
            }
            transitions.sort();

            let accept = dfa
                .actions_for_state(state_id)
                .iter()
                .min()
                .map(|action| (action.symbol, action.eager));

            states.push(LexerState {
                transitions,
                accept,
            });
        }
        Self { states }
    }

    pub fn count_states(&self) -> usize {
        self.states.len()
    }

    /// Approximate table size in bytes, for reporting.
    pub fn size(&self) -> usize {
        self.states
            .iter()
            .map(|state| std::mem::size_of::<LexerState>() + state.transitions.len() * 16)
            .sum()
    }

    pub fn stream<'a>(&'a self, text: &'a str) -> LexemeStream<'a> {
        LexemeStream {
            lexer: self,
            symbols: text.chars().collect(),
            position: Position::default(),
            next_index: 0,
        }
    }
}

/// A token matched by the lexer: the terminal symbol, the matched text and
/// the position of its first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub symbol: usize,
    pub text: String,
    pub position: Position,
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\" at {}", self.text, self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalError {
    pub character: char,
    pub position: Position,
}

impl fmt::Display for LexicalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "unexpected character {:?} at {}",
            self.character, self.position
        )
    }
}

/// Streams lexemes from a text using the longest-match rule; an eager accept
/// ends the match immediately instead.
#[derive(Debug)]
pub struct LexemeStream<'a> {
    lexer: &'a Lexer,
    symbols: Vec<char>,
    position: Position,
    next_index: usize,
}

impl<'a> Iterator for LexemeStream<'a> {
    type Item = Result<Lexeme, LexicalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.symbols.len() {
            return None;
        }

        let start_index = self.next_index;
        let start_position = self.position;
        let mut state = 0;
        let mut index = start_index;
        let mut last_accept: Option<(usize, usize)> = None; // (end index, symbol)

        loop {
            if let Some((symbol, eager)) = self.lexer.states[state].accept {
                last_accept = Some((index, symbol));
                if eager {
                    break;
                }
            }
            let character = match self.symbols.get(index) {
                Some(&character) => character,
                None => break,
            };
            match self.lexer.states[state].next_state(character as i32) {
                Some(next_state) => {
                    state = next_state;
                    index += 1;
                }
                None => break,
            }
        }

        match last_accept {
            Some((end_index, symbol)) => {
                let text: String = self.symbols[start_index..end_index].iter().collect();
                for &character in &self.symbols[start_index..end_index] {
                    self.position.advance(character);
                }
                self.next_index = end_index;
                Some(Ok(Lexeme {
                    symbol,
                    text,
                    position: start_position,
                }))
            }
            None => {
                let character = self.symbols[start_index];
                self.position.advance(character);
                self.next_index = start_index + 1;
                Some(Err(LexicalError {
                    character,
                    position: start_position,
                }))
            }
        }
    }
}
