// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::VecDeque;
use std::fmt;

use dfa::lexer::{Lexeme, LexicalError};

use crate::parser_tables::{ActionKind, ParserTables};

/// What a parse produces: the session calls `shift` for every consumed
/// lexeme and `reduce` for every completed rule. A tree-building parser and
/// a value-computing parser differ only in their implementation of this
/// trait.
pub trait ParseActions {
    type Value: Default;

    fn shift(&mut self, lexeme: &Lexeme) -> Self::Value;

    fn reduce(&mut self, nonterminal: usize, rule: usize, values: Vec<Self::Value>) -> Self::Value;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Lexical(LexicalError, Vec<usize>),
    Syntax {
        found: Option<Lexeme>,
        expected: Vec<usize>,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Lexical(error, _) => write!(f, "Lexical error: {}", error),
            ParseError::Syntax {
                found: Some(lexeme),
                ..
            } => write!(f, "Syntax error: unexpected {}", lexeme),
            ParseError::Syntax { found: None, .. } => {
                write!(f, "Syntax error: unexpected end of input")
            }
        }
    }
}

#[derive(Debug, Clone)]
enum LookaheadSymbol {
    Lexeme(Lexeme),
    Error(LexicalError),
    End,
}

/// The shared lookahead buffer of a parse session.
///
/// The main parser and any speculative sub-parsers (guards, weak-reduce
/// checks) read the same buffer by absolute index; entries the main parser
/// has moved past are reclaimed lazily, so speculation never copies
/// lexemes. Symbols arrive from the lexer strictly in input order and every
/// reader sees that order.
struct LookaheadBuffer<'a> {
    source: Box<dyn Iterator<Item = Result<Lexeme, LexicalError>> + 'a>,
    entries: VecDeque<LookaheadSymbol>,
    base: usize,
}

impl<'a> LookaheadBuffer<'a> {
    fn new(source: impl Iterator<Item = Result<Lexeme, LexicalError>> + 'a) -> Self {
        Self {
            source: Box::new(source),
            entries: VecDeque::new(),
            base: 0,
        }
    }

    fn at(&mut self, index: usize) -> LookaheadSymbol {
        debug_assert!(index >= self.base);
        while self.base + self.entries.len() <= index {
            let entry = match self.source.next() {
                Some(Ok(lexeme)) => LookaheadSymbol::Lexeme(lexeme),
                Some(Err(error)) => LookaheadSymbol::Error(error),
                None => LookaheadSymbol::End,
            };
            self.entries.push_back(entry);
        }
        self.entries[index - self.base].clone()
    }

    /// Drops entries below the lowest index any live parser still holds.
    fn trim(&mut self, live: usize) {
        while self.base < live && !self.entries.is_empty() {
            self.entries.pop_front();
            self.base += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolKey {
    Terminal(usize),
    Item(usize),
}

/// A single parse over one lexeme stream.
///
/// The tables are shared and read-only; the session owns the mutable stack
/// and lookahead buffer. Speculative sub-parsers keep state-only stacks and
/// share the session's lookahead.
pub struct ParseSession<'a, A: ParseActions> {
    tables: &'a ParserTables,
    actions: A,
    stack: Vec<(usize, A::Value)>,
    lookahead: LookaheadBuffer<'a>,
    position: usize,
}

impl<'a, A: ParseActions> ParseSession<'a, A> {
    pub fn new(
        tables: &'a ParserTables,
        actions: A,
        source: impl Iterator<Item = Result<Lexeme, LexicalError>> + 'a,
    ) -> Self {
        Self {
            tables,
            actions,
            stack: vec![(0, A::Value::default())],
            lookahead: LookaheadBuffer::new(source),
            position: 0,
        }
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn into_actions(self) -> A {
        self.actions
    }

    /// The value reduced for the start symbol, available after a successful
    /// parse.
    pub fn into_result(mut self) -> Option<A::Value> {
        self.stack.pop().map(|(_, value)| value)
    }

    fn current_state(&self) -> usize {
        self.stack.last().expect("stack never empties").0
    }

    fn stack_states(&self) -> Vec<usize> {
        self.stack.iter().map(|&(state, _)| state).collect()
    }

    /// Runs the parse to acceptance or the first error.
    pub fn parse(&mut self) -> Result<(), ParseError> {
        loop {
            match self.step()? {
                StepResult::More => (),
                StepResult::Accepted => return Ok(()),
            }
        }
    }

    fn step(&mut self) -> Result<StepResult, ParseError> {
        let current = self.current_state();
        match self.lookahead.at(self.position) {
            LookaheadSymbol::Error(error) => {
                let expected = self.tables.expected_terminals(current);
                Err(ParseError::Lexical(error, expected))
            }
            LookaheadSymbol::End => self.step_end_of_input(current),
            LookaheadSymbol::Lexeme(lexeme) => self.step_lexeme(current, lexeme),
        }
    }

    fn step_end_of_input(&mut self, current: usize) -> Result<StepResult, ParseError> {
        let end_of_input = self.tables.end_of_input();
        let candidates = self.tables.find_nonterminal(current, end_of_input).to_vec();
        for action in candidates {
            match action.kind {
                ActionKind::Accept => return Ok(StepResult::Accepted),
                ActionKind::Reduce => {
                    self.perform_reduce(action.payload);
                    return Ok(StepResult::More);
                }
                ActionKind::WeakReduce => {
                    if self.simulated_reduce_shifts(SymbolKey::Item(end_of_input), action.payload)
                    {
                        self.perform_reduce(action.payload);
                        return Ok(StepResult::More);
                    }
                }
                _ => (),
            }
        }
        Err(ParseError::Syntax {
            found: None,
            expected: self.tables.expected_terminals(current),
        })
    }

    fn step_lexeme(&mut self, current: usize, lexeme: Lexeme) -> Result<StepResult, ParseError> {
        let candidates = self.tables.find_terminal(current, lexeme.symbol).to_vec();
        for action in candidates {
            match action.kind {
                ActionKind::Shift => {
                    let value = self.actions.shift(&lexeme);
                    self.stack.push((action.payload, value));
                    self.advance();
                    return Ok(StepResult::More);
                }
                ActionKind::ShiftStrong => {
                    // The weak terminal stands in for its strong equivalent
                    let mut strong_lexeme = lexeme.clone();
                    if let Some(strong) = self.tables.strong_for_weak(lexeme.symbol) {
                        strong_lexeme.symbol = strong;
                    }
                    let value = self.actions.shift(&strong_lexeme);
                    self.stack.push((action.payload, value));
                    self.advance();
                    return Ok(StepResult::More);
                }
                ActionKind::Reduce => {
                    self.perform_reduce(action.payload);
                    return Ok(StepResult::More);
                }
                ActionKind::WeakReduce => {
                    if self
                        .simulated_reduce_shifts(SymbolKey::Terminal(lexeme.symbol), action.payload)
                    {
                        self.perform_reduce(action.payload);
                        return Ok(StepResult::More);
                    }
                }
                ActionKind::Guard => {
                    if self.check_guard(action.payload, self.position) {
                        let guard = *self.tables.guard(action.payload);
                        let goto_state = self.expect_goto(current, guard.guard_item);
                        // The guard consumed no input; it reduces to nothing
                        self.stack.push((goto_state, A::Value::default()));
                        return Ok(StepResult::More);
                    }
                }
                ActionKind::Ignore => {
                    self.advance();
                    return Ok(StepResult::More);
                }
                ActionKind::Accept | ActionKind::Goto => (),
            }
        }
        Err(ParseError::Syntax {
            found: Some(lexeme),
            expected: self.tables.expected_terminals(current),
        })
    }

    fn advance(&mut self) {
        self.position += 1;
        self.lookahead.trim(self.position);
    }

    fn perform_reduce(&mut self, reduce_index: usize) {
        let reduce = *self.tables.reduce_rule(reduce_index);
        let split_at = self.stack.len() - reduce.length;
        let values: Vec<A::Value> = self.stack.drain(split_at..).map(|(_, value)| value).collect();
        let top_state = self.current_state();
        let goto_state = self.expect_goto(top_state, reduce.nonterminal);
        let value = self.actions.reduce(reduce.nonterminal, reduce.rule, values);
        self.stack.push((goto_state, value));
    }

    fn expect_goto(&self, state: usize, nonterminal: usize) -> usize {
        for action in self.tables.find_nonterminal(state, nonterminal) {
            if action.kind == ActionKind::Goto {
                return action.payload;
            }
        }
        panic!("malformed goto table: ({}, {})", nonterminal, state);
    }

    /// The can-reduce check: true if, after performing the reduce and any
    /// further reduces it enables, the symbol can eventually be shifted.
    fn simulated_reduce_shifts(&self, key: SymbolKey, reduce_index: usize) -> bool {
        let mut states = self.stack_states();
        if !simulate_reduce(self.tables, &mut states, reduce_index) {
            return false;
        }
        can_be_shifted(self.tables, key, states)
    }

    /// Evaluates a guard against the lookahead from `offset` on, using a
    /// state-only stack rooted at the guard's start state. The main stack
    /// and lookahead position are untouched.
    fn check_guard(&mut self, guard_index: usize, start_offset: usize) -> bool {
        let guard = *self.tables.guard(guard_index);
        let mut states = vec![guard.start_state];
        let mut offset = start_offset;

        loop {
            let current = *states.last().expect("guard stack never empties");

            // The guard has matched when its end marker could be accepted
            if self.tables.has_end_of_guard_actions(current)
                && !self.tables.find_nonterminal(current, guard.eog_item).is_empty()
                && can_be_shifted(self.tables, SymbolKey::Item(guard.eog_item), states.clone())
            {
                return true;
            }

            let symbol = match self.lookahead.at(offset) {
                LookaheadSymbol::Lexeme(lexeme) => lexeme.symbol,
                // Nothing more to read: the guard can no longer match
                _ => return false,
            };

            let candidates = self.tables.find_terminal(current, symbol).to_vec();
            let mut advanced = false;
            for action in candidates {
                match action.kind {
                    ActionKind::Shift | ActionKind::ShiftStrong => {
                        states.push(action.payload);
                        offset += 1;
                        advanced = true;
                    }
                    ActionKind::Reduce => {
                        if !simulate_reduce(self.tables, &mut states, action.payload) {
                            return false;
                        }
                        advanced = true;
                    }
                    ActionKind::WeakReduce => {
                        let mut trial = states.clone();
                        if simulate_reduce(self.tables, &mut trial, action.payload)
                            && can_be_shifted(
                                self.tables,
                                SymbolKey::Terminal(symbol),
                                trial.clone(),
                            )
                        {
                            states = trial;
                            advanced = true;
                        }
                    }
                    ActionKind::Guard => {
                        if self.check_guard(action.payload, offset) {
                            let inner = *self.tables.guard(action.payload);
                            let mut found = None;
                            for goto in self.tables.find_nonterminal(current, inner.guard_item) {
                                if goto.kind == ActionKind::Goto {
                                    found = Some(goto.payload);
                                    break;
                                }
                            }
                            match found {
                                Some(goto_state) => {
                                    states.push(goto_state);
                                    advanced = true;
                                }
                                None => return false,
                            }
                        }
                    }
                    ActionKind::Ignore => {
                        offset += 1;
                        advanced = true;
                    }
                    ActionKind::Accept | ActionKind::Goto => (),
                }
                if advanced {
                    break;
                }
            }
            if !advanced {
                return false;
            }
        }
    }
}

enum StepResult {
    More,
    Accepted,
}

/// Applies a reduce to a state-only stack; false if the goto is missing.
fn simulate_reduce(tables: &ParserTables, states: &mut Vec<usize>, reduce_index: usize) -> bool {
    let reduce = *tables.reduce_rule(reduce_index);
    if states.len() <= reduce.length {
        return false;
    }
    states.truncate(states.len() - reduce.length);
    let top = *states.last().expect("checked above");
    for action in tables.find_nonterminal(top, reduce.nonterminal) {
        if action.kind == ActionKind::Goto {
            states.push(action.payload);
            return true;
        }
    }
    false
}

/// True if the symbol can be acted on from the state configuration, chasing
/// reduces as far as they go.
fn can_be_shifted(tables: &ParserTables, key: SymbolKey, states: Vec<usize>) -> bool {
    let state = match states.last() {
        Some(&state) => state,
        None => return false,
    };
    let candidates = match key {
        SymbolKey::Terminal(symbol) => tables.find_terminal(state, symbol),
        SymbolKey::Item(item) => tables.find_nonterminal(state, item),
    };
    for action in candidates {
        match action.kind {
            ActionKind::Shift
            | ActionKind::ShiftStrong
            | ActionKind::Accept
            | ActionKind::Guard
            | ActionKind::Ignore => return true,
            ActionKind::Reduce | ActionKind::WeakReduce => {
                let mut trial = states.clone();
                if simulate_reduce(tables, &mut trial, action.payload)
                    && can_be_shifted(tables, key, trial)
                {
                    return true;
                }
            }
            ActionKind::Goto => (),
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use contextfree::{Grammar, Item};
    use dfa::Position;
    use std::collections::BTreeSet;

    use crate::action::Action;
    use crate::lalr_builder::LalrBuilder;
    use crate::weak_symbols::WeakSymbols;

    const PLUS: usize = 0;
    const NUM: usize = 1;
    const IF_KW: usize = 2;
    const IDENT: usize = 3;
    const COLON: usize = 4;

    fn lexeme(symbol: usize, text: &str) -> Result<Lexeme, LexicalError> {
        Ok(Lexeme {
            symbol,
            text: text.to_string(),
            position: Position::default(),
        })
    }

    /// Records the order of shifts and reductions.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ParseActions for &mut Recorder {
        type Value = ();

        fn shift(&mut self, lexeme: &Lexeme) {
            self.events.push(format!("shift {}", lexeme.text));
        }

        fn reduce(&mut self, _nonterminal: usize, rule: usize, _values: Vec<()>) {
            self.events.push(format!("reduce {}", rule));
        }
    }

    fn arithmetic_tables() -> (Grammar, ParserTables) {
        // E: E plus T | T ; T: num
        let mut grammar = Grammar::new();
        let plus = grammar.identifier_for_item(Item::Terminal(PLUS));
        let num = grammar.identifier_for_item(Item::Terminal(NUM));
        let e = grammar.id_for_nonterminal("E");
        let t = grammar.id_for_nonterminal("T");
        grammar.add_rule(e, vec![e, plus, t]);
        grammar.add_rule(e, vec![t]);
        grammar.add_rule(t, vec![num]);
        let builder = LalrBuilder::build(&mut grammar, e);
        let tables = ParserTables::new(&builder, &grammar, None, &BTreeSet::new());
        (grammar, tables)
    }

    #[test]
    fn arithmetic_parse_reduces_leftmost_bottom_up() {
        let (_, tables) = arithmetic_tables();
        let input = vec![
            lexeme(NUM, "1"),
            lexeme(PLUS, "+"),
            lexeme(NUM, "2"),
            lexeme(PLUS, "+"),
            lexeme(NUM, "3"),
        ];
        let mut recorder = Recorder::default();
        let mut session = ParseSession::new(&tables, &mut recorder, input.into_iter());
        session.parse().unwrap();
        drop(session);
        // Rules: 0 is E: E plus T, 1 is E: T, 2 is T: num
        assert_eq!(
            recorder.events,
            vec![
                "shift 1",
                "reduce 2",
                "reduce 1",
                "shift +",
                "shift 2",
                "reduce 2",
                "reduce 0",
                "shift +",
                "shift 3",
                "reduce 2",
                "reduce 0",
            ]
        );
    }

    #[test]
    fn rejection_names_the_expected_terminals() {
        let (_, tables) = arithmetic_tables();
        let input = vec![lexeme(NUM, "1"), lexeme(NUM, "2")];
        let mut recorder = Recorder::default();
        let mut session = ParseSession::new(&tables, &mut recorder, input.into_iter());
        match session.parse() {
            Err(ParseError::Syntax {
                found: Some(found),
                expected,
            }) => {
                assert_eq!(found.symbol, NUM);
                assert!(expected.contains(&PLUS));
            }
            other => panic!("expected a syntax error, got {:?}", other.err()),
        }
    }

    #[test]
    fn sessions_are_deterministic() {
        let (_, tables) = arithmetic_tables();
        let mut runs = Vec::new();
        for _ in 0..2 {
            let input = vec![
                lexeme(NUM, "1"),
                lexeme(PLUS, "+"),
                lexeme(NUM, "2"),
            ];
            let mut recorder = Recorder::default();
            let mut session = ParseSession::new(&tables, &mut recorder, input.into_iter());
            session.parse().unwrap();
            drop(session);
            runs.push(recorder.events);
        }
        assert_eq!(runs[0], runs[1]);
    }

    fn weak_keyword_tables() -> (Grammar, ParserTables) {
        // Stmt: if_kw num | ident ; the keyword is weak with ident strong
        let mut grammar = Grammar::new();
        let if_item = grammar.identifier_for_item(Item::Terminal(IF_KW));
        let num = grammar.identifier_for_item(Item::Terminal(NUM));
        let ident = grammar.identifier_for_item(Item::Terminal(IDENT));
        let stmt = grammar.id_for_nonterminal("Stmt");
        grammar.add_rule(stmt, vec![if_item, num]);
        grammar.add_rule(stmt, vec![ident]);

        let builder = LalrBuilder::build(&mut grammar, stmt);
        let mut weak = WeakSymbols::new();
        weak.add_pair(IDENT, IF_KW);
        for state in builder.states() {
            state.with_actions(|actions| weak.rewrite_actions(actions, &grammar));
        }
        let tables = ParserTables::new(&builder, &grammar, Some(&weak), &BTreeSet::new());
        (grammar, tables)
    }

    #[test]
    fn weak_keyword_shifts_as_keyword_when_expected() {
        let (_, tables) = weak_keyword_tables();
        let input = vec![lexeme(IF_KW, "if"), lexeme(NUM, "1")];
        let mut recorder = Recorder::default();
        let mut session = ParseSession::new(&tables, &mut recorder, input.into_iter());
        session.parse().unwrap();
    }

    #[test]
    fn weak_keyword_substitutes_the_strong_symbol() {
        // A grammar that only ever expects an identifier: the weak keyword
        // must be shifted as one
        let mut grammar = Grammar::new();
        let ident = grammar.identifier_for_item(Item::Terminal(IDENT));
        grammar.identifier_for_item(Item::Terminal(IF_KW));
        let stmt = grammar.id_for_nonterminal("Stmt");
        grammar.add_rule(stmt, vec![ident]);

        let builder = LalrBuilder::build(&mut grammar, stmt);
        let mut weak = WeakSymbols::new();
        weak.add_pair(IDENT, IF_KW);
        for state in builder.states() {
            state.with_actions(|actions| weak.rewrite_actions(actions, &grammar));
        }
        let tables = ParserTables::new(&builder, &grammar, Some(&weak), &BTreeSet::new());

        #[derive(Default)]
        struct SymbolLog(Vec<usize>);
        impl ParseActions for &mut SymbolLog {
            type Value = ();
            fn shift(&mut self, lexeme: &Lexeme) {
                self.0.push(lexeme.symbol);
            }
            fn reduce(&mut self, _: usize, _: usize, _: Vec<()>) {}
        }

        let input = vec![lexeme(IF_KW, "if")];
        let mut log = SymbolLog::default();
        let mut session = ParseSession::new(&tables, &mut log, input.into_iter());
        session.parse().unwrap();
        drop(session);
        assert_eq!(log.0, vec![IDENT]);
    }

    #[test]
    fn weak_reduce_fires_only_when_shiftable_afterwards() {
        // S: A if_kw | A ident ; A: ident — after the first ident the
        // reduce of A on the weak keyword must pass the can-reduce check
        let mut grammar = Grammar::new();
        let if_item = grammar.identifier_for_item(Item::Terminal(IF_KW));
        let ident = grammar.identifier_for_item(Item::Terminal(IDENT));
        let s = grammar.id_for_nonterminal("S");
        let a = grammar.id_for_nonterminal("A");
        grammar.add_rule(s, vec![a, if_item]);
        grammar.add_rule(s, vec![a, ident]);
        grammar.add_rule(a, vec![ident]);

        let builder = LalrBuilder::build(&mut grammar, s);
        let mut weak = WeakSymbols::new();
        weak.add_pair(IDENT, IF_KW);
        for state in builder.states() {
            state.with_actions(|actions| weak.rewrite_actions(actions, &grammar));
        }
        let tables = ParserTables::new(&builder, &grammar, Some(&weak), &BTreeSet::new());

        // The A: ident state really does hold a weak reduce for the keyword
        let state0 = builder.state(0);
        let after_ident = state0.goto_for(ident).unwrap();
        assert!(builder
            .state(after_ident)
            .actions()
            .actions_for(if_item)
            .iter()
            .any(|action| matches!(action, Action::WeakReduce(_))));

        let input = vec![lexeme(IDENT, "x"), lexeme(IF_KW, "if")];
        let mut recorder = Recorder::default();
        let mut session = ParseSession::new(&tables, &mut recorder, input.into_iter());
        session.parse().unwrap();
        drop(session);
        // The reduce fired, then the keyword was shifted
        assert!(recorder.events.contains(&"reduce 2".to_string()));
        assert!(recorder.events.contains(&"shift if".to_string()));
    }

    fn guarded_tables() -> (Grammar, ParserTables) {
        // Stmt: [=> ident colon] Label | Expr
        // Label: ident colon ident ; Expr: ident plus ident
        let mut grammar = Grammar::new();
        let ident = grammar.identifier_for_item(Item::Terminal(IDENT));
        let colon = grammar.identifier_for_item(Item::Terminal(COLON));
        let plus = grammar.identifier_for_item(Item::Terminal(PLUS));
        let stmt = grammar.id_for_nonterminal("Stmt");
        let label = grammar.id_for_nonterminal("Label");
        let expr = grammar.id_for_nonterminal("Expr");
        let guard = grammar.intern_guard(vec![ident, colon]);
        grammar.add_rule(stmt, vec![guard, label]);
        grammar.add_rule(stmt, vec![expr]);
        grammar.add_rule(label, vec![ident, colon, ident]);
        grammar.add_rule(expr, vec![ident, plus, ident]);

        let builder = LalrBuilder::build(&mut grammar, stmt);
        let tables = ParserTables::new(&builder, &grammar, None, &BTreeSet::new());
        (grammar, tables)
    }

    #[test]
    fn guard_selects_the_label_branch() {
        let (_, tables) = guarded_tables();
        let input = vec![
            lexeme(IDENT, "foo"),
            lexeme(COLON, ":"),
            lexeme(IDENT, "bar"),
        ];
        let mut recorder = Recorder::default();
        let mut session = ParseSession::new(&tables, &mut recorder, input.into_iter());
        session.parse().unwrap();
        drop(session);
        // The label rule fired and the guard consumed no input
        assert!(recorder.events.iter().any(|event| event == "shift foo"));
        assert!(recorder.events.iter().any(|event| event == "shift bar"));
    }

    #[test]
    fn failed_guard_falls_through_to_the_expression_branch() {
        let (_, tables) = guarded_tables();
        let input = vec![
            lexeme(IDENT, "foo"),
            lexeme(PLUS, "+"),
            lexeme(IDENT, "bar"),
        ];
        let mut recorder = Recorder::default();
        let mut session = ParseSession::new(&tables, &mut recorder, input.into_iter());
        session.parse().unwrap();
    }

    #[test]
    fn guard_failure_without_alternative_is_an_error() {
        let (_, tables) = guarded_tables();
        let input = vec![lexeme(COLON, ":")];
        let mut recorder = Recorder::default();
        let mut session = ParseSession::new(&tables, &mut recorder, input.into_iter());
        assert!(session.parse().is_err());
    }
}
