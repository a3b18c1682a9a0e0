// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::BTreeMap;

use crate::error::RegexError;
use crate::ndfa::{Ndfa, NdfaBuilder};
use crate::range::SymbolRange;
use crate::symbol_set::SymbolSet;
use crate::unicode;
use crate::MAX_SYMBOL;

/// A sequence of code points, as fed to the automaton.
pub type SymbolString = Vec<i32>;

pub fn symbol_string(source: &str) -> SymbolString {
    source.chars().map(|c| c as i32).collect()
}

/// An NDFA under construction from regular expressions.
///
/// Each call to `add_regex` or `add_literal` compiles one pattern starting
/// at a chosen state and returns the pattern's final state, which the caller
/// marks with an accept action. Named subexpressions registered through
/// `define_expression`/`define_expression_literal` are substituted wherever
/// `{name}` appears; names that match no definition are tried as Unicode
/// category selectors.
#[derive(Debug, Default)]
pub struct NdfaRegex {
    ndfa: Ndfa,
    construct_surrogates: bool,
    case_insensitive: bool,
    expressions: BTreeMap<String, String>,
    literal_expressions: BTreeMap<String, String>,
}

impl NdfaRegex {
    pub fn new() -> Self {
        Self {
            ndfa: Ndfa::new(),
            construct_surrogates: false,
            case_insensitive: false,
            expressions: BTreeMap::new(),
            literal_expressions: BTreeMap::new(),
        }
    }

    pub fn set_construct_surrogates(&mut self, construct: bool) {
        self.construct_surrogates = construct;
    }

    pub fn set_case_insensitive(&mut self, case_insensitive: bool) {
        self.case_insensitive = case_insensitive;
    }

    /// Registers `{name}` as shorthand for a regular expression.
    pub fn define_expression(&mut self, name: &str, value: &str) {
        self.expressions.insert(name.to_string(), value.to_string());
    }

    /// Registers `{name}` as shorthand for a literal string.
    pub fn define_expression_literal(&mut self, name: &str, value: &str) {
        self.literal_expressions
            .insert(name.to_string(), value.to_string());
    }

    pub fn ndfa(&self) -> &Ndfa {
        &self.ndfa
    }

    pub fn ndfa_mut(&mut self) -> &mut Ndfa {
        &mut self.ndfa
    }

    pub fn into_ndfa(self) -> Ndfa {
        self.ndfa
    }

    /// Compiles a literal string starting at the given state; returns the
    /// final state.
    pub fn add_literal(&mut self, initial_state: usize, literal: &str) -> usize {
        let mut cons = self.ndfa.builder();
        cons.set_generate_surrogates(self.construct_surrogates);
        cons.set_case_insensitive(self.case_insensitive);
        cons.goto_state(initial_state);
        for character in literal.chars() {
            cons.transit_symbol(character as i32);
        }
        cons.current_state()
    }

    /// Compiles a regular expression starting at the given state; returns the
    /// final state.
    pub fn add_regex(&mut self, initial_state: usize, regex: &str) -> Result<usize, RegexError> {
        let expressions = &self.expressions;
        let literal_expressions = &self.literal_expressions;
        let mut cons = self.ndfa.builder();
        cons.set_generate_surrogates(self.construct_surrogates);
        cons.set_case_insensitive(self.case_insensitive);
        cons.goto_state(initial_state);

        let compiler = Compiler {
            expressions,
            literal_expressions,
        };
        compiler.compile_regex(&mut cons, &symbol_string(regex))?;
        Ok(cons.current_state())
    }
}

struct Compiler<'a> {
    expressions: &'a BTreeMap<String, String>,
    literal_expressions: &'a BTreeMap<String, String>,
}

struct Cursor<'a> {
    symbols: &'a [i32],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(symbols: &'a [i32]) -> Self {
        Self { symbols, pos: 0 }
    }

    fn peek(&self) -> Option<i32> {
        self.symbols.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<i32> {
        let symbol = self.peek()?;
        self.pos += 1;
        Some(symbol)
    }

    fn skip_if(&mut self, symbol: i32) -> bool {
        if self.peek() == Some(symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn back(&mut self) {
        debug_assert!(self.pos > 0);
        self.pos -= 1;
    }
}

impl<'a> Compiler<'a> {
    /// Compiles one regular expression at the builder's current state. The
    /// expression is bracketed by its own group so that a top-level `|`
    /// rejoins correctly and the caller's state is left at the final state.
    fn compile_regex(&self, cons: &mut NdfaBuilder, regex: &[i32]) -> Result<(), RegexError> {
        cons.epsilon();
        cons.push();

        let mut cursor = Cursor::new(regex);
        let mut depth = 0usize;
        while let Some(symbol) = cursor.next() {
            match char::from_u32(symbol as u32) {
                Some('(') => {
                    cons.push();
                    depth += 1;
                }
                Some(')') => {
                    if depth == 0 {
                        return Err(RegexError::MismatchedParenthesis);
                    }
                    cons.pop();
                    depth -= 1;
                }
                Some('|') => cons.begin_or(),
                Some('*') => {
                    let previous = cons.previous_state();
                    let current = cons.current_state();
                    // The subexpression may be skipped entirely...
                    cons.goto_state(previous);
                    cons.set_next_state(current);
                    cons.epsilon();
                    // ...or repeated
                    cons.goto_state(current);
                    cons.set_next_state(previous);
                    cons.epsilon();
                    cons.goto_state_with_previous(current, previous);
                }
                Some('+') => {
                    let previous = cons.previous_state();
                    let current = cons.current_state();
                    cons.goto_state(current);
                    cons.set_next_state(previous);
                    cons.epsilon();
                    cons.goto_state_with_previous(current, previous);
                }
                Some('?') => {
                    let previous = cons.previous_state();
                    let current = cons.current_state();
                    cons.goto_state(previous);
                    cons.set_next_state(current);
                    cons.epsilon();
                    cons.goto_state_with_previous(current, previous);
                }
                Some('.') => {
                    cons.transit(&SymbolSet::from(SymbolRange::new(0, MAX_SYMBOL)));
                }
                Some('[') => {
                    let symbols = self.compile_class(&mut cursor)?;
                    cons.transit(&symbols);
                }
                Some('{') => {
                    let mut name = String::new();
                    loop {
                        match cursor.next() {
                            Some(symbol) if symbol == '}' as i32 => break,
                            Some(symbol) => match char::from_u32(symbol as u32) {
                                Some(character) => name.push(character),
                                None => return Err(RegexError::UnknownExpression(name)),
                            },
                            None => return Err(RegexError::UnterminatedExpression),
                        }
                    }
                    cons.push();
                    self.compile_expression(cons, &name)?;
                    cons.pop();
                }
                _ => {
                    cursor.back();
                    let symbol = symbol_for_sequence(&mut cursor);
                    cons.transit_symbol(symbol);
                }
            }
        }

        if depth != 0 {
            return Err(RegexError::UnterminatedGroup);
        }
        cons.pop();
        Ok(())
    }

    fn compile_class(&self, cursor: &mut Cursor) -> Result<SymbolSet, RegexError> {
        let negate = cursor.skip_if('^' as i32);
        let mut symbols = SymbolSet::new();
        loop {
            match cursor.peek() {
                None => return Err(RegexError::UnterminatedCharacterClass),
                Some(symbol) if symbol == ']' as i32 => {
                    cursor.next();
                    break;
                }
                Some(_) => {
                    let initial = symbol_for_sequence(cursor);
                    if cursor.peek() == Some('-' as i32) {
                        cursor.next();
                        if cursor.peek() == Some(']' as i32) || cursor.peek().is_none() {
                            return Err(RegexError::UnterminatedCharacterClass);
                        }
                        let last = symbol_for_sequence(cursor);
                        // Class ranges are inclusive
                        symbols.insert(SymbolRange::new(initial.min(last), initial.max(last) + 1));
                    } else {
                        symbols.insert(SymbolRange::single(initial));
                    }
                }
            }
        }
        if negate {
            symbols.invert();
        }
        Ok(symbols)
    }

    /// Compiles the value of a `{}` expression: a defined regular expression,
    /// a defined literal, or a Unicode category selector, in that order.
    fn compile_expression(&self, cons: &mut NdfaBuilder, name: &str) -> Result<(), RegexError> {
        if let Some(value) = self.expressions.get(name) {
            return self.compile_regex(cons, &symbol_string(value));
        }
        if let Some(value) = self.literal_expressions.get(name) {
            for character in value.chars() {
                cons.transit_symbol(character as i32);
            }
            return Ok(());
        }
        if let Some(category) = unicode_for_expression(name) {
            if let Some(symbols) = unicode::symbols_for_category(&category) {
                cons.transit(symbols);
                return Ok(());
            }
        }
        Err(RegexError::UnknownExpression(name.to_string()))
    }
}

/// Reads one symbol at the cursor, translating `\`-escapes.
fn symbol_for_sequence(cursor: &mut Cursor) -> i32 {
    let symbol = match cursor.next() {
        Some(symbol) => symbol,
        None => return 0,
    };
    if symbol != '\\' as i32 {
        return symbol;
    }
    let quoted = match cursor.next() {
        Some(quoted) => quoted,
        None => return '\\' as i32,
    };
    match char::from_u32(quoted as u32) {
        Some('a') => 0x7,
        Some('e') => 0x1b,
        Some('n') => 0xa,
        Some('r') => 0xd,
        Some('f') => 0xc,
        Some('t') => 0x9,
        Some('u') => hex(cursor, 4),
        Some('x') => hex(cursor, 2),
        Some('o') => oct(cursor, 6),
        Some('0'..='9') => {
            cursor.back();
            oct(cursor, 3)
        }
        // The quoted character passes through untouched, so \. works
        _ => quoted,
    }
}

fn hex(cursor: &mut Cursor, max_digits: usize) -> i32 {
    let mut result = 0;
    for _ in 0..max_digits {
        let digit = match cursor.peek().and_then(|s| char::from_u32(s as u32)) {
            Some(character) => match character.to_digit(16) {
                Some(digit) => digit as i32,
                None => break,
            },
            None => break,
        };
        cursor.next();
        result = result * 16 + digit;
    }
    result
}

fn oct(cursor: &mut Cursor, max_digits: usize) -> i32 {
    let mut result = 0;
    for _ in 0..max_digits {
        let digit = match cursor.peek().and_then(|s| char::from_u32(s as u32)) {
            Some(character) => match character.to_digit(8) {
                Some(digit) => digit as i32,
                None => break,
            },
            None => break,
        };
        cursor.next();
        result = result * 8 + digit;
    }
    result
}

/// Maps a `{u-...}` / `{uni-...}` / `{unicode-...}` expression to a one- or
/// two-letter category code, or None if the name is not a category selector.
fn unicode_for_expression(name: &str) -> Option<String> {
    let rest = name
        .strip_prefix("u-")
        .or_else(|| name.strip_prefix("uni-"))
        .or_else(|| name.strip_prefix("unicode-"))?;

    let (main, modifiers): (char, &[(&str, char)]) = match rest.split('-').next()? {
        "letter" => (
            'L',
            &[
                ("uppercase", 'u'),
                ("lowercase", 'l'),
                ("titlecase", 't'),
                ("modifier", 'm'),
                ("other", 'o'),
            ],
        ),
        "mark" => (
            'M',
            &[("nonspacing", 'n'), ("spacing", 'c'), ("enclosing", 'e')],
        ),
        "number" => ('N', &[("decimal", 'd'), ("letter", 'l'), ("other", 'o')]),
        "punctuation" => (
            'P',
            &[
                ("connector", 'c'),
                ("dash", 'd'),
                ("open", 's'),
                ("close", 'e'),
                ("initial", 'i'),
                ("final", 'f'),
                ("other", 'o'),
            ],
        ),
        "symbol" => (
            'S',
            &[
                ("math", 'm'),
                ("currency", 'c'),
                ("modifier", 'k'),
                ("other", 'o'),
            ],
        ),
        "separator" => (
            'Z',
            &[("space", 's'), ("line", 'l'), ("paragraph", 'p')],
        ),
        "control" => (
            'C',
            &[
                ("control", 'c'),
                ("format", 'f'),
                ("surrogate", 's'),
                ("private", 'o'),
            ],
        ),
        _ => return None,
    };

    let mut result = main.to_string();
    let mut parts = rest.split('-');
    parts.next();
    match parts.next() {
        None => Some(result),
        Some(modifier_name) => {
            if parts.next().is_some() {
                return None;
            }
            let modifier = modifiers
                .iter()
                .find(|(word, _)| *word == modifier_name)
                .map(|(_, code)| *code)?;
            result.push(modifier);
            Some(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndfa::AcceptAction;

    fn compile(regex: &str) -> Ndfa {
        let mut source = NdfaRegex::new();
        let final_state = source.add_regex(0, regex).unwrap();
        source.ndfa_mut().accept(final_state, AcceptAction::new(0));
        source.into_ndfa().to_ndfa_with_unique_symbols().to_dfa(&[0])
    }

    #[test]
    fn literal_characters_and_dot() {
        let dfa = compile("a.c");
        assert!(dfa.matches("abc"));
        assert!(dfa.matches("axc"));
        assert!(!dfa.matches("ac"));
        assert!(!dfa.matches("abcd"));
    }

    #[test]
    fn alternation_and_grouping() {
        let dfa = compile("ab|cd");
        assert!(dfa.matches("ab"));
        assert!(dfa.matches("cd"));
        assert!(!dfa.matches("ad"));

        let dfa = compile("a(b|c)d");
        assert!(dfa.matches("abd"));
        assert!(dfa.matches("acd"));
        assert!(!dfa.matches("ad"));
    }

    #[test]
    fn repetition_operators() {
        let dfa = compile("ab*c");
        assert!(dfa.matches("ac"));
        assert!(dfa.matches("abbbc"));
        assert!(!dfa.matches("abb"));

        let dfa = compile("ab+c");
        assert!(!dfa.matches("ac"));
        assert!(dfa.matches("abc"));
        assert!(dfa.matches("abbc"));

        let dfa = compile("ab?c");
        assert!(dfa.matches("ac"));
        assert!(dfa.matches("abc"));
        assert!(!dfa.matches("abbc"));
    }

    #[test]
    fn grouped_repetition_applies_to_the_group() {
        let dfa = compile("(ab)+");
        assert!(dfa.matches("ab"));
        assert!(dfa.matches("abab"));
        assert!(!dfa.matches("aba"));
        assert!(!dfa.matches(""));
    }

    #[test]
    fn character_classes() {
        let dfa = compile("[a-z]+");
        assert!(dfa.matches("hello"));
        assert!(!dfa.matches("Hello"));
        assert!(!dfa.matches(""));

        let dfa = compile("[^0-9]");
        assert!(dfa.matches("x"));
        assert!(!dfa.matches("7"));

        let dfa = compile("[abc]");
        assert!(dfa.matches("b"));
        assert!(!dfa.matches("d"));
    }

    #[test]
    fn escapes() {
        let dfa = compile(r"\n");
        assert!(dfa.matches("\n"));
        let dfa = compile(r"\x41B");
        assert!(dfa.matches("AB"));
        let dfa = compile(r"\.");
        assert!(dfa.matches("."));
        assert!(!dfa.matches("x"));
        let dfa = compile(r"\o101");
        assert!(dfa.matches("A"));
    }

    #[test]
    fn named_expressions_expand() {
        let mut source = NdfaRegex::new();
        source.define_expression("digit", "[0-9]");
        source.define_expression_literal("arrow", "->");
        let final_state = source.add_regex(0, "{digit}+{arrow}").unwrap();
        source.ndfa_mut().accept(final_state, AcceptAction::new(0));
        let dfa = source.into_ndfa().to_ndfa_with_unique_symbols().to_dfa(&[0]);
        assert!(dfa.matches("42->"));
        assert!(!dfa.matches("->"));
        assert!(!dfa.matches("42"));
    }

    #[test]
    fn unicode_category_expressions() {
        let dfa = compile("{unicode-letter}+");
        assert!(dfa.matches("αβγ"));
        assert!(dfa.matches("abc"));
        assert!(!dfa.matches("123"));

        let dfa = compile("{u-letter-lowercase}+");
        assert!(dfa.matches("αβγ"));
        assert!(!dfa.matches("ΑΒΓ"));
    }

    #[test]
    fn case_insensitive_literals_fold_both_ways() {
        let mut source = NdfaRegex::new();
        source.set_case_insensitive(true);
        let final_state = source.add_regex(0, "if").unwrap();
        source.ndfa_mut().accept(final_state, AcceptAction::new(0));
        let dfa = source.into_ndfa().to_ndfa_with_unique_symbols().to_dfa(&[0]);
        assert!(dfa.matches("if"));
        assert!(dfa.matches("If"));
        assert!(dfa.matches("IF"));
        assert!(dfa.matches("iF"));
        assert!(!dfa.matches("id"));
    }

    #[test]
    fn malformed_regexes_are_rejected() {
        let mut source = NdfaRegex::new();
        assert_eq!(
            source.add_regex(0, "(ab"),
            Err(RegexError::UnterminatedGroup)
        );
        assert_eq!(
            source.add_regex(0, "ab)"),
            Err(RegexError::MismatchedParenthesis)
        );
        assert_eq!(
            source.add_regex(0, "[a-z"),
            Err(RegexError::UnterminatedCharacterClass)
        );
        assert_eq!(
            source.add_regex(0, "{nosuch}"),
            Err(RegexError::UnknownExpression("nosuch".to_string()))
        );
    }

    #[test]
    fn category_selector_names() {
        assert_eq!(unicode_for_expression("u-letter"), Some("L".to_string()));
        assert_eq!(
            unicode_for_expression("unicode-letter-uppercase"),
            Some("Lu".to_string())
        );
        assert_eq!(
            unicode_for_expression("uni-separator-space"),
            Some("Zs".to_string())
        );
        assert_eq!(unicode_for_expression("letter"), None);
        assert_eq!(unicode_for_expression("u-plant"), None);
    }
}
