// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

// End to end checks: compile a language specification through every stage,
// then drive the generated lexer and parser tables over real input.

use dfa::lexer::Lexeme;
use lazy_static::lazy_static;
use lr::{ParseActions, ParseSession, ParserTables};

use parsegen::ast::{LanguageUnit, LexerBlock};
use parsegen::console::Console;
use parsegen::language_stage::{LanguageData, LanguageStage};
use parsegen::lexer_stage::LexerStage;
use parsegen::parser_stage::ParserStage;
use parsegen::spec_parser::parse_specification;

struct Compiled {
    console: Console,
    data: LanguageData,
    lexer: dfa::Lexer,
    tables: ParserTables,
}

fn compile(text: &str) -> Compiled {
    let mut console = Console::new();
    let file = parse_specification(text).expect("specification parses");
    let language = file.languages().next().expect("a language").clone();
    let mut data = LanguageStage::compile(&mut console, "test", &file, &language);
    assert_eq!(console.error_count(), 0, "language stage errors");
    let lexer_output =
        LexerStage::compile(&mut console, "test", &mut data).expect("lexer compiles");
    assert_eq!(console.error_count(), 0, "lexer stage errors");
    let parser_output =
        ParserStage::compile(&mut console, "test", &mut data, &lexer_output.weak_symbols)
            .expect("parser compiles");
    Compiled {
        console,
        data,
        lexer: lexer_output.lexer,
        tables: parser_output.tables,
    }
}

/// Records shifted symbols and reduced rules, for asserting on parse order.
#[derive(Default)]
struct Recorder {
    shifted: Vec<usize>,
    reduced: Vec<usize>,
}

impl ParseActions for &mut Recorder {
    type Value = ();

    fn shift(&mut self, lexeme: &Lexeme) {
        self.shifted.push(lexeme.symbol);
    }

    fn reduce(&mut self, _nonterminal: usize, rule: usize, _values: Vec<()>) {
        self.reduced.push(rule);
    }
}

fn parse(compiled: &Compiled, input: &str) -> Result<Recorder, lr::ParseError> {
    let mut recorder = Recorder::default();
    let mut session = ParseSession::new(
        &compiled.tables,
        &mut recorder,
        compiled.lexer.stream(input),
    );
    session.parse()?;
    drop(session);
    Ok(recorder)
}

const ARITHMETIC: &str = r#"
language arithmetic:
    lexer {
        num = /[0-9]+/
        plus = '+'
    }
    ignore { ws = /[ ]+/ }
    grammar {
        <e> = <e> plus <t> | <t>
        <t> = num
    }
;
"#;

lazy_static! {
    static ref COMPILED_ARITHMETIC: Compiled = compile(ARITHMETIC);
}

#[test]
fn arithmetic_accepts_and_reduces_bottom_up() {
    let compiled = &*COMPILED_ARITHMETIC;
    assert_eq!(compiled.console.error_count(), 0);
    let recorder = parse(compiled, "1 + 2 + 3").unwrap();

    let grammar = &compiled.data.grammar;
    let e = grammar.find_nonterminal("e").unwrap();
    let t = grammar.find_nonterminal("t").unwrap();
    let reduced_to: Vec<usize> = recorder
        .reduced
        .iter()
        .map(|&rule| grammar.rule(rule).nonterminal())
        .collect();

    // Three reductions to t, and for e: first e: t then two e: e plus t
    assert_eq!(reduced_to.iter().filter(|&&n| n == t).count(), 3);
    assert_eq!(reduced_to.iter().filter(|&&n| n == e).count(), 3);
    assert_eq!(reduced_to, vec![t, e, t, e, t, e]);
    let e_rule_lengths: Vec<usize> = recorder
        .reduced
        .iter()
        .filter(|&&rule| grammar.rule(rule).nonterminal() == e)
        .map(|&rule| grammar.rule(rule).len())
        .collect();
    assert_eq!(e_rule_lengths, vec![1, 3, 3]);
}

#[test]
fn arithmetic_rejects_malformed_input() {
    let compiled = &*COMPILED_ARITHMETIC;
    assert!(parse(compiled, "1 + + 2").is_err());
    assert!(parse(compiled, "1 2").is_err());
    assert!(parse(compiled, "+").is_err());
}

const WEAK_KEYWORD: &str = r#"
language weaklang:
    weak keywords { if }
    lexer {
        ident = /[a-z]+/
        number = /[0-9]+/
    }
    ignore { ws = /[ ]+/ }
    grammar {
        <s> = <conditional> | <reference>
        <conditional> = if number
        <reference> = ref ident
    }
;
"#;

#[test]
fn weak_keyword_acts_as_keyword_where_expected() {
    let compiled = compile(WEAK_KEYWORD);
    let if_symbol = compiled.data.terminals.symbol_for_name("if").unwrap();
    let recorder = parse(&compiled, "if 1").unwrap();
    assert_eq!(recorder.shifted[0], if_symbol);
}

#[test]
fn weak_keyword_becomes_identifier_elsewhere() {
    let compiled = compile(WEAK_KEYWORD);
    let ident_symbol = compiled.data.terminals.symbol_for_name("ident").unwrap();
    // After "ref" only an identifier can follow, so the keyword is shifted
    // with the strong symbol substituted
    let recorder = parse(&compiled, "ref if").unwrap();
    assert_eq!(recorder.shifted[1], ident_symbol);
    // An ordinary identifier is untouched
    let recorder = parse(&compiled, "ref foo").unwrap();
    assert_eq!(recorder.shifted[1], ident_symbol);
}

const EBNF_OPERATORS: &str = r#"
language ebnf:
    grammar {
        <a> = 'x'? 'y'* 'z'
    }
;
"#;

#[test]
fn optional_and_repeat_operators() {
    let compiled = compile(EBNF_OPERATORS);
    assert!(parse(&compiled, "z").is_ok());
    assert!(parse(&compiled, "xz").is_ok());
    assert!(parse(&compiled, "yz").is_ok());
    assert!(parse(&compiled, "xyyyz").is_ok());
    assert!(parse(&compiled, "xxz").is_err());
    assert!(parse(&compiled, "x").is_err());
    assert!(parse(&compiled, "").is_err());
}

#[test]
fn repeat_one_operator() {
    let compiled = compile(
        r#"
        language l:
            grammar { <a> = 'x'+ 'z' }
        ;
        "#,
    );
    assert!(parse(&compiled, "xz").is_ok());
    assert!(parse(&compiled, "xxxz").is_ok());
    assert!(parse(&compiled, "z").is_err());
}

#[test]
fn case_insensitive_keywords() {
    // The specification grammar has no spelling for case-insensitive
    // blocks, so flip the flag on the parsed tree the way the driving
    // program would
    let mut console = Console::new();
    let file = parse_specification(
        r#"
        language ci:
            keywords { if }
            lexer { ident = /[a-z]+/ }
            ignore { ws = /[ ]+/ }
            grammar { <s> = if ident }
        ;
        "#,
    )
    .unwrap();
    let mut language = file.languages().next().unwrap().clone();
    for unit in language.units.iter_mut() {
        if let LanguageUnit::Keywords(LexerBlock {
            is_case_insensitive,
            ..
        }) = unit
        {
            *is_case_insensitive = true;
        }
    }
    let mut data = LanguageStage::compile(&mut console, "test", &file, &language);
    let lexer_output = LexerStage::compile(&mut console, "test", &mut data).unwrap();
    let parser_output =
        ParserStage::compile(&mut console, "test", &mut data, &lexer_output.weak_symbols).unwrap();
    let compiled = Compiled {
        console,
        data,
        lexer: lexer_output.lexer,
        tables: parser_output.tables,
    };

    assert!(parse(&compiled, "if x").is_ok());
    assert!(parse(&compiled, "If x").is_ok());
    assert!(parse(&compiled, "IF x").is_ok());
    assert!(parse(&compiled, "iF x").is_ok());
}

#[test]
fn unicode_category_patterns() {
    let compiled = compile(
        r#"
        language unicode:
            lexer { word = /{unicode-letter}+/ }
            ignore { ws = /[ ]+/ }
            grammar { <s> = word }
        ;
        "#,
    );
    assert!(parse(&compiled, "αβγ").is_ok());
    assert!(parse(&compiled, "word").is_ok());
    assert!(parse(&compiled, "123").is_err());
}

const GUARDED: &str = r#"
language guarded:
    lexer {
        ident = /[a-z]+/
    }
    ignore { ws = /[ ]+/ }
    grammar {
        <stmt> = [=> ident ':'] <label> | <expr>
        <label> = ident ':' ident
        <expr> = ident '+' ident
    }
;
"#;

#[test]
fn guard_selects_between_branches() {
    let compiled = compile(GUARDED);
    let grammar = &compiled.data.grammar;
    let label = grammar.find_nonterminal("label").unwrap();
    let expr = grammar.find_nonterminal("expr").unwrap();

    let recorder = parse(&compiled, "foo : bar").unwrap();
    let reduced_to: Vec<usize> = recorder
        .reduced
        .iter()
        .map(|&rule| grammar.rule(rule).nonterminal())
        .collect();
    assert!(reduced_to.contains(&label));
    assert!(!reduced_to.contains(&expr));

    let recorder = parse(&compiled, "foo + bar").unwrap();
    let reduced_to: Vec<usize> = recorder
        .reduced
        .iter()
        .map(|&rule| grammar.rule(rule).nonterminal())
        .collect();
    assert!(reduced_to.contains(&expr));
    assert!(!reduced_to.contains(&label));
}

#[test]
fn sessions_are_deterministic() {
    let compiled = compile(GUARDED);
    let first = parse(&compiled, "foo : bar").unwrap();
    let second = parse(&compiled, "foo : bar").unwrap();
    assert_eq!(first.shifted, second.shifted);
    assert_eq!(first.reduced, second.reduced);
}

#[test]
fn lexical_errors_surface_as_parse_errors() {
    let compiled = &*COMPILED_ARITHMETIC;
    match parse(compiled, "1 ! 2") {
        Err(lr::ParseError::Lexical(error, _)) => assert_eq!(error.character, '!'),
        other => panic!("expected a lexical error, got {:?}", other.err()),
    }
}

#[test]
fn warnings_do_not_stop_compilation() {
    let mut console = Console::new();
    let file = parse_specification(
        r#"
        language warned:
            lexer {
                used = /[a-z]+/
                unused = /[0-9]+/
            }
            grammar { <s> = used }
        ;
        "#,
    )
    .unwrap();
    let language = file.languages().next().unwrap().clone();
    let mut data = LanguageStage::compile(&mut console, "test", &file, &language);
    assert!(console.has_identifier("UNUSED_TERMINAL_SYMBOL"));
    assert_eq!(console.error_count(), 0);
    assert!(LexerStage::compile(&mut console, "test", &mut data).is_some());
}
