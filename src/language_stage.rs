// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::{BTreeMap, BTreeSet};

use contextfree::{Grammar, Item, TerminalDictionary};
use dfa::Position;

use crate::ast::{
    DefinitionFile, EbnfItem, EbnfItemKind, LanguageBlock, LanguageUnit, LexemeType, LexerBlock,
};
use crate::console::{Console, Severity};
use crate::dequote::dequote_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Keywords,
    Lexer,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexerPattern {
    Regex(String),
    Literal(String),
}

/// One pattern bound to a terminal, in priority order: the position of a
/// definition in the list (equivalently, its terminal identifier) decides
/// which symbol wins when several match the same text.
#[derive(Debug, Clone)]
pub struct LexerDefinition {
    pub symbol: usize,
    pub pattern: LexerPattern,
    pub case_insensitive: bool,
    pub block_type: BlockType,
    pub is_weak: bool,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct ExpressionDefinition {
    pub value: String,
    pub is_literal: bool,
}

/// Everything the later stages need from one compiled language: the
/// terminal dictionary, the grammar, the lexer patterns and the symbol
/// classification sets.
#[derive(Debug, Default)]
pub struct LanguageData {
    pub terminals: TerminalDictionary,
    pub grammar: Grammar,
    pub expressions: BTreeMap<String, ExpressionDefinition>,
    pub lexer_definitions: Vec<LexerDefinition>,
    pub weak_symbols: BTreeSet<usize>,
    pub ignored_symbols: BTreeSet<usize>,
    /// Which kind of block each terminal was declared in; the lexer stage
    /// uses this to rank accept actions (keywords outrank lexer symbols,
    /// which outrank ignored ones).
    pub block_type_for_symbol: BTreeMap<usize, BlockType>,
    pub start_nonterminal: Option<usize>,
    pub guards: BTreeMap<usize, Position>,
}

/// Compiles a `language` block: inherited languages first, then the lexical
/// macros, the lexer blocks in priority order, the terminals implicit in the
/// grammar, and finally the context-free rules themselves.
pub struct LanguageStage<'a> {
    console: &'a mut Console,
    filename: String,
    file: &'a DefinitionFile,
    data: LanguageData,
    unused_symbols: BTreeSet<usize>,
    terminal_definitions: BTreeMap<usize, Position>,
    first_nonterminal_usage: BTreeMap<usize, Position>,
}

impl<'a> LanguageStage<'a> {
    pub fn compile(
        console: &'a mut Console,
        filename: &str,
        file: &'a DefinitionFile,
        language: &LanguageBlock,
    ) -> LanguageData {
        let mut stage = LanguageStage {
            console,
            filename: filename.to_string(),
            file,
            data: LanguageData::default(),
            unused_symbols: BTreeSet::new(),
            terminal_definitions: BTreeMap::new(),
            first_nonterminal_usage: BTreeMap::new(),
        };
        let mut chain = Vec::new();
        stage.compile_language(language, &mut chain);
        stage.validate();
        stage.report_unused_symbols();
        stage.data
    }

    fn error(&mut self, identifier: &str, message: &str, position: Position) {
        self.console
            .report(Severity::Error, &self.filename.clone(), identifier, message, position);
    }

    fn warning(&mut self, identifier: &str, message: &str, position: Position) {
        self.console
            .report(Severity::Warning, &self.filename.clone(), identifier, message, position);
    }

    fn detail(&mut self, identifier: &str, message: &str, position: Position) {
        self.console
            .report(Severity::Detail, &self.filename.clone(), identifier, message, position);
    }

    fn compile_language(&mut self, language: &LanguageBlock, chain: &mut Vec<String>) {
        if chain.contains(&language.identifier) {
            self.error(
                "LANGUAGE_INHERITANCE_LOOP",
                &format!(
                    "Language '{}' inherits from itself through {}",
                    language.identifier,
                    chain.join(" -> ")
                ),
                language.position,
            );
            return;
        }
        chain.push(language.identifier.clone());

        // The inherited language compiles into the same working state, so
        // its terminals and patterns take priority over this language's
        if let Some(parent_name) = language.inherits.first() {
            match self.file.language_with_name(parent_name) {
                Some(parent) => self.compile_language(parent, chain),
                None => {
                    self.error(
                        "CANT_FIND_LANGUAGE",
                        &format!("Unable to find language '{}'", parent_name),
                        language.position,
                    );
                }
            }
        }

        self.compile_lexer_symbols(language);
        self.compile_lexer_blocks(language);
        self.compile_implicit_terminals(language);
        self.compile_grammar_blocks(language);
        chain.pop();
    }

    fn compile_lexer_symbols(&mut self, language: &LanguageBlock) {
        for unit in language.units.iter() {
            let block = match unit {
                LanguageUnit::LexerSymbols(block) => block,
                _ => continue,
            };
            for definition in block.definitions.iter() {
                let name = definition.identifier.clone();
                let exists = self.data.expressions.contains_key(&name);
                if exists {
                    if !definition.add_to_definition && !definition.replace_definition {
                        self.error(
                            "DUPLICATE_LEXER_SYMBOL",
                            &format!("Duplicate lexer symbol: {}", name),
                            definition.position,
                        );
                        continue;
                    }
                } else if definition.add_to_definition {
                    self.error(
                        "MISSING_LEXER_SYMBOL_FOR_ADDING",
                        &format!("Cannot add definitions to nonexistent symbol: {}", name),
                        definition.position,
                    );
                    continue;
                } else if definition.replace_definition {
                    self.error(
                        "MISSING_LEXER_SYMBOL_FOR_REPLACING",
                        &format!("Cannot replace nonexistent symbol: {}", name),
                        definition.position,
                    );
                    continue;
                }

                let (value, is_literal) = match definition.lexeme_type {
                    LexemeType::Regex => (strip_slashes(&definition.definition), false),
                    LexemeType::String | LexemeType::Character => {
                        (dequote_string(&definition.definition), true)
                    }
                };

                if definition.add_to_definition {
                    let existing = self.data.expressions.get(&name).cloned().expect("checked");
                    if existing.is_literal || is_literal {
                        self.error(
                            "CANNOT_ADD_TO_DIFFERENT_LEXER_SYMBOL_TYPE",
                            &format!(
                                "Cannot add definitions to a symbol of a different kind: {}",
                                name
                            ),
                            definition.position,
                        );
                        continue;
                    }
                    self.data.expressions.insert(
                        name,
                        ExpressionDefinition {
                            value: format!("({})|({})", existing.value, value),
                            is_literal: false,
                        },
                    );
                } else {
                    // Covers both fresh definitions and := replacement
                    self.data
                        .expressions
                        .insert(name, ExpressionDefinition { value, is_literal });
                }
            }
        }
    }

    fn compile_lexer_blocks(&mut self, language: &LanguageBlock) {
        // Weak blocks have the highest priority; within a weakness the order
        // is keywords, then lexer, then ignore
        for is_weak in [true, false].iter().copied() {
            for block_type in [BlockType::Keywords, BlockType::Lexer, BlockType::Ignore]
                .iter()
                .copied()
            {
                for unit in language.units.iter() {
                    let block = match (unit, block_type) {
                        (LanguageUnit::Keywords(block), BlockType::Keywords) => block,
                        (LanguageUnit::Lexer(block), BlockType::Lexer) => block,
                        (LanguageUnit::Ignore(block), BlockType::Ignore) => block,
                        _ => continue,
                    };
                    if block.is_weak != is_weak {
                        continue;
                    }
                    self.compile_lexer_block(block, block_type, is_weak);
                }
            }
        }
    }

    fn compile_lexer_block(&mut self, block: &LexerBlock, block_type: BlockType, is_weak: bool) {
        for definition in block.definitions.iter() {
            let name = definition.identifier.clone();
            let symbol = if definition.add_to_definition {
                match self.data.terminals.symbol_for_name(&name) {
                    Some(symbol) => {
                        if self.data.block_type_for_symbol.get(&symbol) != Some(&block_type) {
                            self.error(
                                "CANNOT_ADD_TO_DIFFERENT_LEXER_SYMBOL_TYPE",
                                &format!(
                                    "Cannot add definitions to a symbol defined in a different lexer block: {}",
                                    name
                                ),
                                definition.position,
                            );
                            continue;
                        }
                        symbol
                    }
                    None => {
                        self.error(
                            "MISSING_LEXER_SYMBOL_FOR_ADDING",
                            &format!("Cannot add definitions to nonexistent symbol: {}", name),
                            definition.position,
                        );
                        continue;
                    }
                }
            } else if definition.replace_definition {
                match self.data.terminals.symbol_for_name(&name) {
                    Some(symbol) => {
                        // Drop the previous patterns; the identifier is kept
                        self.data
                            .lexer_definitions
                            .retain(|existing| existing.symbol != symbol);
                        self.terminal_definitions.remove(&symbol);
                        symbol
                    }
                    None => {
                        self.error(
                            "MISSING_LEXER_SYMBOL_FOR_REPLACING",
                            &format!("Cannot replace nonexistent symbol: {}", name),
                            definition.position,
                        );
                        continue;
                    }
                }
            } else {
                if let Some(existing) = self.data.terminals.symbol_for_name(&name) {
                    let first_defined = self
                        .terminal_definitions
                        .get(&existing)
                        .copied()
                        .unwrap_or_default();
                    self.error(
                        "DUPLICATE_LEXER_SYMBOL",
                        &format!("Duplicate lexer symbol: {}", name),
                        definition.position,
                    );
                    self.detail(
                        "DUPLICATE_LEXER_SYMBOL",
                        &format!("Symbol {} was first defined here", name),
                        first_defined,
                    );
                    // The first definition wins
                    continue;
                }
                self.data.terminals.add_named_symbol(&name)
            };

            self.data.block_type_for_symbol.insert(symbol, block_type);
            if block_type != BlockType::Ignore {
                self.unused_symbols.insert(symbol);
            }
            self.terminal_definitions
                .entry(symbol)
                .or_insert(definition.position);

            let pattern = match definition.lexeme_type {
                LexemeType::Regex => LexerPattern::Regex(strip_slashes(&definition.definition)),
                LexemeType::String | LexemeType::Character => {
                    LexerPattern::Literal(dequote_string(&definition.definition))
                }
            };
            self.data.lexer_definitions.push(LexerDefinition {
                symbol,
                pattern,
                case_insensitive: block.is_case_insensitive,
                block_type,
                is_weak,
                position: definition.position,
            });

            if block_type == BlockType::Ignore {
                self.data.ignored_symbols.insert(symbol);
            }
            if is_weak {
                self.data.weak_symbols.insert(symbol);
            }
        }
    }

    /// Interns the terminals that appear directly in productions: quoted
    /// strings and characters silently, bare identifiers with a warning.
    /// Either way they join the weak set so real lexer symbols outrank them.
    fn compile_implicit_terminals(&mut self, language: &LanguageBlock) {
        for unit in language.units.iter() {
            let block = match unit {
                LanguageUnit::Grammar(block) => block,
                _ => continue,
            };
            for nonterminal in block.nonterminals.iter() {
                for production in nonterminal.productions.iter() {
                    for item in production.items.iter() {
                        self.add_ebnf_lexer_items(item);
                    }
                }
            }
        }
    }

    fn add_ebnf_lexer_items(&mut self, item: &EbnfItem) {
        match &item.kind {
            EbnfItemKind::Parenthesized(children) | EbnfItemKind::Guard(children) => {
                for child in children {
                    self.add_ebnf_lexer_items(child);
                }
            }
            EbnfItemKind::Optional(child)
            | EbnfItemKind::RepeatZero(child)
            | EbnfItemKind::RepeatOne(child) => self.add_ebnf_lexer_items(child),
            EbnfItemKind::Alternative(left, right) => {
                self.add_ebnf_lexer_items(left);
                self.add_ebnf_lexer_items(right);
            }
            EbnfItemKind::Terminal(name) => {
                if self.data.terminals.symbol_for_name(name).is_some() {
                    return;
                }
                self.warning(
                    "IMPLICIT_LEXER_SYMBOL",
                    &format!("Implicitly defining keyword: {}", name),
                    item.position,
                );
                self.define_implicit(name, name.clone(), item.position);
            }
            EbnfItemKind::TerminalString(text) | EbnfItemKind::TerminalCharacter(text) => {
                if self.data.terminals.symbol_for_name(text).is_some() {
                    return;
                }
                self.define_implicit(text, dequote_string(text), item.position);
            }
            EbnfItemKind::Nonterminal(_) => (),
        }
    }

    fn define_implicit(&mut self, name: &str, literal: String, position: Position) {
        let symbol = self.data.terminals.add_named_symbol(name);
        self.data.lexer_definitions.push(LexerDefinition {
            symbol,
            pattern: LexerPattern::Literal(literal),
            case_insensitive: false,
            block_type: BlockType::Keywords,
            is_weak: true,
            position,
        });
        self.data
            .block_type_for_symbol
            .insert(symbol, BlockType::Keywords);
        self.unused_symbols.insert(symbol);
        self.terminal_definitions.entry(symbol).or_insert(position);
        self.data.weak_symbols.insert(symbol);
    }

    fn compile_grammar_blocks(&mut self, language: &LanguageBlock) {
        for unit in language.units.iter() {
            let block = match unit {
                LanguageUnit::Grammar(block) => block,
                _ => continue,
            };
            for nonterminal in block.nonterminals.iter() {
                let item_id = self.data.grammar.id_for_nonterminal(&nonterminal.identifier);
                if self.data.start_nonterminal.is_none() {
                    self.data.start_nonterminal = Some(item_id);
                }
                let already_defined = !self.data.grammar.rules_for_item(item_id).is_empty();
                match nonterminal.definition_type {
                    crate::ast::DefinitionType::Assignment if already_defined => {
                        self.error(
                            "DUPLICATE_NONTERMINAL_DEFINITION",
                            &format!(
                                "Duplicate nonterminal definition: {}",
                                nonterminal.identifier
                            ),
                            nonterminal.position,
                        );
                    }
                    crate::ast::DefinitionType::Replace if already_defined => {
                        self.data.grammar.clear_rules_for(item_id);
                    }
                    _ => (),
                }
                for production in nonterminal.productions.iter() {
                    let mut items = Vec::new();
                    for item in production.items.iter() {
                        self.compile_item(item, &mut items);
                    }
                    self.data.grammar.add_rule(item_id, items);
                }
            }
        }
    }

    /// Compiles one EBNF item to grammar items, appending to the sequence;
    /// a parenthesised group splices its children in directly.
    fn compile_item(&mut self, item: &EbnfItem, sequence: &mut Vec<usize>) {
        match &item.kind {
            EbnfItemKind::Terminal(name)
            | EbnfItemKind::TerminalString(name)
            | EbnfItemKind::TerminalCharacter(name) => {
                // Implicit terminals are interned by now, so the lookup holds
                let symbol = self
                    .data
                    .terminals
                    .symbol_for_name(name)
                    .expect("terminal defined before grammar compilation");
                self.unused_symbols.remove(&symbol);
                sequence.push(self.data.grammar.identifier_for_item(Item::Terminal(symbol)));
            }
            EbnfItemKind::Nonterminal(name) => {
                let item_id = self.data.grammar.id_for_nonterminal(name);
                self.first_nonterminal_usage
                    .entry(item_id)
                    .or_insert(item.position);
                sequence.push(item_id);
            }
            EbnfItemKind::Parenthesized(children) => {
                for child in children {
                    self.compile_item(child, sequence);
                }
            }
            EbnfItemKind::Optional(child) => {
                let mut content = Vec::new();
                self.compile_item(child, &mut content);
                sequence.push(self.data.grammar.intern_optional(content));
            }
            EbnfItemKind::RepeatZero(child) => {
                let mut content = Vec::new();
                self.compile_item(child, &mut content);
                sequence.push(self.data.grammar.intern_repeat_zero(content));
            }
            EbnfItemKind::RepeatOne(child) => {
                let mut content = Vec::new();
                self.compile_item(child, &mut content);
                sequence.push(self.data.grammar.intern_repeat_one(content));
            }
            EbnfItemKind::Alternative(left, right) => {
                let mut left_content = Vec::new();
                self.compile_item(left, &mut left_content);
                let mut right_content = Vec::new();
                self.compile_item(right, &mut right_content);
                sequence.push(
                    self.data
                        .grammar
                        .intern_alternate(left_content, right_content),
                );
            }
            EbnfItemKind::Guard(children) => {
                let mut content = Vec::new();
                for child in children {
                    self.compile_item(child, &mut content);
                }
                let guard_item = self.data.grammar.intern_guard(content);
                self.data.guards.entry(guard_item).or_insert(item.position);
                sequence.push(guard_item);
            }
        }
    }

    fn validate(&mut self) {
        // A nonterminal that was referenced but never given a rule
        let undefined: Vec<(String, Position)> = self
            .data
            .grammar
            .nonterminals()
            .filter(|(_, item_id)| self.data.grammar.rules_for_item(*item_id).is_empty())
            .map(|(name, item_id)| {
                let position = self
                    .first_nonterminal_usage
                    .get(&item_id)
                    .copied()
                    .unwrap_or_default();
                (name.to_string(), position)
            })
            .collect();
        for (name, position) in undefined {
            self.error(
                "UNDEFINED_NONTERMINAL",
                &format!("Undefined nonterminal: {}", name),
                position,
            );
        }

        // A guard whose rule can match the empty string always fires and
        // suppresses the alternatives it was meant to distinguish
        let firsts = self.data.grammar.compute_firsts();
        let guard_reports: Vec<(usize, Position)> = self
            .data
            .guards
            .iter()
            .map(|(&item, &position)| (item, position))
            .collect();
        for (guard_item, position) in guard_reports {
            if !firsts.first_of_item(guard_item).transparent {
                continue;
            }
            let rule_id = self.data.grammar.rules_for_item(guard_item)[0];
            if self.data.grammar.rule(rule_id).is_empty() {
                if self.console.get_option("allow-empty-guards").is_none() {
                    self.warning(
                        "EMPTY_GUARD",
                        "Empty guards are always accepted and will suppress alternative meanings of an expression",
                        position,
                    );
                }
            } else {
                let rendered = self
                    .data
                    .grammar
                    .item_to_string(guard_item, &self.data.terminals);
                self.error(
                    "INEFFECTIVE_GUARD",
                    &format!(
                        "Guard '{}' can match the empty string and will suppress other meanings of any rule it appears in",
                        rendered
                    ),
                    position,
                );
            }
        }
    }

    fn report_unused_symbols(&mut self) {
        let unused: Vec<(String, Position)> = self
            .unused_symbols
            .iter()
            .map(|&symbol| {
                let name = self
                    .data
                    .terminals
                    .name_for_symbol(symbol)
                    .unwrap_or("<anonymous>")
                    .to_string();
                let position = self
                    .terminal_definitions
                    .get(&symbol)
                    .copied()
                    .unwrap_or_default();
                (name, position)
            })
            .collect();
        for (name, position) in unused {
            self.warning(
                "UNUSED_TERMINAL_SYMBOL",
                &format!("Unused terminal symbol definition: {}", name),
                position,
            );
        }
    }
}

fn strip_slashes(definition: &str) -> String {
    let symbols: Vec<char> = definition.chars().collect();
    if symbols.len() >= 2 && symbols[0] == '/' && symbols[symbols.len() - 1] == '/' {
        symbols[1..symbols.len() - 1].iter().collect()
    } else {
        definition.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec_parser::parse_specification;

    fn compile(text: &str) -> (Console, LanguageData) {
        let mut console = Console::new();
        let file = parse_specification(text).unwrap();
        let language = file.languages().next().unwrap().clone();
        let data = LanguageStage::compile(&mut console, "test", &file, &language);
        (console, data)
    }

    #[test]
    fn terminals_and_rules_are_collected() {
        let (console, data) = compile(
            r#"
            language calc:
                lexer {
                    number = /[0-9]+/
                    plus = '+'
                }
                ignore { ws = /[ ]+/ }
                grammar {
                    <e> = <e> plus <t> | <t>
                    <t> = number
                }
            ;
            "#,
        );
        assert_eq!(console.error_count(), 0);
        assert_eq!(data.terminals.count_symbols(), 3);
        assert!(data.terminals.symbol_for_name("number").is_some());
        assert_eq!(data.lexer_definitions.len(), 3);
        assert_eq!(data.ignored_symbols.len(), 1);
        // Three user rules; the wrappers would add more
        assert_eq!(data.grammar.count_rules(), 3);
        assert_eq!(
            data.start_nonterminal,
            data.grammar.find_nonterminal("e")
        );
    }

    #[test]
    fn weak_keywords_precede_other_definitions() {
        let (console, data) = compile(
            r#"
            language l:
                weak keywords { while }
                lexer { ident = /[a-z]+/ }
                grammar { <s> = while ident | ident }
            ;
            "#,
        );
        assert_eq!(console.error_count(), 0);
        // The weak keyword was processed first, so it has the lower id
        let while_symbol = data.terminals.symbol_for_name("while").unwrap();
        let ident_symbol = data.terminals.symbol_for_name("ident").unwrap();
        assert!(while_symbol < ident_symbol);
        assert!(data.weak_symbols.contains(&while_symbol));
        assert!(!data.weak_symbols.contains(&ident_symbol));
    }

    #[test]
    fn duplicate_lexer_symbols_are_reported_first_wins() {
        let (console, data) = compile(
            r#"
            language l:
                lexer {
                    x = /a/
                    x = /b/
                }
                grammar { <s> = x }
            ;
            "#,
        );
        assert!(console.has_identifier("DUPLICATE_LEXER_SYMBOL"));
        // The first definition survived alone
        let symbol = data.terminals.symbol_for_name("x").unwrap();
        let patterns: Vec<&LexerDefinition> = data
            .lexer_definitions
            .iter()
            .filter(|definition| definition.symbol == symbol)
            .collect();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern, LexerPattern::Regex("a".to_string()));
    }

    #[test]
    fn add_to_and_replace_operators() {
        let (console, data) = compile(
            r#"
            language l:
                lexer {
                    x = /a/
                    x |= /b/
                    y = /c/
                    y := /d/
                }
                grammar { <s> = x y }
            ;
            "#,
        );
        assert_eq!(console.error_count(), 0);
        let x = data.terminals.symbol_for_name("x").unwrap();
        let y = data.terminals.symbol_for_name("y").unwrap();
        let x_patterns: Vec<&LexerPattern> = data
            .lexer_definitions
            .iter()
            .filter(|definition| definition.symbol == x)
            .map(|definition| &definition.pattern)
            .collect();
        assert_eq!(x_patterns.len(), 2);
        let y_patterns: Vec<&LexerPattern> = data
            .lexer_definitions
            .iter()
            .filter(|definition| definition.symbol == y)
            .map(|definition| &definition.pattern)
            .collect();
        assert_eq!(y_patterns, vec![&LexerPattern::Regex("d".to_string())]);
    }

    #[test]
    fn add_to_errors() {
        let (console, _) = compile(
            "language l: lexer { x |= /a/ } grammar { <s> = y } ;",
        );
        assert!(console.has_identifier("MISSING_LEXER_SYMBOL_FOR_ADDING"));

        let (console, _) = compile(
            "language l: keywords { x } lexer { x |= /a/ } grammar { <s> = x } ;",
        );
        assert!(console.has_identifier("CANNOT_ADD_TO_DIFFERENT_LEXER_SYMBOL_TYPE"));

        let (console, _) = compile(
            "language l: lexer { x := /a/ } grammar { <s> = x } ;",
        );
        assert!(console.has_identifier("MISSING_LEXER_SYMBOL_FOR_REPLACING"));
    }

    #[test]
    fn implicit_terminals_warn_and_join_the_weak_set() {
        let (console, data) = compile(
            r#"
            language l:
                lexer { ident = /[a-z]+/ }
                grammar { <s> = begin ident ";" }
            ;
            "#,
        );
        assert!(console.has_identifier("IMPLICIT_LEXER_SYMBOL"));
        let begin = data.terminals.symbol_for_name("begin").unwrap();
        let semi = data.terminals.symbol_for_name("\";\"").unwrap();
        assert!(data.weak_symbols.contains(&begin));
        assert!(data.weak_symbols.contains(&semi));
    }

    #[test]
    fn undefined_nonterminals_are_errors() {
        let (console, _) = compile(
            "language l: lexer { x = /a/ } grammar { <s> = x <missing> } ;",
        );
        assert!(console.has_identifier("UNDEFINED_NONTERMINAL"));
    }

    #[test]
    fn duplicate_nonterminals_need_the_adding_operator() {
        let (console, _) = compile(
            "language l: lexer { x = /a/ y = /b/ } grammar { <s> = x <s> = y } ;",
        );
        assert!(console.has_identifier("DUPLICATE_NONTERMINAL_DEFINITION"));

        let (console, data) = compile(
            "language l: lexer { x = /a/ y = /b/ } grammar { <s> = x <s> += y } ;",
        );
        assert_eq!(console.error_count(), 0);
        let s = data.grammar.find_nonterminal("s").unwrap();
        assert_eq!(data.grammar.rules_for_item(s).len(), 2);
    }

    #[test]
    fn replacing_nonterminal_rules() {
        let (console, data) = compile(
            "language l: lexer { x = /a/ y = /b/ } grammar { <s> = x <s> := y } ;",
        );
        assert_eq!(console.error_count(), 0);
        let s = data.grammar.find_nonterminal("s").unwrap();
        assert_eq!(data.grammar.rules_for_item(s).len(), 1);
    }

    #[test]
    fn unused_terminals_warn() {
        let (console, _) = compile(
            "language l: lexer { x = /a/ unused = /b/ } grammar { <s> = x } ;",
        );
        assert!(console.has_identifier("UNUSED_TERMINAL_SYMBOL"));
    }

    #[test]
    fn guard_validation() {
        // A guard that can derive empty without being empty is ineffective
        let (console, _) = compile(
            "language l: lexer { x = /a/ } grammar { <s> = [=> x?] x | x x } ;",
        );
        assert!(console.has_identifier("INEFFECTIVE_GUARD"));

        let (console, _) = compile(
            "language l: lexer { x = /a/ } grammar { <s> = [=>] x | x x } ;",
        );
        assert!(console.has_identifier("EMPTY_GUARD"));
        assert_eq!(console.error_count(), 0);
    }

    #[test]
    fn empty_guard_warning_can_be_suppressed() {
        let mut console = Console::new();
        console.set_option("allow-empty-guards", "yes");
        let file = parse_specification(
            "language l: lexer { x = /a/ } grammar { <s> = [=>] x | x x } ;",
        )
        .unwrap();
        let language = file.languages().next().unwrap().clone();
        LanguageStage::compile(&mut console, "test", &file, &language);
        assert!(!console.has_identifier("EMPTY_GUARD"));
    }

    #[test]
    fn inheritance_merges_parent_first() {
        let mut console = Console::new();
        let file = parse_specification(
            r#"
            language base:
                lexer { number = /[0-9]+/ }
                grammar { <item> = number }
            ;
            language derived, base:
                lexer { ident = /[a-z]+/ }
                grammar { <list> = <item>* ident }
            ;
            "#,
        )
        .unwrap();
        let language = file.language_with_name("derived").unwrap().clone();
        let data = LanguageStage::compile(&mut console, "test", &file, &language);
        assert_eq!(console.error_count(), 0);
        // The parent's terminal was interned first
        let number = data.terminals.symbol_for_name("number").unwrap();
        let ident = data.terminals.symbol_for_name("ident").unwrap();
        assert!(number < ident);
        assert!(data.grammar.find_nonterminal("item").is_some());
        // The parent's start nonterminal carries over
        assert_eq!(data.start_nonterminal, data.grammar.find_nonterminal("item"));
    }

    #[test]
    fn inheritance_loops_are_detected() {
        let mut console = Console::new();
        let file = parse_specification(
            "language a, b: grammar { <s> = x } ; language b, a: grammar { <t> = y } ;",
        )
        .unwrap();
        let language = file.language_with_name("a").unwrap().clone();
        LanguageStage::compile(&mut console, "test", &file, &language);
        assert!(console.has_identifier("LANGUAGE_INHERITANCE_LOOP"));
    }

    #[test]
    fn missing_parent_language_is_reported() {
        let (console, _) = compile("language a, nowhere: grammar { <s> = x } ;");
        assert!(console.has_identifier("CANT_FIND_LANGUAGE"));
    }
}
