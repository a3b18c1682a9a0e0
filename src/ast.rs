// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

// The parsed form of a specification file. The language compiler walks this
// tree; it is produced by the specification parser and built directly by
// tests.

use dfa::Position;

#[derive(Debug, Default, Clone)]
pub struct DefinitionFile {
    pub blocks: Vec<TopLevelBlock>,
}

impl DefinitionFile {
    pub fn languages(&self) -> impl Iterator<Item = &LanguageBlock> {
        self.blocks.iter().filter_map(|block| match block {
            TopLevelBlock::Language(language) => Some(language),
            _ => None,
        })
    }

    pub fn language_with_name(&self, name: &str) -> Option<&LanguageBlock> {
        self.languages()
            .find(|language| language.identifier == name)
    }
}

#[derive(Debug, Clone)]
pub enum TopLevelBlock {
    Language(LanguageBlock),
    Import(ImportBlock),
}

#[derive(Debug, Clone)]
pub struct ImportBlock {
    pub filename: String,
    pub position: Position,
}

#[derive(Debug, Default, Clone)]
pub struct LanguageBlock {
    pub identifier: String,
    pub inherits: Vec<String>,
    pub units: Vec<LanguageUnit>,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub enum LanguageUnit {
    LexerSymbols(LexerBlock),
    Keywords(LexerBlock),
    Lexer(LexerBlock),
    Ignore(LexerBlock),
    Grammar(GrammarBlock),
}

#[derive(Debug, Default, Clone)]
pub struct LexerBlock {
    pub is_weak: bool,
    pub is_case_insensitive: bool,
    pub definitions: Vec<LexemeDefinition>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeType {
    Regex,
    String,
    Character,
}

/// `name = /re/`, `name |= "text"`, `name := 'c'` and friends.
#[derive(Debug, Clone)]
pub struct LexemeDefinition {
    pub identifier: String,
    pub lexeme_type: LexemeType,
    /// True for `|=`: adds to an existing definition.
    pub add_to_definition: bool,
    /// True for `:=`: replaces an existing definition.
    pub replace_definition: bool,
    /// The raw text including its delimiters.
    pub definition: String,
    pub position: Position,
}

#[derive(Debug, Default, Clone)]
pub struct GrammarBlock {
    pub nonterminals: Vec<NonterminalDefinition>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionType {
    /// `=`: defines a new nonterminal.
    Assignment,
    /// `+=`: appends productions to an existing nonterminal.
    AddTo,
    /// `:=`: replaces the productions of an existing nonterminal.
    Replace,
}

#[derive(Debug, Clone)]
pub struct NonterminalDefinition {
    pub identifier: String,
    pub definition_type: DefinitionType,
    pub productions: Vec<ProductionDefinition>,
    pub position: Position,
}

#[derive(Debug, Default, Clone)]
pub struct ProductionDefinition {
    pub items: Vec<EbnfItem>,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct EbnfItem {
    pub kind: EbnfItemKind,
    pub position: Position,
}

impl EbnfItem {
    pub fn new(kind: EbnfItemKind) -> Self {
        Self {
            kind,
            position: Position::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum EbnfItemKind {
    /// A reference to a nonterminal by name.
    Nonterminal(String),
    /// A reference to a named lexeme.
    Terminal(String),
    /// A quoted string appearing directly in a production.
    TerminalString(String),
    /// A quoted character appearing directly in a production.
    TerminalCharacter(String),
    Parenthesized(Vec<EbnfItem>),
    Optional(Box<EbnfItem>),
    RepeatZero(Box<EbnfItem>),
    RepeatOne(Box<EbnfItem>),
    Alternative(Box<EbnfItem>, Box<EbnfItem>),
    /// `[=> ...]`: a lookahead predicate.
    Guard(Vec<EbnfItem>),
}
