// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

// A hand-written parser for the specification language itself. It only has
// to bootstrap the AST that the language compiler consumes, so it is a plain
// recursive descent over a pre-scanned token list.

use std::fmt;

use dfa::Position;

use crate::ast::{
    DefinitionFile, DefinitionType, EbnfItem, EbnfItemKind, GrammarBlock, ImportBlock,
    LanguageBlock, LanguageUnit, LexemeDefinition, LexemeType, LexerBlock,
    NonterminalDefinition, ProductionDefinition, TopLevelBlock,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecParseError {
    pub message: String,
    pub position: Position,
}

impl fmt::Display for SpecParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    NonterminalName(String),
    StringLit(String),
    CharLit(String),
    RegexLit(String),
    Colon,
    Semicolon,
    Comma,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Question,
    Star,
    Plus,
    Bar,
    Equals,
    AddAssign,
    OrAssign,
    ColonAssign,
    GuardOpen,
    CloseBracket,
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::NonterminalName(name) => write!(f, "nonterminal <{}>", name),
            Token::StringLit(text) => write!(f, "string {}", text),
            Token::CharLit(text) => write!(f, "character {}", text),
            Token::RegexLit(text) => write!(f, "regex {}", text),
            Token::Colon => write!(f, "\":\""),
            Token::Semicolon => write!(f, "\";\""),
            Token::Comma => write!(f, "\",\""),
            Token::OpenBrace => write!(f, "\"{{\""),
            Token::CloseBrace => write!(f, "\"}}\""),
            Token::OpenParen => write!(f, "\"(\""),
            Token::CloseParen => write!(f, "\")\""),
            Token::Question => write!(f, "\"?\""),
            Token::Star => write!(f, "\"*\""),
            Token::Plus => write!(f, "\"+\""),
            Token::Bar => write!(f, "\"|\""),
            Token::Equals => write!(f, "\"=\""),
            Token::AddAssign => write!(f, "\"+=\""),
            Token::OrAssign => write!(f, "\"|=\""),
            Token::ColonAssign => write!(f, "\":=\""),
            Token::GuardOpen => write!(f, "\"[=>\""),
            Token::CloseBracket => write!(f, "\"]\""),
            Token::End => write!(f, "end of input"),
        }
    }
}

fn is_ident_start(character: char) -> bool {
    character.is_alphabetic() || character == '_'
}

fn is_ident_continue(character: char) -> bool {
    character.is_alphanumeric() || character == '_' || character == '-'
}

fn scan(text: &str) -> Result<Vec<(Token, Position)>, SpecParseError> {
    let symbols: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut position = Position::default();
    let mut pos = 0;

    let advance = |position: &mut Position, symbols: &[char], pos: &mut usize| {
        position.advance(symbols[*pos]);
        *pos += 1;
    };

    while pos < symbols.len() {
        let start = position;
        let character = symbols[pos];
        if character.is_whitespace() {
            advance(&mut position, &symbols, &mut pos);
            continue;
        }

        if is_ident_start(character) {
            let mut name = String::new();
            while pos < symbols.len() && is_ident_continue(symbols[pos]) {
                name.push(symbols[pos]);
                advance(&mut position, &symbols, &mut pos);
            }
            tokens.push((Token::Ident(name), start));
            continue;
        }

        // Quoted forms keep their delimiters; dequoting happens later
        if character == '"' || character == '\'' || character == '/' {
            let delimiter = character;
            let mut raw = String::new();
            raw.push(delimiter);
            advance(&mut position, &symbols, &mut pos);
            loop {
                if pos >= symbols.len() {
                    return Err(SpecParseError {
                        message: format!("unterminated {} literal", delimiter),
                        position: start,
                    });
                }
                let next = symbols[pos];
                raw.push(next);
                advance(&mut position, &symbols, &mut pos);
                if next == '\\' {
                    if pos < symbols.len() {
                        raw.push(symbols[pos]);
                        advance(&mut position, &symbols, &mut pos);
                    }
                    continue;
                }
                if next == delimiter {
                    break;
                }
            }
            let token = match delimiter {
                '"' => Token::StringLit(raw),
                '\'' => Token::CharLit(raw),
                _ => Token::RegexLit(raw),
            };
            tokens.push((token, start));
            continue;
        }

        if character == '<' {
            advance(&mut position, &symbols, &mut pos);
            let mut name = String::new();
            while pos < symbols.len() && symbols[pos] != '>' {
                name.push(symbols[pos]);
                advance(&mut position, &symbols, &mut pos);
            }
            if pos >= symbols.len() {
                return Err(SpecParseError {
                    message: "unterminated nonterminal name".to_string(),
                    position: start,
                });
            }
            advance(&mut position, &symbols, &mut pos);
            tokens.push((Token::NonterminalName(name), start));
            continue;
        }

        let peek = |offset: usize| symbols.get(pos + offset).copied();
        let token = match character {
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '{' => Token::OpenBrace,
            '}' => Token::CloseBrace,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            '?' => Token::Question,
            '*' => Token::Star,
            ']' => Token::CloseBracket,
            '=' => Token::Equals,
            ':' if peek(1) == Some('=') => Token::ColonAssign,
            ':' => Token::Colon,
            '+' if peek(1) == Some('=') => Token::AddAssign,
            '+' => Token::Plus,
            '|' if peek(1) == Some('=') => Token::OrAssign,
            '|' => Token::Bar,
            '[' if peek(1) == Some('=') && peek(2) == Some('>') => Token::GuardOpen,
            other => {
                return Err(SpecParseError {
                    message: format!("unexpected character {:?}", other),
                    position: start,
                });
            }
        };
        let width = match token {
            Token::ColonAssign | Token::AddAssign | Token::OrAssign => 2,
            Token::GuardOpen => 3,
            _ => 1,
        };
        for _ in 0..width {
            advance(&mut position, &symbols, &mut pos);
        }
        tokens.push((token, start));
    }

    tokens.push((Token::End, position));
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, Position)>,
    pos: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn position(&self) -> Position {
        self.tokens[self.pos].1
    }

    fn next(&mut self) -> (Token, Position) {
        let entry = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        entry
    }

    fn error<T>(&self, message: String) -> Result<T, SpecParseError> {
        Err(SpecParseError {
            message,
            position: self.position(),
        })
    }

    fn expect(&mut self, token: Token) -> Result<Position, SpecParseError> {
        if *self.current() == token {
            Ok(self.next().1)
        } else {
            self.error(format!("expected {} but found {}", token, self.current()))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Position), SpecParseError> {
        match self.current().clone() {
            Token::Ident(name) => {
                let position = self.next().1;
                Ok((name, position))
            }
            other => self.error(format!("expected an identifier but found {}", other)),
        }
    }

    fn parse_definition_file(&mut self) -> Result<DefinitionFile, SpecParseError> {
        let mut file = DefinitionFile::default();
        loop {
            match self.current().clone() {
                Token::End => return Ok(file),
                Token::Ident(name) if name == "language" => {
                    let language = self.parse_language_block()?;
                    file.blocks.push(TopLevelBlock::Language(language));
                }
                Token::Ident(name) if name == "import" => {
                    let position = self.next().1;
                    match self.current().clone() {
                        Token::StringLit(filename) => {
                            self.next();
                            file.blocks.push(TopLevelBlock::Import(ImportBlock {
                                filename: crate::dequote::dequote_string(&filename),
                                position,
                            }));
                        }
                        other => {
                            return self.error(format!("expected a string but found {}", other))
                        }
                    }
                }
                other => {
                    return self.error(format!(
                        "expected \"language\" or \"import\" but found {}",
                        other
                    ))
                }
            }
        }
    }

    fn parse_language_block(&mut self) -> Result<LanguageBlock, SpecParseError> {
        let position = self.next().1; // the "language" keyword
        let (identifier, _) = self.expect_ident()?;
        let mut inherits = Vec::new();
        while *self.current() == Token::Comma {
            self.next();
            let (parent, _) = self.expect_ident()?;
            inherits.push(parent);
        }
        self.expect(Token::Colon)?;

        let mut units = Vec::new();
        loop {
            match self.current().clone() {
                Token::Semicolon => {
                    self.next();
                    break;
                }
                Token::Ident(name) => {
                    let unit = self.parse_language_unit(&name)?;
                    units.push(unit);
                }
                other => {
                    return self.error(format!(
                        "expected a language definition or \";\" but found {}",
                        other
                    ))
                }
            }
        }
        Ok(LanguageBlock {
            identifier,
            inherits,
            units,
            position,
        })
    }

    fn parse_language_unit(&mut self, keyword: &str) -> Result<LanguageUnit, SpecParseError> {
        let position = self.position();
        let (is_weak, keyword) = if keyword == "weak" {
            self.next();
            match self.current().clone() {
                Token::Ident(name) => (true, name),
                other => {
                    return self.error(format!(
                        "expected \"lexer\" or \"keywords\" but found {}",
                        other
                    ))
                }
            }
        } else {
            (false, keyword.to_string())
        };

        match keyword.as_str() {
            "lexer-symbols" => {
                self.next();
                let block = self.parse_lexer_block(false, position)?;
                Ok(LanguageUnit::LexerSymbols(block))
            }
            "lexer" => {
                self.next();
                let block = self.parse_lexer_block(is_weak, position)?;
                Ok(LanguageUnit::Lexer(block))
            }
            "keywords" => {
                self.next();
                let block = self.parse_lexer_block(is_weak, position)?;
                Ok(LanguageUnit::Keywords(block))
            }
            "ignore" => {
                self.next();
                let block = self.parse_lexer_block(false, position)?;
                Ok(LanguageUnit::Ignore(block))
            }
            "grammar" => {
                self.next();
                let block = self.parse_grammar_block(position)?;
                Ok(LanguageUnit::Grammar(block))
            }
            other => self.error(format!("unknown language definition \"{}\"", other)),
        }
    }

    fn parse_lexer_block(
        &mut self,
        is_weak: bool,
        position: Position,
    ) -> Result<LexerBlock, SpecParseError> {
        self.expect(Token::OpenBrace)?;
        let mut definitions = Vec::new();
        loop {
            match self.current().clone() {
                Token::CloseBrace => {
                    self.next();
                    break;
                }
                Token::Ident(identifier) => {
                    let item_position = self.next().1;
                    let (add_to_definition, replace_definition) = match self.current() {
                        Token::Equals => {
                            self.next();
                            (false, false)
                        }
                        Token::OrAssign => {
                            self.next();
                            (true, false)
                        }
                        Token::ColonAssign => {
                            self.next();
                            (false, true)
                        }
                        // A bare keyword stands for itself
                        _ => {
                            definitions.push(LexemeDefinition {
                                identifier: identifier.clone(),
                                lexeme_type: LexemeType::String,
                                add_to_definition: false,
                                replace_definition: false,
                                definition: format!("\"{}\"", identifier),
                                position: item_position,
                            });
                            continue;
                        }
                    };
                    let (lexeme_type, definition) = match self.current().clone() {
                        Token::RegexLit(raw) => (LexemeType::Regex, raw),
                        Token::StringLit(raw) => (LexemeType::String, raw),
                        Token::CharLit(raw) => (LexemeType::Character, raw),
                        other => {
                            return self.error(format!(
                                "expected a regex, string or character but found {}",
                                other
                            ))
                        }
                    };
                    self.next();
                    definitions.push(LexemeDefinition {
                        identifier,
                        lexeme_type,
                        add_to_definition,
                        replace_definition,
                        definition,
                        position: item_position,
                    });
                }
                other => {
                    return self.error(format!(
                        "expected a lexeme definition or \"}}\" but found {}",
                        other
                    ))
                }
            }
        }
        Ok(LexerBlock {
            is_weak,
            is_case_insensitive: false,
            definitions,
            position,
        })
    }

    fn parse_grammar_block(&mut self, position: Position) -> Result<GrammarBlock, SpecParseError> {
        self.expect(Token::OpenBrace)?;
        let mut nonterminals = Vec::new();
        loop {
            match self.current().clone() {
                Token::CloseBrace => {
                    self.next();
                    break;
                }
                Token::NonterminalName(identifier) => {
                    let item_position = self.next().1;
                    let definition_type = match self.current() {
                        Token::Equals => DefinitionType::Assignment,
                        Token::AddAssign => DefinitionType::AddTo,
                        Token::ColonAssign => DefinitionType::Replace,
                        other => {
                            return self.error(format!(
                                "expected \"=\", \"+=\" or \":=\" but found {}",
                                other
                            ))
                        }
                    };
                    self.next();
                    let mut productions = vec![self.parse_production()?];
                    while *self.current() == Token::Bar {
                        self.next();
                        productions.push(self.parse_production()?);
                    }
                    nonterminals.push(NonterminalDefinition {
                        identifier,
                        definition_type,
                        productions,
                        position: item_position,
                    });
                }
                other => {
                    return self.error(format!(
                        "expected a nonterminal definition or \"}}\" but found {}",
                        other
                    ))
                }
            }
        }
        Ok(GrammarBlock {
            nonterminals,
            position,
        })
    }

    /// True if the current position starts a new nonterminal definition
    /// rather than continuing the current production.
    fn at_nonterminal_definition(&self) -> bool {
        if !matches!(self.current(), Token::NonterminalName(_)) {
            return false;
        }
        matches!(
            self.tokens.get(self.pos + 1).map(|(token, _)| token),
            Some(Token::Equals) | Some(Token::AddAssign) | Some(Token::ColonAssign)
        )
    }

    fn parse_production(&mut self) -> Result<ProductionDefinition, SpecParseError> {
        let position = self.position();
        let mut items = Vec::new();
        loop {
            match self.current() {
                Token::Bar | Token::CloseBrace | Token::End => break,
                _ if self.at_nonterminal_definition() => break,
                _ => items.push(self.parse_ebnf_item()?),
            }
        }
        Ok(ProductionDefinition { items, position })
    }

    fn parse_ebnf_item(&mut self) -> Result<EbnfItem, SpecParseError> {
        let position = self.position();
        let mut item = self.parse_primary_item()?;
        loop {
            let kind = match self.current() {
                Token::Question => EbnfItemKind::Optional(Box::new(item.clone())),
                Token::Star => EbnfItemKind::RepeatZero(Box::new(item.clone())),
                Token::Plus => EbnfItemKind::RepeatOne(Box::new(item.clone())),
                _ => break,
            };
            self.next();
            item = EbnfItem { kind, position };
        }
        Ok(item)
    }

    fn parse_primary_item(&mut self) -> Result<EbnfItem, SpecParseError> {
        let position = self.position();
        let kind = match self.current().clone() {
            Token::NonterminalName(name) => {
                self.next();
                EbnfItemKind::Nonterminal(name)
            }
            Token::Ident(name) => {
                self.next();
                EbnfItemKind::Terminal(name)
            }
            Token::StringLit(raw) => {
                self.next();
                EbnfItemKind::TerminalString(raw)
            }
            Token::CharLit(raw) => {
                self.next();
                EbnfItemKind::TerminalCharacter(raw)
            }
            Token::OpenParen => {
                self.next();
                return self.parse_group(position);
            }
            Token::GuardOpen => {
                self.next();
                let mut items = Vec::new();
                while *self.current() != Token::CloseBracket {
                    if *self.current() == Token::End {
                        return self.error("expected \"]\" to close the guard".to_string());
                    }
                    items.push(self.parse_ebnf_item()?);
                }
                self.next();
                EbnfItemKind::Guard(items)
            }
            other => return self.error(format!("expected a grammar item but found {}", other)),
        };
        Ok(EbnfItem { kind, position })
    }

    /// A parenthesised group; `|` inside it builds an alternative item.
    fn parse_group(&mut self, position: Position) -> Result<EbnfItem, SpecParseError> {
        let mut alternatives: Vec<Vec<EbnfItem>> = vec![Vec::new()];
        loop {
            match self.current() {
                Token::CloseParen => {
                    self.next();
                    break;
                }
                Token::Bar => {
                    self.next();
                    alternatives.push(Vec::new());
                }
                Token::End => return self.error("expected \")\" to close the group".to_string()),
                _ => {
                    let item = self.parse_ebnf_item()?;
                    alternatives.last_mut().expect("non-empty").push(item);
                }
            }
        }

        let mut rendered: Vec<EbnfItem> = alternatives
            .into_iter()
            .map(|items| EbnfItem {
                kind: EbnfItemKind::Parenthesized(items),
                position,
            })
            .collect();
        let mut item = rendered.remove(0);
        for right in rendered {
            item = EbnfItem {
                kind: EbnfItemKind::Alternative(Box::new(item), Box::new(right)),
                position,
            };
        }
        Ok(item)
    }
}

/// Parses the text of a specification file into its AST.
pub fn parse_specification(text: &str) -> Result<DefinitionFile, SpecParseError> {
    let tokens = scan(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_definition_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALCULATOR: &str = r#"
        language calculator:
            lexer-symbols {
                digits = /[0-9]+/
            }
            weak keywords {
                print
            }
            lexer {
                number = /{digits}(\.{digits})?/
                ident = /[a-z]+/
            }
            ignore {
                whitespace = /[ \t\n]+/
            }
            grammar {
                <expr> = <expr> '+' <term> | <term>
                <term> = number | ident | "(" <expr> ")"
            }
        ;
    "#;

    #[test]
    fn calculator_specification_parses() {
        let file = parse_specification(CALCULATOR).unwrap();
        let language = file.language_with_name("calculator").unwrap();
        assert_eq!(language.units.len(), 5);

        match &language.units[0] {
            LanguageUnit::LexerSymbols(block) => {
                assert_eq!(block.definitions.len(), 1);
                assert_eq!(block.definitions[0].identifier, "digits");
                assert_eq!(block.definitions[0].lexeme_type, LexemeType::Regex);
            }
            other => panic!("expected lexer-symbols, got {:?}", other),
        }
        match &language.units[1] {
            LanguageUnit::Keywords(block) => {
                assert!(block.is_weak);
                assert_eq!(block.definitions[0].definition, "\"print\"");
            }
            other => panic!("expected keywords, got {:?}", other),
        }
        match &language.units[4] {
            LanguageUnit::Grammar(block) => {
                assert_eq!(block.nonterminals.len(), 2);
                assert_eq!(block.nonterminals[0].productions.len(), 2);
                assert_eq!(block.nonterminals[1].productions.len(), 3);
            }
            other => panic!("expected grammar, got {:?}", other),
        }
    }

    #[test]
    fn inheritance_lists_parse() {
        let file = parse_specification(
            "language base: ; language derived, base: grammar { <s> = x } ;",
        )
        .unwrap();
        let derived = file.language_with_name("derived").unwrap();
        assert_eq!(derived.inherits, vec!["base".to_string()]);
    }

    #[test]
    fn ebnf_operators_nest() {
        let file = parse_specification(
            "language l: grammar { <a> = \"x\"? (\"y\" | \"z\")* [=> ident ':'] } ;",
        )
        .unwrap();
        let language = file.language_with_name("l").unwrap();
        let grammar = match &language.units[0] {
            LanguageUnit::Grammar(block) => block,
            other => panic!("expected grammar, got {:?}", other),
        };
        let items = &grammar.nonterminals[0].productions[0].items;
        assert!(matches!(items[0].kind, EbnfItemKind::Optional(_)));
        assert!(matches!(items[1].kind, EbnfItemKind::RepeatZero(_)));
        assert!(matches!(items[2].kind, EbnfItemKind::Guard(_)));
        match &items[1].kind {
            EbnfItemKind::RepeatZero(inner) => {
                assert!(matches!(inner.kind, EbnfItemKind::Alternative(_, _)));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn imports_are_recorded() {
        let file = parse_specification("import \"other.spec\"").unwrap();
        match &file.blocks[0] {
            TopLevelBlock::Import(import) => assert_eq!(import.filename, "other.spec"),
            other => panic!("expected an import, got {:?}", other),
        }
    }

    #[test]
    fn errors_carry_positions() {
        let error = parse_specification("language ! :").unwrap_err();
        assert_eq!(error.position.line(), 1);
        let error = parse_specification("language l: lexer { x = }").unwrap_err();
        assert!(error.message.contains("regex"));
    }
}
