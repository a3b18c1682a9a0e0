// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

pub mod ast;
pub mod console;
pub mod dequote;
pub mod description;
pub mod language_stage;
pub mod lexer_stage;
pub mod parser_stage;
pub mod spec_parser;

pub use console::{Console, Diagnostic, Severity};
pub use language_stage::{LanguageData, LanguageStage};
pub use lexer_stage::{LexerStage, LexerStageOutput};
pub use parser_stage::{ParserStage, ParserStageOutput};
