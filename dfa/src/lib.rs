// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

pub mod error;
pub mod lexer;
pub mod ndfa;
pub mod position;
pub mod range;
pub mod regex;
pub mod remapped_symbol_map;
pub mod symbol_map;
pub mod symbol_set;
mod transformations;
pub mod unicode;

pub use error::RegexError;
pub use lexer::{Lexeme, LexemeStream, Lexer, LexicalError};
pub use ndfa::{AcceptAction, Ndfa, NdfaBuilder};
pub use position::Position;
pub use range::SymbolRange;
pub use regex::{symbol_string, NdfaRegex, SymbolString};
pub use remapped_symbol_map::RemappedSymbolMap;
pub use symbol_map::SymbolMap;
pub use symbol_set::SymbolSet;

/// Code points at and above this value are outside the symbol model.
pub const MAX_SYMBOL: i32 = 0x7fff_ffff;
