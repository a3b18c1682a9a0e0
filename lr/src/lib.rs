// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

pub mod action;
pub mod lalr_builder;
pub mod lr_item;
pub mod parser;
pub mod parser_tables;
pub mod weak_symbols;

pub use action::{Action, ActionSet};
pub use lalr_builder::{Conflict, LalrBuilder, LalrState};
pub use lr_item::{LookaheadSet, LrItem};
pub use parser::{ParseActions, ParseError, ParseSession};
pub use parser_tables::{ParserTables, ReduceRule};
pub use weak_symbols::WeakSymbols;
