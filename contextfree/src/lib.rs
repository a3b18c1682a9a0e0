// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

pub mod grammar;
pub mod item;
pub mod rule;
pub mod terminal;

pub use grammar::{FirstsData, Grammar};
pub use item::Item;
pub use rule::Rule;
pub use terminal::TerminalDictionary;
