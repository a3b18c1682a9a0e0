// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexError {
    MismatchedParenthesis,
    UnterminatedGroup,
    UnterminatedCharacterClass,
    UnterminatedExpression,
    UnknownExpression(String),
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegexError::MismatchedParenthesis => {
                write!(f, "\")\" without a matching \"(\"")
            }
            RegexError::UnterminatedGroup => write!(f, "\"(\" without a matching \")\""),
            RegexError::UnterminatedCharacterClass => {
                write!(f, "\"[\" without a matching \"]\"")
            }
            RegexError::UnterminatedExpression => write!(f, "\"{{\" without a matching \"}}\""),
            RegexError::UnknownExpression(name) => {
                write!(f, "\"{{{}}}\" does not name a known expression", name)
            }
        }
    }
}
