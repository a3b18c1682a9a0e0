// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::BTreeMap;
use std::fmt;
use std::io::{stderr, Write};

use dfa::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Detail,
    Warning,
    Error,
    Bug,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Detail => write!(f, "detail"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Bug => write!(f, "bug"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// One reported problem: a severity, the source file, a stable identifier
/// that tools can match on, a human-readable message and a position.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub filename: String,
    pub identifier: String,
    pub message: String,
    pub position: Position,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} ({}): {}",
            self.filename, self.position, self.severity, self.identifier, self.message
        )
    }
}

/// Collects diagnostics and options for one run of the generator.
///
/// Stages keep going after reporting errors so a single run surfaces
/// everything; callers check `error_count` before moving to the next stage.
#[derive(Debug, Default)]
pub struct Console {
    verbose: bool,
    options: BTreeMap<String, String>,
    diagnostics: Vec<Diagnostic>,
    error_count: u32,
    warning_count: u32,
}

impl Console {
    pub fn new() -> Self {
        Console::default()
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_option(&mut self, name: &str, value: &str) {
        self.options.insert(name.to_string(), value.to_string());
    }

    pub fn get_option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(|value| value.as_str())
    }

    pub fn report(
        &mut self,
        severity: Severity,
        filename: &str,
        identifier: &str,
        message: &str,
        position: Position,
    ) {
        let diagnostic = Diagnostic {
            severity,
            filename: filename.to_string(),
            identifier: identifier.to_string(),
            message: message.to_string(),
            position,
        };
        match severity {
            Severity::Error | Severity::Bug | Severity::Fatal => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Detail => (),
        }
        writeln!(stderr(), "{}", diagnostic).expect("what?");
        self.diagnostics.push(diagnostic);
    }

    pub fn verbose(&self, message: &str) {
        if self.verbose {
            writeln!(stderr(), "{}", message).expect("what?");
        }
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_identifier(&self, identifier: &str) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.identifier == identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_are_counted() {
        let mut console = Console::new();
        console.report(
            Severity::Warning,
            "test",
            "UNUSED_TERMINAL_SYMBOL",
            "unused",
            Position::default(),
        );
        console.report(
            Severity::Error,
            "test",
            "UNDEFINED_NONTERMINAL",
            "undefined",
            Position::default(),
        );
        console.report(
            Severity::Bug,
            "test",
            "BUG_DFA_FAILED_TO_COMPILE",
            "bug",
            Position::default(),
        );
        assert_eq!(console.error_count(), 2);
        assert_eq!(console.warning_count(), 1);
        assert!(console.has_identifier("UNDEFINED_NONTERMINAL"));
        assert!(!console.has_identifier("EMPTY_GUARD"));
    }

    #[test]
    fn options_are_plain_strings() {
        let mut console = Console::new();
        assert_eq!(console.get_option("allow-empty-guards"), None);
        console.set_option("allow-empty-guards", "yes");
        assert_eq!(console.get_option("allow-empty-guards"), Some("yes"));
    }
}
