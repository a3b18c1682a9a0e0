// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::io;
use std::io::Write;

use lr::LalrBuilder;

use crate::language_stage::LanguageData;

/// Writes the human-readable account of a compiled language: the terminals,
/// the rules (including the synthesized ones) and every parser state.
pub fn write_description<W: Write>(
    writer: &mut W,
    data: &LanguageData,
    builder: &LalrBuilder,
) -> io::Result<()> {
    writer.write_all(b"Terminals:\n")?;
    for (name, symbol) in data.terminals.names() {
        let mut line = format!("  {}: {}", symbol, name);
        if data.weak_symbols.contains(&symbol) {
            line += " (weak)";
        }
        if data.ignored_symbols.contains(&symbol) {
            line += " (ignored)";
        }
        writeln!(writer, "{}", line)?;
    }
    for (name, symbol) in data.terminals.names() {
        for child in data.terminals.children_of(symbol) {
            writeln!(writer, "  {}: {} (split)", child, name)?;
        }
    }

    writer.write_all(b"\nProductions:\n")?;
    for rule in data.grammar.rules() {
        writeln!(
            writer,
            "  {}: {}",
            rule.ident(),
            data.grammar.rule_to_string(rule.ident(), &data.terminals)
        )?;
    }

    for state in 0..builder.count_states() {
        writer.write_all(
            builder
                .state_description(state, &data.grammar, &data.terminals)
                .as_bytes(),
        )?;
    }
    Ok(())
}
