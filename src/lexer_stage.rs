// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use dfa::ndfa::AcceptAction;
use dfa::{Lexer, Ndfa, NdfaRegex, Position};
use lr::WeakSymbols;

use crate::console::{Console, Severity};
use crate::language_stage::{BlockType, LanguageData, LexerPattern};

/// Narrows each ambiguous accepting state to a single symbol.
///
/// Priority is by declaration class first (keywords beat lexer symbols beat
/// ignored ones) and terminal identifier second. Classifying by block type
/// rather than raw identifier lets terminals interned implicitly from the
/// grammar, which get the highest identifiers, still win over the identifier
/// pattern they overlap. A split terminal ranks with its parent.
fn resolve_accept_priorities(dfa: &mut Ndfa, data: &LanguageData) {
    let rank = |symbol: usize| -> (u8, usize) {
        let base = data.terminals.parent_of(symbol).unwrap_or(symbol);
        let class = match data.block_type_for_symbol.get(&base) {
            Some(BlockType::Keywords) => 0,
            Some(BlockType::Lexer) => 1,
            Some(BlockType::Ignore) => 2,
            None => 3,
        };
        (class, symbol)
    };

    for state in 0..dfa.count_states() {
        let actions = dfa.actions_for_state(state);
        if actions.len() < 2 {
            continue;
        }
        let winner = *actions
            .iter()
            .min_by_key(|action| rank(action.symbol))
            .expect("at least two actions");
        dfa.clear_accept(state);
        dfa.accept(state, winner);
    }
}

pub struct LexerStageOutput {
    pub lexer: Lexer,
    pub weak_symbols: WeakSymbols,
}

/// Builds the runtime lexer from a compiled language: assemble the NDFA from
/// the collected patterns, deduplicate its symbol sets, determinize,
/// determine the weak/strong terminal relation (splitting terminals whose
/// weak meaning differs between contexts), then minimize and merge symbol
/// sets.
pub struct LexerStage;

impl LexerStage {
    pub fn compile(
        console: &mut Console,
        filename: &str,
        data: &mut LanguageData,
    ) -> Option<LexerStageOutput> {
        if data.lexer_definitions.is_empty() {
            console.report(
                Severity::Bug,
                filename,
                "BUG_LEXER_BAD_PARAMETERS",
                "Missing input for the lexer stage",
                Position::default(),
            );
            return None;
        }

        console.verbose("  = Constructing final lexer");

        let mut source = NdfaRegex::new();
        for (name, expression) in data.expressions.iter() {
            if expression.is_literal {
                source.define_expression_literal(name, &expression.value);
            } else {
                source.define_expression(name, &expression.value);
            }
        }

        for definition in data.lexer_definitions.iter() {
            source.set_case_insensitive(definition.case_insensitive);
            let final_state = match &definition.pattern {
                LexerPattern::Regex(regex) => match source.add_regex(0, regex) {
                    Ok(final_state) => final_state,
                    Err(error) => {
                        console.report(
                            Severity::Error,
                            filename,
                            "MALFORMED_REGEX",
                            &format!("Malformed regular expression: {}", error),
                            definition.position,
                        );
                        continue;
                    }
                },
                LexerPattern::Literal(text) => source.add_literal(0, text),
            };
            source
                .ndfa_mut()
                .accept(final_state, AcceptAction::new(definition.symbol));
        }

        let ndfa = source.into_ndfa();
        console.verbose(&format!(
            "    Initial number of character sets:       {}",
            ndfa.symbols().count_sets()
        ));
        let stage1 = ndfa.to_ndfa_with_unique_symbols();
        console.verbose(&format!(
            "    Final number of character sets:         {}",
            stage1.symbols().count_sets()
        ));

        let mut stage2 = stage1.to_dfa(&[0]);
        if !stage2.verify_is_dfa() || !stage2.verify_no_symbol_overlap() {
            console.report(
                Severity::Bug,
                filename,
                "BUG_DFA_FAILED_TO_COMPILE",
                "Failed to compile DFA",
                Position::default(),
            );
            return None;
        }

        let mut weak_symbols = WeakSymbols::new();
        if !data.weak_symbols.is_empty() {
            let initial_count = data.terminals.count_symbols();
            weak_symbols.add_symbols(&mut stage2, &data.weak_symbols, &mut data.terminals);
            console.verbose(&format!(
                "    Number of extra weak symbols:           {}",
                data.terminals.count_symbols() - initial_count
            ));
        }

        resolve_accept_priorities(&mut stage2, data);

        console.verbose(&format!(
            "    Number of states in the lexer DFA:      {}",
            stage2.count_states()
        ));
        let dfa = stage2.to_compact_dfa(&[0]).to_ndfa_with_merged_symbols();
        console.verbose(&format!(
            "    Number of states in the compacted DFA:  {}",
            dfa.count_states()
        ));

        let lexer = Lexer::new(&dfa);
        console.verbose(&format!(
            "    Approximate size of final lexer:        {} kilobytes",
            (lexer.size() + 512) / 1024
        ));

        Some(LexerStageOutput {
            lexer,
            weak_symbols,
        })
    }
}
