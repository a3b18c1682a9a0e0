// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use contextfree::Item;
use dfa::Position;
use lr::{LalrBuilder, ParserTables, WeakSymbols};

use crate::console::{Console, Severity};
use crate::language_stage::LanguageData;

pub struct ParserStageOutput {
    pub tables: ParserTables,
    pub builder: LalrBuilder,
}

/// Builds the LALR(1) machine from the compiled grammar, runs the action
/// rewriters and emits the packed tables. Conflicts surviving the rewriters
/// make the language definition ambiguous and stop the pipeline.
pub struct ParserStage;

impl ParserStage {
    pub fn compile(
        console: &mut Console,
        filename: &str,
        data: &mut LanguageData,
        weak_symbols: &WeakSymbols,
    ) -> Option<ParserStageOutput> {
        let start_nonterminal = match data.start_nonterminal {
            Some(start) => start,
            None => {
                console.report(
                    Severity::Error,
                    filename,
                    "UNDEFINED_NONTERMINAL",
                    "The language defines no grammar to parse",
                    Position::default(),
                );
                return None;
            }
        };

        // Weak terminals (including any splits made by the lexer stage) need
        // item identifiers before their actions can be keyed
        for (weak, strong) in weak_symbols.weak_to_strong_pairs() {
            data.grammar.identifier_for_item(Item::Terminal(weak));
            data.grammar.identifier_for_item(Item::Terminal(strong));
        }

        console.verbose("  = Constructing LALR parser");
        let mut builder = LalrBuilder::build(&mut data.grammar, start_nonterminal);
        console.verbose(&format!(
            "    Number of LALR states:                  {}",
            builder.count_states()
        ));

        for state in builder.states() {
            state.with_actions(|actions| weak_symbols.rewrite_actions(actions, &data.grammar));
        }

        let conflict_count = builder.detect_conflicts(&data.grammar);
        if conflict_count > 0 {
            let reports: Vec<String> = builder
                .conflicts()
                .iter()
                .map(|conflict| {
                    let mut message = format!(
                        "Ambiguity on '{}' in state {}: {} possible actions",
                        data.grammar.item_to_string(conflict.symbol, &data.terminals),
                        conflict.state,
                        conflict.actions.len(),
                    );
                    for item in conflict.reducible_items.iter() {
                        message += &format!(
                            "; reduction of {}",
                            data.grammar.rule_to_string(item.rule(), &data.terminals)
                        );
                    }
                    message
                })
                .collect();
            for message in reports {
                console.report(
                    Severity::Error,
                    filename,
                    "AMBIGUOUS_LANGUAGE_DEFINITION",
                    &message,
                    Position::default(),
                );
            }
            return None;
        }

        let tables = ParserTables::new(&builder, &data.grammar, Some(weak_symbols), &data.ignored_symbols);
        Some(ParserStageOutput { tables, builder })
    }
}
