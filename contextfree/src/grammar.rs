// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::collections::{BTreeMap, BTreeSet};

use crate::item::Item;
use crate::rule::Rule;
use crate::terminal::TerminalDictionary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum WrapperKind {
    Optional,
    RepeatZero,
    RepeatOne,
    Alternate,
    Guard,
}

/// The FIRST set of an item or sentential form: the terminals that can begin
/// it, and whether it can derive the empty string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FirstsData {
    pub tokens: BTreeSet<usize>,
    pub transparent: bool,
}

/// Per-item FIRST sets computed by fixed-point iteration over all rules.
#[derive(Debug)]
pub struct FirstsTable {
    per_item: Vec<FirstsData>,
}

impl FirstsTable {
    pub fn first_of_item(&self, item: usize) -> &FirstsData {
        &self.per_item[item]
    }

    pub fn first_of_sequence(&self, items: &[usize]) -> FirstsData {
        let mut firsts = FirstsData::default();
        for &item in items {
            let item_firsts = &self.per_item[item];
            firsts.tokens.extend(item_firsts.tokens.iter());
            if !item_firsts.transparent {
                return firsts;
            }
        }
        firsts.transparent = true;
        firsts
    }
}

/// The set of rules, keyed by the nonterminal-like item they reduce to,
/// together with the item-interning table that assigns every item a
/// grammar-unique identifier.
///
/// EBNF wrappers and guards are interned by their recursive structure, so a
/// repeated `A?` in different rules is one item with one set of synthesized
/// productions.
#[derive(Debug, Default)]
pub struct Grammar {
    items: Vec<Item>,
    ids_for_item: BTreeMap<Item, usize>,
    rules: Vec<Rule>,
    rules_for_item: BTreeMap<usize, Vec<usize>>,
    nonterminal_ids: BTreeMap<String, usize>,
    nonterminal_names: BTreeMap<usize, String>,
    next_nonterminal: usize,
    next_anonymous: usize,
    wrapper_ids: BTreeMap<(WrapperKind, Vec<Vec<usize>>), usize>,
}

impl Grammar {
    pub fn new() -> Self {
        Grammar::default()
    }

    pub fn count_items(&self) -> usize {
        self.items.len()
    }

    pub fn count_rules(&self) -> usize {
        self.rules.len()
    }

    pub fn item(&self, item_id: usize) -> Item {
        self.items[item_id]
    }

    pub fn items(&self) -> impl Iterator<Item = (usize, Item)> + '_ {
        self.items.iter().copied().enumerate()
    }

    pub fn rule(&self, rule_id: usize) -> &Rule {
        &self.rules[rule_id]
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn rules_for_item(&self, item_id: usize) -> &[usize] {
        self.rules_for_item
            .get(&item_id)
            .map(|rules| rules.as_slice())
            .unwrap_or(&[])
    }

    /// Interns a leaf item (terminals, markers, existing nonterminals).
    pub fn identifier_for_item(&mut self, item: Item) -> usize {
        if let Some(&item_id) = self.ids_for_item.get(&item) {
            return item_id;
        }
        let item_id = self.items.len();
        self.items.push(item);
        self.ids_for_item.insert(item, item_id);
        item_id
    }

    pub fn find_identifier_for_item(&self, item: Item) -> Option<usize> {
        self.ids_for_item.get(&item).copied()
    }

    pub fn empty_id(&mut self) -> usize {
        self.identifier_for_item(Item::Empty)
    }

    pub fn end_of_input_id(&mut self) -> usize {
        self.identifier_for_item(Item::EndOfInput)
    }

    /// The nonterminal item for a name, interning a new one as needed.
    pub fn id_for_nonterminal(&mut self, name: &str) -> usize {
        if let Some(&item_id) = self.nonterminal_ids.get(name) {
            return item_id;
        }
        let ordinal = self.next_nonterminal;
        self.next_nonterminal += 1;
        let item_id = self.identifier_for_item(Item::Nonterminal(ordinal));
        self.nonterminal_ids.insert(name.to_string(), item_id);
        self.nonterminal_names.insert(item_id, name.to_string());
        item_id
    }

    pub fn find_nonterminal(&self, name: &str) -> Option<usize> {
        self.nonterminal_ids.get(name).copied()
    }

    pub fn name_for_nonterminal(&self, item_id: usize) -> Option<&str> {
        self.nonterminal_names.get(&item_id).map(|name| name.as_str())
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (&str, usize)> {
        self.nonterminal_ids
            .iter()
            .map(|(name, &item_id)| (name.as_str(), item_id))
    }

    /// Adds a rule reducing to the given nonterminal-like item; the returned
    /// identity is the rule's index in the arena.
    pub fn add_rule(&mut self, nonterminal: usize, items: Vec<usize>) -> usize {
        let rule_id = self.rules.len();
        self.rules.push(Rule::new(rule_id, nonterminal, items));
        self.rules_for_item.entry(nonterminal).or_default().push(rule_id);
        rule_id
    }

    /// Drops the rules of a nonterminal; its item identifier is untouched.
    /// The abandoned rules stay in the arena so rule identities are stable.
    pub fn clear_rules_for(&mut self, nonterminal: usize) {
        self.rules_for_item.remove(&nonterminal);
    }

    fn intern_wrapper(
        &mut self,
        kind: WrapperKind,
        bodies: Vec<Vec<usize>>,
        make_item: impl Fn(usize) -> Item,
    ) -> usize {
        let key = (kind, bodies.clone());
        if let Some(&item_id) = self.wrapper_ids.get(&key) {
            return item_id;
        }
        let ordinal = self.next_anonymous;
        self.next_anonymous += 1;
        let item_id = self.identifier_for_item(make_item(ordinal));
        self.wrapper_ids.insert(key, item_id);

        match kind {
            WrapperKind::Optional => {
                self.add_rule(item_id, Vec::new());
                self.add_rule(item_id, bodies.into_iter().next().unwrap());
            }
            WrapperKind::RepeatZero => {
                let content = bodies.into_iter().next().unwrap();
                self.add_rule(item_id, Vec::new());
                let mut repeating = vec![item_id];
                repeating.extend(content);
                self.add_rule(item_id, repeating);
            }
            WrapperKind::RepeatOne => {
                let content = bodies.into_iter().next().unwrap();
                self.add_rule(item_id, content.clone());
                let mut repeating = vec![item_id];
                repeating.extend(content);
                self.add_rule(item_id, repeating);
            }
            WrapperKind::Alternate => {
                for body in bodies {
                    self.add_rule(item_id, body);
                }
            }
            WrapperKind::Guard => {
                self.add_rule(item_id, bodies.into_iter().next().unwrap());
            }
        }
        item_id
    }

    /// `content?`: matches the content or nothing.
    pub fn intern_optional(&mut self, content: Vec<usize>) -> usize {
        self.intern_wrapper(WrapperKind::Optional, vec![content], Item::Optional)
    }

    /// `content*`: matches any number of repetitions, including none.
    pub fn intern_repeat_zero(&mut self, content: Vec<usize>) -> usize {
        self.intern_wrapper(WrapperKind::RepeatZero, vec![content], Item::RepeatZero)
    }

    /// `content+`: matches one or more repetitions.
    pub fn intern_repeat_one(&mut self, content: Vec<usize>) -> usize {
        self.intern_wrapper(WrapperKind::RepeatOne, vec![content], Item::RepeatOne)
    }

    /// `left|right`: matches either alternative.
    pub fn intern_alternate(&mut self, left: Vec<usize>, right: Vec<usize>) -> usize {
        self.intern_wrapper(WrapperKind::Alternate, vec![left, right], Item::Alternate)
    }

    /// `[=> content]`: a lookahead predicate with a single rule.
    pub fn intern_guard(&mut self, content: Vec<usize>) -> usize {
        self.intern_wrapper(WrapperKind::Guard, vec![content], Item::Guard)
    }

    pub fn guards(&self) -> Vec<usize> {
        self.items()
            .filter(|(_, item)| item.is_guard())
            .map(|(item_id, _)| item_id)
            .collect()
    }

    /// The end-of-guard marker paired with a guard item.
    pub fn end_of_guard_for(&mut self, guard_item: usize) -> usize {
        match self.item(guard_item) {
            Item::Guard(ordinal) => self.identifier_for_item(Item::EndOfGuard(ordinal)),
            _ => panic!("end_of_guard_for called on a non-guard item"),
        }
    }

    /// Computes the FIRST set of every item by fixed-point iteration.
    pub fn compute_firsts(&self) -> FirstsTable {
        let mut per_item: Vec<FirstsData> = Vec::with_capacity(self.items.len());
        for item in self.items.iter() {
            let mut firsts = FirstsData::default();
            match item {
                Item::Terminal(symbol) => {
                    firsts.tokens.insert(*symbol);
                }
                Item::Empty => firsts.transparent = true,
                _ => (),
            }
            per_item.push(firsts);
        }

        let mut additions_made = true;
        while additions_made {
            additions_made = false;
            for rule in self.rules.iter() {
                // Skip rules abandoned by a replacing definition
                if !self.rules_for_item(rule.nonterminal()).contains(&rule.ident()) {
                    continue;
                }
                let mut sequence = FirstsData::default();
                sequence.transparent = true;
                for &item in rule.items() {
                    sequence.tokens.extend(per_item[item].tokens.iter());
                    if !per_item[item].transparent {
                        sequence.transparent = false;
                        break;
                    }
                }
                let lhs = &mut per_item[rule.nonterminal()];
                let before = (lhs.tokens.len(), lhs.transparent);
                lhs.tokens.extend(sequence.tokens.iter());
                lhs.transparent |= sequence.transparent;
                if before != (lhs.tokens.len(), lhs.transparent) {
                    additions_made = true;
                }
            }
        }

        FirstsTable { per_item }
    }

    /// A readable rendering of an item, for descriptions and diagnostics.
    pub fn item_to_string(&self, item_id: usize, terminals: &TerminalDictionary) -> String {
        match self.item(item_id) {
            Item::Terminal(symbol) => match terminals.name_for_symbol(symbol) {
                Some(name) => name.to_string(),
                None => format!("t{}", symbol),
            },
            Item::Nonterminal(_) => match self.name_for_nonterminal(item_id) {
                Some(name) => name.to_string(),
                None => format!("<item{}>", item_id),
            },
            Item::Optional(_) => self.wrapper_to_string(item_id, "?", terminals),
            Item::RepeatZero(_) => self.wrapper_to_string(item_id, "*", terminals),
            Item::RepeatOne(_) => self.wrapper_to_string(item_id, "+", terminals),
            Item::Alternate(_) => {
                let mut rendered = Vec::new();
                for &rule_id in self.rules_for_item(item_id) {
                    rendered.push(self.sequence_to_string(self.rule(rule_id).items(), terminals));
                }
                format!("({})", rendered.join(" | "))
            }
            Item::Guard(_) => {
                let rule_id = self.rules_for_item(item_id)[0];
                format!(
                    "[=> {}]",
                    self.sequence_to_string(self.rule(rule_id).items(), terminals)
                )
            }
            other => other.to_string(),
        }
    }

    fn wrapper_to_string(
        &self,
        item_id: usize,
        operator: &str,
        terminals: &TerminalDictionary,
    ) -> String {
        // Prefer the plain content rule; a `*` wrapper only has the empty
        // rule and the self-recursive one, so strip the recursion instead
        let rules = self.rules_for_item(item_id);
        for &rule_id in rules {
            let rule = self.rule(rule_id);
            if !rule.is_empty() && rule.items()[0] != item_id {
                return format!(
                    "({}){}",
                    self.sequence_to_string(rule.items(), terminals),
                    operator
                );
            }
        }
        for &rule_id in rules {
            let rule = self.rule(rule_id);
            if !rule.is_empty() && rule.items()[0] == item_id {
                return format!(
                    "({}){}",
                    self.sequence_to_string(&rule.items()[1..], terminals),
                    operator
                );
            }
        }
        format!("<item{}>{}", item_id, operator)
    }

    pub fn sequence_to_string(&self, items: &[usize], terminals: &TerminalDictionary) -> String {
        let rendered: Vec<String> = items
            .iter()
            .map(|&item| self.item_to_string(item, terminals))
            .collect();
        rendered.join(" ")
    }

    pub fn rule_to_string(&self, rule_id: usize, terminals: &TerminalDictionary) -> String {
        let rule = self.rule(rule_id);
        let rhs = if rule.is_empty() {
            "<empty>".to_string()
        } else {
            self.sequence_to_string(rule.items(), terminals)
        };
        format!("{}: {}", self.item_to_string(rule.nonterminal(), terminals), rhs)
    }
}
