//! Random edits of a query used by the rule search

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::compiler::ast::{Field, Operator, Query, Rule, RuleSet, ValueType};
use crate::data::RecordIndex;

const TEXT_OPERATORS: [Operator; 2] = [Operator::Equal, Operator::Contains];
const NUMERIC_OPERATORS: [Operator; 2] = [Operator::Less, Operator::Greater];

/// Distinct non-empty values observed per field in an index, sorted.
/// Fields without any value are left out.
#[derive(Debug, Clone, Default)]
pub struct TargetValues {
    values: BTreeMap<Field, Vec<String>>,
}

impl TargetValues {
    pub fn from_index(index: &RecordIndex) -> Self {
        let mut seen: BTreeMap<Field, BTreeSet<String>> = BTreeMap::new();
        for (_, _, record) in index.iter_series() {
            let tag_fields = record.tags.iter().map(|t| Field::Tag { group: t.group, element: t.element });
            for field in Field::NAMED.iter().cloned().chain(tag_fields) {
                let Some(values) = record.field_values(&field) else { continue };
                for value in values.to_strings() {
                    let value = value.trim();
                    if !value.is_empty() {
                        seen.entry(field.clone()).or_default().insert(value.to_string());
                    }
                }
            }
        }
        let values = seen
            .into_iter()
            .map(|(field, values)| (field, values.into_iter().collect()))
            .collect();
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.values.keys()
    }

    pub fn values(&self, field: &Field) -> &[String] {
        self.values.get(field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// A rule on a random field, with an operator that fits the field's type
    /// and a value seen for that field.
    ///
    /// Numeric operators need a number; when the observed value is not one,
    /// a random integer in `[0, 100)` is used instead.
    pub fn random_rule<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Rule> {
        if self.values.is_empty() {
            return None;
        }
        let (field, values) = self.values.iter().nth(rng.gen_range(0..self.values.len()))?;
        let operators: &[Operator] = match field.value_type() {
            ValueType::Text => &TEXT_OPERATORS,
            ValueType::Numeric => &NUMERIC_OPERATORS,
        };
        let operator = *operators.choose(rng)?;
        let value = values.choose(rng)?;

        match Rule::new(field.clone(), operator, value) {
            Ok(rule) => Some(rule),
            Err(_) if operator.is_numeric() => {
                let substitute = rng.gen_range(0..100).to_string();
                log::debug!("'{}' is not numeric for {}, using {}", value, field, substitute);
                Rule::new(field.clone(), operator, &substitute).ok()
            }
            Err(e) => {
                log::debug!("Skipping generated rule: {}", e);
                None
            }
        }
    }
}

/// Edit applied to a candidate query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    /// Conjoin a random rule to a random rule set
    AddRule,
    /// Replace a random leaf rule with a fresh random rule, keeping the
    /// and/or/not structure around it
    ChangeRule,
    /// Append a rule set holding one random rule
    AddRuleSet,
}

impl Mutation {
    pub const ALL: [Mutation; 3] = [Mutation::AddRule, Mutation::ChangeRule, Mutation::AddRuleSet];

    /// Order in which edits are tried when `self` is picked
    fn attempts(self) -> impl Iterator<Item = Mutation> {
        std::iter::once(self).chain(
            [Mutation::ChangeRule, Mutation::AddRule, Mutation::AddRuleSet]
                .into_iter()
                .filter(move |m| *m != self),
        )
    }

    /// Apply to `query` in place; false when the edit does not apply
    pub fn apply<R: Rng + ?Sized>(self, query: &mut Query, targets: &TargetValues, rng: &mut R) -> bool {
        match self {
            Mutation::AddRule => {
                if query.rulesets.is_empty() {
                    return false;
                }
                let target = rng.gen_range(0..query.rulesets.len());
                match targets.random_rule(rng) {
                    Some(rule) => {
                        query.rulesets[target].push_rule(rule);
                        true
                    }
                    None => false,
                }
            }
            Mutation::ChangeRule => {
                if query.rulesets.is_empty() {
                    return false;
                }
                let target = rng.gen_range(0..query.rulesets.len());
                let mut leaves = query.rulesets[target].rules_mut();
                if leaves.is_empty() {
                    return false;
                }
                let position = rng.gen_range(0..leaves.len());
                match targets.random_rule(rng) {
                    Some(rule) => {
                        *leaves[position] = rule;
                        true
                    }
                    None => false,
                }
            }
            Mutation::AddRuleSet => match targets.random_rule(rng) {
                Some(rule) => {
                    query.rulesets.push(RuleSet::with_rule(rule));
                    true
                }
                None => false,
            },
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mutation::AddRule => "add-rule",
            Mutation::ChangeRule => "change-rule",
            Mutation::AddRuleSet => "add-ruleset",
        };
        f.write_str(name)
    }
}

/// Apply a uniformly chosen edit, falling back to the others when it does
/// not apply. Returns the edit that was made, `None` when nothing applies.
pub fn mutate<R: Rng + ?Sized>(query: &mut Query, targets: &TargetValues, rng: &mut R) -> Option<Mutation> {
    let picked = *Mutation::ALL.choose(rng)?;
    picked.attempts().find(|m| m.apply(query, targets, rng))
}
