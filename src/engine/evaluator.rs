//! Rule evaluation against a single series record

use crate::compiler::ast::{Condition, Matcher, Operator, Query, Rule, RuleSet};
use crate::data::{FieldValues, SeriesRecord};

/// Decide whether one rule holds for a record.
///
/// Never fails: empty values compare as the empty string (or 0 for numeric
/// operators), fields the record cannot provide never match. Multi-valued
/// fields match when any of their values satisfies the rule.
pub fn evaluate(rule: &Rule, record: &SeriesRecord) -> bool {
    let values = match record.field_values(rule.field()) {
        Some(values) => values,
        None => return false,
    };
    if let (FieldValues::Number(n), Matcher::Number(limit)) = (values, rule.matcher()) {
        return compare_numbers(rule.operator(), n as f64, *limit);
    }
    values.any(|value| compare(rule.operator(), rule.matcher(), value))
}

fn compare(operator: Operator, matcher: &Matcher, value: &str) -> bool {
    match (operator, matcher) {
        (Operator::Equal, Matcher::Text(expected)) => value == expected,
        (Operator::Contains, Matcher::Text(needle)) => value.contains(needle.as_str()),
        (Operator::Regexp, Matcher::Regex { regex, .. }) => regex.is_match(value),
        (op, Matcher::Number(limit)) => compare_numbers(op, to_number(value), *limit),
        _ => false,
    }
}

fn compare_numbers(operator: Operator, number: f64, limit: f64) -> bool {
    match operator {
        Operator::Less => number < limit,
        Operator::Greater => number > limit,
        Operator::LessEqual => number <= limit,
        Operator::GreaterEqual => number >= limit,
        _ => false,
    }
}

/// Numeric form of a field value; anything unparsable counts as 0
fn to_number(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0)
}

/// Evaluate a boolean combination of rules
pub fn holds(condition: &Condition, record: &SeriesRecord) -> bool {
    match condition {
        Condition::Rule(rule) => evaluate(rule, record),
        Condition::Not(inner) => !holds(inner, record),
        Condition::All(terms) => terms.iter().all(|term| holds(term, record)),
        Condition::Any(terms) => terms.iter().any(|term| holds(term, record)),
    }
}

/// A rule set holds when its condition holds.
/// A rule set without any rule selects nothing.
pub fn ruleset_matches(ruleset: &RuleSet, record: &SeriesRecord) -> bool {
    !ruleset.is_empty() && holds(&ruleset.condition, record)
}

/// Position of the first rule set (in query order) that holds for the record
pub fn first_match(query: &Query, record: &SeriesRecord) -> Option<usize> {
    query
        .rulesets
        .iter()
        .position(|ruleset| ruleset_matches(ruleset, record))
}
