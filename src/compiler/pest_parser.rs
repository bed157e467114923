use pest::iterators::Pair;
use pest_derive::Parser;
use crate::compiler::ast::{
    CheckRule, Condition, Field, Operator, OutputLevel, Query, Rule as QueryRule, RuleSet, SeriesTag,
    DEFAULT_RULESET_NAME,
};
use crate::compiler::parser::ParseError;

#[derive(Parser)]
#[grammar = "select.pest"]
pub struct SelectParser;

/// Build a `Query` from the top-level `query` pair
pub fn build_query(pair: Pair<Rule>) -> Result<Query, ParseError> {
    let mut level = None;
    let mut rulesets = Vec::new();
    let mut checks = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::level => {
                level = OutputLevel::from_keyword(inner.as_str());
            }
            Rule::where_clauses => {
                for clause in inner.into_inner() {
                    if clause.as_rule() == Rule::where_clause {
                        rulesets.push(build_ruleset(clause)?);
                    }
                }
            }
            Rule::check_clause => {
                for check in inner.into_inner() {
                    if check.as_rule() == Rule::check_rule {
                        checks.push(build_check(check)?);
                    }
                }
            }
            // keywords, the group keyword after `from` and EOI carry no meaning
            _ => {}
        }
    }
    let level = level.ok_or_else(|| ParseError::Unexpected("missing output level".to_string()))?;
    let query = Query::new(level, rulesets).with_checks(checks);
    for check in &query.checks {
        for side in [&check.left, &check.right] {
            if !query.rulesets.iter().any(|rs| rs.name == side.series) {
                return Err(ParseError::UnknownSeries(side.series.clone()));
            }
        }
    }
    Ok(query)
}

fn build_ruleset(pair: Pair<Rule>) -> Result<RuleSet, ParseError> {
    let mut name = DEFAULT_RULESET_NAME.to_string();
    let mut condition = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::series_header => {
                if let Some(named) = inner.into_inner().find(|p| p.as_rule() == Rule::ruleset_name) {
                    let string = named
                        .into_inner()
                        .find(|p| p.as_rule() == Rule::string)
                        .ok_or_else(|| ParseError::Unexpected("named without a name".to_string()))?;
                    name = string_content(string);
                }
            }
            Rule::disjunction => condition = Some(build_condition(inner)?),
            _ => {}
        }
    }
    match condition {
        Some(condition) => Ok(RuleSet::with_condition(name, condition)),
        None => Err(ParseError::Unexpected(format!("rule set '{}' has no rules", name))),
    }
}

/// Build a condition from a `disjunction`, `conjunction`, `negation`,
/// `group` or `predicate` pair
fn build_condition(pair: Pair<Rule>) -> Result<Condition, ParseError> {
    match pair.as_rule() {
        Rule::predicate => Ok(Condition::Rule(build_rule(pair)?)),
        Rule::disjunction => Ok(Condition::any(build_terms(pair)?)),
        Rule::conjunction => Ok(Condition::all(build_terms(pair)?)),
        Rule::negation => {
            let mut negated = false;
            let mut term = None;
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::kw_not => negated = true,
                    _ => term = Some(build_condition(inner)?),
                }
            }
            let term = term.ok_or_else(|| ParseError::Unexpected("empty negation".to_string()))?;
            Ok(if negated { Condition::negate(term) } else { term })
        }
        Rule::group => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| ParseError::Unexpected("empty group".to_string()))?;
            build_condition(inner)
        }
        other => Err(ParseError::Unexpected(format!("unexpected condition rule {:?}", other))),
    }
}

/// Child conditions, skipping the `and`/`or` keywords between them
fn build_terms(pair: Pair<Rule>) -> Result<Vec<Condition>, ParseError> {
    pair.into_inner()
        .filter(|p| !matches!(p.as_rule(), Rule::kw_and | Rule::kw_or))
        .map(build_condition)
        .collect()
}

fn build_rule(pair: Pair<Rule>) -> Result<QueryRule, ParseError> {
    let text = pair.as_str().to_string();
    let mut inner = pair.into_inner();
    let (field_pair, op_pair, value_pair) = match (inner.next(), inner.next(), inner.next()) {
        (Some(f), Some(o), Some(v)) => (f, o, v),
        _ => return Err(ParseError::Unexpected(format!("incomplete predicate '{}'", text))),
    };
    let field = build_field(field_pair)?;
    let operator = Operator::from_token(op_pair.as_str())
        .ok_or_else(|| ParseError::Unexpected(format!("unknown operator '{}'", op_pair.as_str())))?;
    let value = build_value(value_pair)?;
    if field.is_unknown() {
        log::debug!("Rule '{}' uses an unrecognised field and will never match", text);
    }
    Ok(QueryRule::new(field, operator, &value)?)
}

fn build_check(pair: Pair<Rule>) -> Result<CheckRule, ParseError> {
    let text = pair.as_str().to_string();
    let mut tags = pair.into_inner().filter(|p| p.as_rule() == Rule::series_tag);
    match (tags.next(), tags.next()) {
        (Some(left), Some(right)) => Ok(CheckRule::new(build_series_tag(left)?, build_series_tag(right)?)),
        _ => Err(ParseError::Unexpected(format!("incomplete check '{}'", text))),
    }
}

fn build_series_tag(pair: Pair<Rule>) -> Result<SeriesTag, ParseError> {
    let mut series = None;
    let mut tag = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::series_ref => {
                series = inner.into_inner().next().map(|p| match p.as_rule() {
                    Rule::string => string_content(p),
                    _ => p.as_str().to_string(),
                });
            }
            Rule::tag_field => tag = Some(build_tag(inner)?),
            _ => {}
        }
    }
    match (series, tag) {
        (Some(series), Some((group, element))) => Ok(SeriesTag::new(series, group, element)),
        _ => Err(ParseError::Unexpected("incomplete series tag".to_string())),
    }
}

fn build_field(pair: Pair<Rule>) -> Result<Field, ParseError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::Unexpected("empty field".to_string()))?;
    match inner.as_rule() {
        Rule::identifier => Ok(Field::from_name(inner.as_str())),
        Rule::tag_field => {
            let (group, element) = build_tag(inner)?;
            Ok(Field::Tag { group, element })
        }
        other => Err(ParseError::Unexpected(format!("unexpected field rule {:?}", other))),
    }
}

fn build_tag(pair: Pair<Rule>) -> Result<(u16, u16), ParseError> {
    let parts: Vec<String> = pair
        .into_inner()
        .map(|part| match part.into_inner().next() {
            Some(p) if p.as_rule() == Rule::string => string_content(p),
            Some(p) => p.as_str().to_string(),
            None => String::new(),
        })
        .collect();
    match parts.as_slice() {
        [group, element] => Ok((parse_hex(group)?, parse_hex(element)?)),
        _ => Err(ParseError::InvalidTag(parts.join(","))),
    }
}

fn build_value(pair: Pair<Rule>) -> Result<String, ParseError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::Unexpected("empty value".to_string()))?;
    match inner.as_rule() {
        Rule::string => Ok(string_content(inner)),
        Rule::number | Rule::bare => Ok(inner.as_str().to_string()),
        other => Err(ParseError::Unexpected(format!("unexpected value rule {:?}", other))),
    }
}

/// Text between the quotes of a `string` pair, with escapes resolved
fn string_content(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|p| unescape(p.as_str()))
        .unwrap_or_default()
}

/// Resolve `\\`, `\"` and `\'`. Any other backslash is kept, so regular
/// expressions like `\d+` need no doubling.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | '"' | '\'')) => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_hex(s: &str) -> Result<u16, ParseError> {
    let digits = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidTag(s.to_string()))
}
