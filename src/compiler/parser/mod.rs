use crate::compiler::ast::{Query, RuleError};
use crate::compiler::pest_parser::{build_query, Rule, SelectParser};
use pest::Parser;
use thiserror::Error;

/// Why a select statement could not be compiled.
///
/// Callers are expected to fall back to a plain text filter on any of these,
/// see [`crate::engine::fallback`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty select statement")]
    Empty,

    #[error("syntax error in select statement:\n{0}")]
    Syntax(Box<pest::error::Error<Rule>>),

    #[error("invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("invalid tag reference '{0}', expected (\"0xGGGG\",\"0xEEEE\")")]
    InvalidTag(String),

    #[error("check refers to '{0}', which names no rule set")]
    UnknownSeries(String),

    #[error("malformed select statement: {0}")]
    Unexpected(String),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        ParseError::Syntax(Box::new(e))
    }
}

/// Parser for select statements
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a select statement into a `Query`.
    /// Block comments (`/* ... */`) are ignored anywhere between tokens.
    pub fn parse_query(&self, query: &str) -> Result<Query, ParseError> {
        if query.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let mut pairs = SelectParser::parse(Rule::query, query)?;
        let first_pair = pairs
            .next()
            .ok_or_else(|| ParseError::Unexpected(format!("empty parse result for '{}'", query)))?;

        let ast = build_query(first_pair)?;
        log::debug!(
            "Parsed select statement: level={:?}, rule sets={}",
            ast.level,
            ast.rulesets.len()
        );
        Ok(ast)
    }
}
