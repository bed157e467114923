//! Select language: grammar, AST and parser
//!
//! - `ast`: rules, rule sets, output levels and the compiled `Query`
//! - `pest_parser`: pest grammar binding and AST builder
//! - `parser`: `QueryParser` entry point and `ParseError`
//! - `describe`: natural language summary of a query

pub mod ast;
pub mod describe;
pub mod parser;
pub mod pest_parser;

pub use ast::{
    CheckRule, Condition, Field, Matcher, Operator, OutputLevel, Query, Rule, RuleError, RuleSet, SeriesTag, ValueType,
};
pub use describe::{describe, humanize};
pub use parser::{ParseError, QueryParser};

/// Parse a select statement with the default parser
pub fn parse(text: &str) -> Result<Query, ParseError> {
    QueryParser::new().parse_query(text)
}
