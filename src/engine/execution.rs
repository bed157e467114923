//! Selection methods for SelectEngine

use rand::Rng;
use serde::Serialize;

use crate::compiler::ast::Query;
use crate::compiler::QueryParser;
use crate::data::RecordIndex;
use crate::engine::core::SelectEngine;
use crate::engine::fallback::PlainFilter;
use crate::engine::matcher::find_matching_sets;
use crate::optimizer::{RuleSearch, SearchConfig, SearchOutcome};
use crate::results::{NameList, SelectionResult};

/// How the input text was interpreted
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionMode {
    /// A select statement that parsed cleanly
    Statement { query: Query },
    /// Anything else, used as a regex (or substring) over series descriptions
    PlainFilter { reason: String },
}

/// Outcome of [`select`]
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    #[serde(flatten)]
    pub mode: SelectionMode,
    pub result: SelectionResult,
    pub names: NameList,
}

impl Selection {
    pub fn is_statement(&self) -> bool {
        matches!(self.mode, SelectionMode::Statement { .. })
    }

    pub fn query(&self) -> Option<&Query> {
        match &self.mode {
            SelectionMode::Statement { query } => Some(query),
            SelectionMode::PlainFilter { .. } => None,
        }
    }
}

/// Select series with a select statement, or with a plain text filter when
/// the text does not parse.
pub fn select(text: &str, index: &RecordIndex) -> Selection {
    select_with(&QueryParser::new(), text, index)
}

fn select_with(parser: &QueryParser, text: &str, index: &RecordIndex) -> Selection {
    match parser.parse_query(text) {
        Ok(query) => {
            let (result, names) = find_matching_sets(&query, index);
            Selection {
                mode: SelectionMode::Statement { query },
                result,
                names,
            }
        }
        Err(e) => {
            log::info!("Not a select statement ({}), using it as a plain filter", e);
            let result = PlainFilter::new(text).select(index);
            let names = result.names();
            Selection {
                mode: SelectionMode::PlainFilter { reason: e.to_string() },
                result,
                names,
            }
        }
    }
}

impl SelectEngine {
    /// Select series from the loaded index, see [`select`]
    pub fn select(&self, text: &str) -> Selection {
        select_with(&self.parser, text, &self.index)
    }

    /// Apply an already compiled query
    pub fn run_query(&self, query: &Query) -> (SelectionResult, NameList) {
        find_matching_sets(query, &self.index)
    }

    /// Search for a better scoring variant of `query` on the loaded index
    pub fn improve<R: Rng + ?Sized>(&self, query: &Query, config: &SearchConfig, rng: &mut R) -> SearchOutcome {
        RuleSearch::new(config.clone()).run(query, &self.index, rng, |_| {})
    }
}
