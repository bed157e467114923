//! Engine module for selecting series from a record index
//!
//! This module is organized into the following submodules:
//! - `evaluator`: single rule and rule set evaluation against one series
//! - `matcher`: first-match classification and grouping per output level
//! - `checks`: cross-series tag consistency filter applied to each group
//! - `fallback`: plain text filtering for input that does not parse
//! - `core`: SelectEngine struct and constructors
//! - `execution`: select entry points (statement first, plain filter second)

pub mod checks;
pub mod core;
pub mod evaluator;
pub mod execution;
pub mod fallback;
pub mod matcher;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use core::SelectEngine;
pub use checks::{apply_checks, tags_agree};
pub use evaluator::{evaluate, first_match, holds, ruleset_matches};
pub use execution::{select, Selection, SelectionMode};
pub use fallback::{describe_series, PlainFilter};
pub use matcher::{classify_series, find_matching_sets, SeriesMatch, StudyMatches};
