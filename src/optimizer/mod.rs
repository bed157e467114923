//! Rule search: improve a select statement against a sample index
//!
//! - `config`: `SearchConfig` and YAML loading
//! - `fitness`: candidate scoring
//! - `mutation`: random edits and the values they draw from
//! - `search`: the bounded search loop

pub mod config;
pub mod fitness;
pub mod mutation;
pub mod search;

pub use config::{load_config, ConfigError, SearchConfig};
pub use fitness::{balance, complexity, fitness};
pub use mutation::{mutate, Mutation, TargetValues};
pub use search::{improve, IterationStats, RuleSearch, SearchOutcome};
