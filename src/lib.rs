pub mod compiler;
pub mod data;
pub mod engine;
pub mod optimizer;
pub mod results;

pub use compiler::{describe, parse, ParseError, QueryParser};
pub use compiler::ast::{CheckRule, Condition, Field, Operator, OutputLevel, Query, Rule, RuleSet, SeriesTag};
pub use data::{IndexParser, RecordIndex, SeriesRecord};
pub use engine::{find_matching_sets, select, SelectEngine, Selection};
pub use optimizer::{improve, RuleSearch, SearchConfig, SearchOutcome};
pub use results::{NameList, SelectionResult};
