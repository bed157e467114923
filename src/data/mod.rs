pub mod index;
pub mod parser;
pub mod record;

pub use index::{RecordIndex, StudySeries};
pub use parser::IndexParser;
pub use record::{FieldValues, SeriesRecord, TagValue};
