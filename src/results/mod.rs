pub mod selection;

pub use selection::{NameList, SelectedSeries, SelectionEntry, SelectionResult};
