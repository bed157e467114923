use serde::{Deserialize, Serialize};

/// Rule set names of the series in each selection entry, parallel to the entries
pub type NameList = Vec<Vec<String>>;

/// One selected series and the rule set that claimed it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedSeries {
    pub series_uid: String,
    pub study_uid: String,
    /// Patient identity the series was grouped under
    pub patient: String,
    /// Name of the matching rule set
    pub name: String,
    /// Position of the matching rule set, `None` for plain text filters
    pub ruleset: Option<usize>,
}

/// Series exported together as one unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    /// Position of this entry in the result
    pub order: usize,
    pub series: Vec<SelectedSeries>,
}

impl SelectionEntry {
    pub fn series_uids(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.series_uid.as_str()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.series.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// `name:uid` pairs, the form shown to users when a job is picked
    pub fn summary(&self) -> String {
        self.series
            .iter()
            .map(|s| format!("{}:{}", s.name, s.series_uid))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of applying a select statement (or plain filter) to an index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub entries: Vec<SelectionEntry>,
    /// Data consistency problems noticed while matching
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

impl SelectionResult {
    /// Wrap entries, numbering them in their current order
    pub fn from_entries(entries: Vec<Vec<SelectedSeries>>) -> Self {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(order, series)| SelectionEntry { order, series })
            .collect();
        Self { entries, warnings: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rule set names per entry
    pub fn names(&self) -> NameList {
        self.entries.iter().map(|e| e.names()).collect()
    }

    /// Total number of selected series across entries
    pub fn num_series(&self) -> usize {
        self.entries.iter().map(|e| e.len()).sum()
    }

    /// Format this result as a pretty JSON string
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}
