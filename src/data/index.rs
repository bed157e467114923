use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::data::record::SeriesRecord;

/// Series of one study, keyed by series instance UID
pub type StudySeries = BTreeMap<String, SeriesRecord>;

/// Study instance UID → series instance UID → metadata.
///
/// Ordered maps keep every walk over the index deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordIndex {
    studies: BTreeMap<String, StudySeries>,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, study_uid: impl Into<String>, series_uid: impl Into<String>, record: SeriesRecord) {
        self.studies
            .entry(study_uid.into())
            .or_default()
            .insert(series_uid.into(), record);
    }

    /// Builder-style `insert`
    pub fn with_series(mut self, study_uid: &str, series_uid: &str, record: SeriesRecord) -> Self {
        self.insert(study_uid, series_uid, record);
        self
    }

    pub fn studies(&self) -> &BTreeMap<String, StudySeries> {
        &self.studies
    }

    pub fn get(&self, study_uid: &str, series_uid: &str) -> Option<&SeriesRecord> {
        self.studies.get(study_uid)?.get(series_uid)
    }

    /// Every series as `(study_uid, series_uid, record)` in key order
    pub fn iter_series(&self) -> impl Iterator<Item = (&str, &str, &SeriesRecord)> {
        self.studies.iter().flat_map(|(study, series)| {
            series
                .iter()
                .map(move |(series_uid, record)| (study.as_str(), series_uid.as_str(), record))
        })
    }

    pub fn num_studies(&self) -> usize {
        self.studies.len()
    }

    pub fn num_series(&self) -> usize {
        self.studies.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_series() == 0
    }
}

impl From<BTreeMap<String, StudySeries>> for RecordIndex {
    fn from(studies: BTreeMap<String, StudySeries>) -> Self {
        Self { studies }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_iterate_in_key_order() {
        let index = RecordIndex::new()
            .with_series("study-b", "s2", SeriesRecord::default())
            .with_series("study-a", "s9", SeriesRecord::default())
            .with_series("study-a", "s1", SeriesRecord::default());
        assert_eq!(index.num_studies(), 2);
        assert_eq!(index.num_series(), 3);
        let order: Vec<(&str, &str)> = index.iter_series().map(|(st, se, _)| (st, se)).collect();
        assert_eq!(order, vec![("study-a", "s1"), ("study-a", "s9"), ("study-b", "s2")]);
        assert!(index.get("study-a", "s9").is_some());
        assert!(index.get("study-a", "s2").is_none());
    }

    #[test]
    fn test_empty_index() {
        let index = RecordIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.iter_series().count(), 0);
    }
}
