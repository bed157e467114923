//! Plain-text filtering for input that is not a select statement

use regex::Regex;

use crate::compiler::ast::DEFAULT_RULESET_NAME;
use crate::data::{RecordIndex, SeriesRecord};
use crate::results::{SelectedSeries, SelectionResult};

/// One-line labelled description of a series; plain filters match against it.
pub fn describe_series(study_uid: &str, series_uid: &str, record: &SeriesRecord) -> String {
    format!(
        "StudyInstanceUID: {}, SeriesInstanceUID: {}, SeriesDescription: {}, NumImages: {}, \
         SeriesNumber: {}, SequenceName: {}, Modality: {}, Manufacturer: {}, \
         ManufacturerModelName: {}, StudyDescription: {}, PatientID: {}, PatientName: {}, \
         ClassifyType: {}",
        study_uid,
        series_uid,
        record.series_description,
        record.image_count,
        record.sequence_number,
        record.sequence_name,
        record.modality,
        record.manufacturer,
        record.manufacturer_model_name,
        record.study_description,
        record.patient_id,
        record.patient_name,
        record.classify_types.join(" ")
    )
}

/// Regex filter over series descriptions, or a substring filter when the
/// text is not a valid regular expression.
#[derive(Debug, Clone)]
pub enum PlainFilter {
    Regex(Regex),
    Substring(String),
}

impl PlainFilter {
    pub fn new(text: &str) -> Self {
        match Regex::new(text) {
            Ok(regex) => PlainFilter::Regex(regex),
            Err(e) => {
                log::debug!("'{}' is not a regular expression ({}), matching it literally", text, e);
                PlainFilter::Substring(text.to_string())
            }
        }
    }

    pub fn is_match(&self, line: &str) -> bool {
        match self {
            PlainFilter::Regex(regex) => regex.is_match(line),
            PlainFilter::Substring(needle) => line.contains(needle.as_str()),
        }
    }

    /// One entry per series whose description line matches
    pub fn select(&self, index: &RecordIndex) -> SelectionResult {
        let entries = index
            .iter_series()
            .filter(|(study_uid, series_uid, record)| {
                self.is_match(&describe_series(study_uid, series_uid, record))
            })
            .map(|(study_uid, series_uid, record)| {
                vec![SelectedSeries {
                    series_uid: series_uid.to_string(),
                    study_uid: study_uid.to_string(),
                    patient: record.ancestor(),
                    name: DEFAULT_RULESET_NAME.to_string(),
                    ruleset: None,
                }]
            })
            .collect();
        SelectionResult::from_entries(entries)
    }
}
