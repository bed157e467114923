//! Series classification and grouping into selection entries

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::compiler::ast::{OutputLevel, Query};
use crate::data::{RecordIndex, SeriesRecord};
use crate::engine::checks::apply_checks;
use crate::engine::evaluator::{first_match, ruleset_matches};
use crate::results::{NameList, SelectedSeries, SelectionResult};

/// A series claimed by a rule set
#[derive(Debug, Clone)]
pub struct SeriesMatch<'a> {
    pub study_uid: &'a str,
    pub series_uid: &'a str,
    pub record: &'a SeriesRecord,
    pub ruleset: usize,
}

/// Classification of every series in one study
#[derive(Debug, Clone)]
pub struct StudyMatches<'a> {
    pub study_uid: &'a str,
    /// Number of series in the study, matched or not
    pub total: usize,
    pub matches: Vec<SeriesMatch<'a>>,
}

impl StudyMatches<'_> {
    /// Share of the study's series claimed by some rule set
    pub fn coverage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matches.len() as f64 / self.total as f64
        }
    }
}

/// Tag every series with the first rule set that holds for it.
///
/// Studies are independent, so they are classified in parallel; the
/// result keeps the index's study order.
pub fn classify_series<'a>(query: &Query, index: &'a RecordIndex) -> Vec<StudyMatches<'a>> {
    index
        .studies()
        .par_iter()
        .map(|(study_uid, series)| {
            let study_uid = study_uid.as_str();
            let matches = series
                .iter()
                .filter_map(|(series_uid, record)| {
                    let ruleset = first_match(query, record)?;
                    if log::log_enabled!(log::Level::Debug) {
                        report_ambiguity(query, ruleset, series_uid, record);
                    }
                    Some(SeriesMatch {
                        study_uid,
                        series_uid: series_uid.as_str(),
                        record,
                        ruleset,
                    })
                })
                .collect();
            StudyMatches {
                study_uid,
                total: series.len(),
                matches,
            }
        })
        .collect()
}

fn report_ambiguity(query: &Query, chosen: usize, series_uid: &str, record: &SeriesRecord) {
    let others: Vec<&str> = query
        .rulesets
        .iter()
        .enumerate()
        .skip(chosen + 1)
        .filter(|(_, ruleset)| ruleset_matches(ruleset, record))
        .map(|(_, ruleset)| ruleset.name.as_str())
        .collect();
    if !others.is_empty() {
        log::debug!(
            "Series {} matches '{}' and also {:?}, keeping the first",
            series_uid,
            query.rulesets[chosen].name,
            others
        );
    }
}

/// Every rule set position `0..count` is claimed by at least one series
fn is_complete(matches: &[&SeriesMatch<'_>], count: usize) -> bool {
    (0..count).all(|position| matches.iter().any(|m| m.ruleset == position))
}

/// Apply a select statement to an index.
///
/// Check rules filter each group before the completeness test; at
/// project level they apply per patient, before qualifying series are
/// merged. Returns the selection entries together with the rule set names of each
/// entry's series, in the same order.
pub fn find_matching_sets(query: &Query, index: &RecordIndex) -> (SelectionResult, NameList) {
    let studies = classify_series(query, index);
    let count = query.rulesets.len();

    let mut groups: Vec<Vec<&SeriesMatch<'_>>> = match query.level {
        OutputLevel::Series => studies
            .iter()
            .flat_map(|study| study.matches.iter().map(|m| apply_checks(query, vec![m])))
            .collect(),
        OutputLevel::Study => studies
            .iter()
            .map(|study| apply_checks(query, study.matches.iter().collect()))
            .filter(|matches| is_complete(matches, count))
            .collect(),
        OutputLevel::Patient => by_patient(&studies)
            .into_values()
            .map(|matches| apply_checks(query, matches))
            .filter(|matches| is_complete(matches, count))
            .collect(),
        OutputLevel::Project => {
            // completeness is checked per patient, qualifying series are merged
            let merged: Vec<&SeriesMatch<'_>> = by_patient(&studies)
                .into_values()
                .map(|matches| apply_checks(query, matches))
                .filter(|matches| is_complete(matches, count))
                .flatten()
                .collect();
            vec![merged]
        }
    };
    groups.retain(|group| !group.is_empty());
    groups.sort_by_key(|group| Reverse(group.iter().map(|m| m.record.image_count).sum::<i64>()));

    let entries: Vec<Vec<SelectedSeries>> = groups
        .iter()
        .map(|group| group.iter().map(|m| selected(query, m)).collect())
        .collect();
    let mut result = SelectionResult::from_entries(entries);
    result.warnings = duplicate_series_warnings(&studies);

    log::debug!(
        "Level '{}' with {} rule sets selected {} entries ({} series)",
        query.level,
        count,
        result.len(),
        result.num_series()
    );
    let names = result.names();
    (result, names)
}

fn by_patient<'s, 'a>(studies: &'s [StudyMatches<'a>]) -> BTreeMap<String, Vec<&'s SeriesMatch<'a>>> {
    let mut patients: BTreeMap<String, Vec<&SeriesMatch<'a>>> = BTreeMap::new();
    for m in studies.iter().flat_map(|study| study.matches.iter()) {
        patients.entry(m.record.ancestor()).or_default().push(m);
    }
    patients
}

fn selected(query: &Query, m: &SeriesMatch<'_>) -> SelectedSeries {
    SelectedSeries {
        series_uid: m.series_uid.to_string(),
        study_uid: m.study_uid.to_string(),
        patient: m.record.ancestor(),
        name: query.rulesets[m.ruleset].name.clone(),
        ruleset: Some(m.ruleset),
    }
}

/// Series instance UIDs should be globally unique; flag matched ones that
/// show up under more than one patient.
fn duplicate_series_warnings(studies: &[StudyMatches<'_>]) -> Vec<String> {
    let mut owners: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for m in studies.iter().flat_map(|study| study.matches.iter()) {
        owners.entry(m.series_uid).or_default().insert(m.record.ancestor());
    }
    owners
        .into_iter()
        .filter(|(_, patients)| patients.len() > 1)
        .map(|(series_uid, patients)| {
            let warning = format!(
                "series {} is present for patients {}, series instance UIDs should be unique",
                series_uid,
                patients.into_iter().collect::<Vec<_>>().join(", ")
            );
            log::warn!("{}", warning);
            warning
        })
        .collect()
}
