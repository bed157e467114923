//! Scoring of candidate queries

use crate::compiler::ast::Query;
use crate::data::RecordIndex;
use crate::engine::matcher::{classify_series, StudyMatches};

/// Mean share of matched series over the studies with at least one match,
/// 0 when nothing matched.
pub fn balance(studies: &[StudyMatches<'_>]) -> f64 {
    let ratios: Vec<f64> = studies
        .iter()
        .filter(|study| !study.matches.is_empty())
        .map(|study| study.coverage())
        .collect();
    if ratios.is_empty() {
        0.0
    } else {
        ratios.iter().sum::<f64>() / ratios.len() as f64
    }
}

/// `log2(rules + 1)`, added to the balance term
pub fn complexity(query: &Query) -> f64 {
    ((query.rule_count() + 1) as f64).log2()
}

/// Score to maximise: balance plus complexity
pub fn fitness(query: &Query, index: &RecordIndex) -> f64 {
    balance(&classify_series(query, index)) + complexity(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parse;
    use crate::data::SeriesRecord;

    fn modality(m: &str) -> SeriesRecord {
        SeriesRecord { modality: m.to_string(), ..Default::default() }
    }

    fn index() -> RecordIndex {
        RecordIndex::new()
            .with_series("st1", "a", modality("MR"))
            .with_series("st1", "b", modality("CT"))
            .with_series("st2", "c", modality("MR"))
            .with_series("st3", "d", modality("US"))
    }

    #[test]
    fn test_balance_ignores_unmatched_studies() {
        let query = parse(r#"select series where modality == "MR""#).unwrap();
        // st1: 1/2, st2: 1/1, st3 ignored
        let index = index();
        let studies = classify_series(&query, &index);
        assert!((balance(&studies) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_fitness_adds_complexity() {
        let query = parse(r#"select series where modality == "MR""#).unwrap();
        assert!((fitness(&query, &index()) - 1.75).abs() < 1e-12);

        let two_rules = parse(r#"select series where modality == "MR" and modality contains "M""#).unwrap();
        let expected = 0.75 + 3f64.log2();
        assert!((fitness(&two_rules, &index()) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_nothing_matched() {
        let query = parse(r#"select series where modality == "PT""#).unwrap();
        assert!((fitness(&query, &index()) - 1.0).abs() < 1e-12);
        assert_eq!(fitness(&query, &RecordIndex::new()), 1.0);
        assert_eq!(balance(&[]), 0.0);
    }
}
