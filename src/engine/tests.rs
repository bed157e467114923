use super::*;
use crate::compiler::parse;
use crate::data::{RecordIndex, SeriesRecord};
use std::io::Write;

fn series(modality: &str, images: i64, patient: &str) -> SeriesRecord {
    SeriesRecord {
        modality: modality.to_string(),
        image_count: images,
        patient_id: patient.to_string(),
        ..Default::default()
    }
}

fn matched_uids(query: &str, index: &RecordIndex) -> Vec<Vec<String>> {
    let query = parse(query).unwrap();
    let (result, _) = find_matching_sets(&query, index);
    result
        .entries
        .iter()
        .map(|e| e.series_uids().into_iter().map(String::from).collect())
        .collect()
}

/// One study with an MR series (A) and a CT series (B)
fn mr_ct_index() -> RecordIndex {
    RecordIndex::new()
        .with_series("study1", "A", series("MR", 1, "p1"))
        .with_series("study1", "B", series("CT", 1, "p1"))
}

#[test]
fn test_series_level_selects_matching_record_only() {
    let query = parse(r#"select series from study where series has modality == "MR""#).unwrap();
    let (result, names) = find_matching_sets(&query, &mr_ct_index());

    assert_eq!(result.len(), 1);
    assert_eq!(result.entries[0].series_uids(), vec!["A"]);
    assert_eq!(names, vec![vec!["no-name".to_string()]]);
}

#[test]
fn test_study_level_requires_every_ruleset() {
    let text = r#"select study from study where series has modality == "MR" also where series has modality == "CT""#;

    let mut found = matched_uids(text, &mr_ct_index());
    assert_eq!(found.len(), 1);
    found[0].sort();
    assert_eq!(found[0], vec!["A".to_string(), "B".to_string()]);

    let mr_only = RecordIndex::new().with_series("study1", "A", series("MR", 1, "p1"));
    assert!(matched_uids(text, &mr_only).is_empty());
}

#[test]
fn test_first_match_wins_names_series_by_earliest_ruleset() {
    let text = r#"select series from study
        where series named "anything" has imageCount > 0
        also where series named "mr" has modality == "MR""#;
    let query = parse(text).unwrap();
    let (result, names) = find_matching_sets(&query, &mr_ct_index());

    assert_eq!(result.len(), 2);
    for entry_names in &names {
        assert_eq!(entry_names, &vec!["anything".to_string()]);
    }
    assert!(result.entries.iter().all(|e| e.series[0].ruleset == Some(0)));
}

#[test]
fn test_two_of_three_rulesets_excludes_group() {
    let text = r#"select study from study
        where series named "mr" has modality == "MR"
        also where series named "ct" has modality == "CT"
        also where series named "pt" has modality == "PT""#;
    let index = mr_ct_index()
        .with_series("study2", "C", series("MR", 5, "p2"))
        .with_series("study2", "D", series("CT", 5, "p2"))
        .with_series("study2", "E", series("PT", 5, "p2"));

    assert_eq!(matched_uids(text, &index), vec![vec!["C".to_string(), "D".to_string(), "E".to_string()]]);

    let patient_level = text.replacen("select study", "select patient", 1);
    assert_eq!(matched_uids(&patient_level, &index).len(), 1);
}

#[test]
fn test_patient_level_groups_across_studies() {
    let text = r#"select patient from study where series has modality == "MR" also where series has modality == "CT""#;
    // p1 has MR and CT in different studies, p2 only MR
    let index = RecordIndex::new()
        .with_series("study1", "A", series("MR", 1, "p1"))
        .with_series("study2", "B", series("CT", 1, "p1"))
        .with_series("study3", "C", series("MR", 1, "p2"));

    assert_eq!(matched_uids(text, &index), vec![vec!["A".to_string(), "B".to_string()]]);
    let study_level = text.replacen("select patient", "select study", 1);
    assert!(matched_uids(&study_level, &index).is_empty());
}

#[test]
fn test_project_level_merges_qualifying_patients() {
    let text = r#"select project from study where series has modality == "MR" also where series has modality == "CT""#;
    let index = RecordIndex::new()
        .with_series("study1", "A", series("MR", 1, "p1"))
        .with_series("study1", "B", series("CT", 1, "p1"))
        .with_series("study2", "C", series("MR", 1, "p2"))
        .with_series("study2", "D", series("CT", 1, "p2"))
        .with_series("study3", "E", series("MR", 1, "p3"));

    let found = matched_uids(text, &index);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], vec!["A", "B", "C", "D"]);

    let patient_level = text.replacen("select project", "select patient", 1);
    assert_eq!(matched_uids(&patient_level, &index).len(), 2);
}

#[test]
fn test_project_level_without_qualifying_patients_is_empty() {
    let text = r#"select project from study where series has modality == "PT""#;
    assert!(matched_uids(text, &mr_ct_index()).is_empty());
}

#[test]
fn test_entries_sorted_by_image_count() {
    let index = RecordIndex::new()
        .with_series("a", "small", series("MR", 10, "p1"))
        .with_series("b", "large", series("MR", 300, "p2"))
        .with_series("c", "medium", series("MR", 120, "p3"))
        .with_series("d", "tie", series("MR", 120, "p4"));

    let query = parse(r#"select study from study where series has modality == "MR""#).unwrap();
    let (result, _) = find_matching_sets(&query, &index);
    let order: Vec<&str> = result.entries.iter().map(|e| e.series_uids()[0]).collect();
    // ties keep study key order
    assert_eq!(order, vec!["large", "medium", "tie", "small"]);
    let positions: Vec<usize> = result.entries.iter().map(|e| e.order).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
}

#[test]
fn test_duplicate_series_across_patients_is_reported() {
    let index = RecordIndex::new()
        .with_series("study1", "dup", series("MR", 1, "p1"))
        .with_series("study2", "dup", series("MR", 1, "p2"))
        .with_series("study3", "ok", series("MR", 1, "p3"));
    let query = parse(r#"select series from study where series has modality == "MR""#).unwrap();
    let (result, _) = find_matching_sets(&query, &index);

    assert_eq!(result.len(), 3);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("dup"));
    assert!(result.warnings[0].contains("p1, p2"));
}

#[test]
fn test_empty_index_yields_empty_result() {
    let index = RecordIndex::new();
    for level in ["series", "study", "patient", "project"] {
        let text = format!(r#"select {} from study where series has modality == "MR""#, level);
        let query = parse(&text).unwrap();
        let (result, names) = find_matching_sets(&query, &index);
        assert!(result.is_empty());
        assert!(names.is_empty());
        assert!(result.warnings.is_empty());
    }
}

#[test]
fn test_classify_series_keeps_study_order_and_totals() {
    let index = mr_ct_index().with_series("study0", "X", series("MR", 1, "p0"));
    let query = parse(r#"select series where modality == "MR""#).unwrap();
    let studies = classify_series(&query, &index);

    let uids: Vec<&str> = studies.iter().map(|s| s.study_uid).collect();
    assert_eq!(uids, vec!["study0", "study1"]);
    assert_eq!(studies[1].total, 2);
    assert_eq!(studies[1].matches.len(), 1);
    assert!((studies[1].coverage() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn test_select_uses_statement_when_it_parses() {
    let selection = select(r#"select series where modality == "CT""#, &mr_ct_index());
    assert!(selection.is_statement());
    assert_eq!(selection.result.entries[0].series_uids(), vec!["B"]);
    assert_eq!(selection.query().map(|q| q.rulesets.len()), Some(1));
}

#[test]
fn test_select_falls_back_to_plain_filter() {
    let selection = select("Modality: CT", &mr_ct_index());
    assert!(!selection.is_statement());
    assert!(matches!(selection.mode, SelectionMode::PlainFilter { .. }));
    assert_eq!(selection.result.len(), 1);
    assert_eq!(selection.result.entries[0].series_uids(), vec!["B"]);
    assert_eq!(selection.names, vec![vec!["no-name".to_string()]]);

    // a malformed statement is still a filter
    let selection = select(r#"select series where modality == "#, &mr_ct_index());
    assert!(!selection.is_statement());
    assert!(selection.result.is_empty());
}

#[test]
fn test_engine_from_index_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{"study1": {"A": {"Modality": "MR", "NumImages": 1, "PatientID": "p1"},
                        "B": {"Modality": "CT", "NumImages": 1, "PatientID": "p1"}}}"#,
    )
    .unwrap();

    let engine = SelectEngine::from_path(file.path()).unwrap();
    assert_eq!(engine.num_series(), 2);
    assert_eq!(engine.num_studies(), 1);

    let selection = engine.select(
        r#"select study where series named "mr" has modality == "MR" also where series named "ct" has modality == "CT""#,
    );
    assert_eq!(selection.names, vec![vec!["mr".to_string(), "ct".to_string()]]);

    let query = selection.query().unwrap().clone();
    let (result, _) = engine.run_query(&query);
    assert_eq!(result, selection.result);
}

fn mr_with_study_tag(images: i64, patient: &str, frame_of_reference: &str) -> SeriesRecord {
    SeriesRecord {
        tags: vec![crate::data::TagValue::new(0x0020, 0x0052, vec![frame_of_reference.to_string()])],
        ..series("MR", images, patient)
    }
}

#[test]
fn test_or_and_not_within_one_ruleset() {
    let index = RecordIndex::new()
        .with_series("study1", "A", series("MR", 10, "p1"))
        .with_series("study1", "B", series("CT", 2, "p1"))
        .with_series("study1", "C", series("US", 5, "p1"))
        .with_series("study1", "D", series("MR", 1, "p1"));

    let found = matched_uids(r#"select series where modality == "MR" or modality == "US""#, &index);
    assert_eq!(found, vec![vec!["A".to_string()], vec!["C".to_string()], vec!["D".to_string()]]);

    let found = matched_uids(r#"select series where (modality == MR or modality == US) and not imageCount < 5"#, &index);
    assert_eq!(found, vec![vec!["A".to_string()], vec!["C".to_string()]]);

    // first match still decides which rule set claims a series
    let query = parse(
        r#"select series where series named "ct-or-mr" has not modality == US
           also where series named "mr" has modality == MR"#,
    )
    .unwrap();
    let (_, names) = find_matching_sets(&query, &index);
    assert!(names.iter().flatten().all(|name| name == "ct-or-mr"));
}

#[test]
fn test_check_keeps_consistent_pairs_only() {
    let index = RecordIndex::new()
        // same frame of reference: kept
        .with_series("study1", "A", mr_with_study_tag(100, "p1", "1.2.3"))
        .with_series("study1", "B", SeriesRecord {
            tags: vec![crate::data::TagValue::new(0x0020, 0x0052, vec!["1.2.3".to_string()])],
            ..series("CT", 50, "p1")
        })
        // CT without a matching MR frame of reference: the whole study fails
        .with_series("study2", "C", mr_with_study_tag(100, "p2", "9.9"))
        .with_series("study2", "D", SeriesRecord {
            tags: vec![crate::data::TagValue::new(0x0020, 0x0052, vec!["1.2.3".to_string()])],
            ..series("CT", 50, "p2")
        });
    let text = r#"select study where series named "mr" has modality == MR
        also where series named "ct" has modality == CT
        check "mr"@(0020,0052) == "ct"@(0020,0052)"#;

    let mut found = matched_uids(text, &index);
    assert_eq!(found.len(), 1);
    found[0].sort();
    assert_eq!(found[0], vec!["A".to_string(), "B".to_string()]);

    // without the check both studies qualify
    let unchecked = r#"select study where series named "mr" has modality == MR
        also where series named "ct" has modality == CT"#;
    assert_eq!(matched_uids(unchecked, &index).len(), 2);
}

#[test]
fn test_check_drops_only_failing_series() {
    // two MR series in one study, only one agrees with the CT
    let index = RecordIndex::new()
        .with_series("study1", "A", mr_with_study_tag(100, "p1", "1.2.3"))
        .with_series("study1", "B", mr_with_study_tag(80, "p1", "4.5.6"))
        .with_series("study1", "C", SeriesRecord {
            tags: vec![crate::data::TagValue::new(0x0020, 0x0052, vec!["1.2.3".to_string()])],
            ..series("CT", 50, "p1")
        })
        .with_series("study1", "D", series("US", 1, "p1"));
    let text = r#"select study where series named "mr" has modality == MR
        also where series named "ct" has modality == CT
        also where series named "us" has modality == US
        check "mr"@(0020,0052) == "ct"@(0020,0052)"#;

    let mut found = matched_uids(text, &index);
    assert_eq!(found.len(), 1);
    found[0].sort();
    // B disagrees, D is not mentioned by the check
    assert_eq!(found[0], vec!["A".to_string(), "C".to_string(), "D".to_string()]);
}

#[test]
fn test_check_applies_per_patient_at_project_level() {
    let index = RecordIndex::new()
        .with_series("s1", "A", mr_with_study_tag(10, "p1", "x"))
        .with_series("s2", "B", SeriesRecord {
            tags: vec![crate::data::TagValue::new(0x0020, 0x0052, vec!["x".to_string()])],
            ..series("CT", 10, "p1")
        })
        .with_series("s3", "C", mr_with_study_tag(10, "p2", "y"))
        // agrees with p1's MR but belongs to another patient
        .with_series("s4", "D", SeriesRecord {
            tags: vec![crate::data::TagValue::new(0x0020, 0x0052, vec!["x".to_string()])],
            ..series("CT", 10, "p2")
        });
    let text = r#"select project where series named "mr" has modality == MR
        also where series named "ct" has modality == CT
        check "mr"@(0020,0052) == "ct"@(0020,0052)"#;

    let mut found = matched_uids(text, &index);
    assert_eq!(found.len(), 1);
    found[0].sort();
    assert_eq!(found[0], vec!["A".to_string(), "B".to_string()]);
}
