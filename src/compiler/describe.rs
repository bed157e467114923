//! Human readable summary of a compiled select statement

use crate::compiler::ast::{OutputLevel, Query};

/// One sentence for the output level, one for the number of rule sets, one
/// for check rules when there are any and one with the normalised select
/// statement.
pub fn humanize(query: &Query) -> Vec<String> {
    let mut sentences = Vec::new();

    sentences.push(
        match query.level {
            OutputLevel::Series => "We will run processing on any single image series that matches.",
            OutputLevel::Study => {
                "We will run processing on data containing a single study and its matching image series."
            }
            OutputLevel::Patient => {
                "We will run processing on data containing all studies of a patient for which those \
                 studies have the correct number of matching image series."
            }
            OutputLevel::Project => "We will run processing on all data with matching image series.",
        }
        .to_string(),
    );

    if query.rulesets.len() == 1 {
        sentences.push("We will select cases with a single matching image series.".to_string());
    } else {
        sentences.push(format!(
            "We will select cases with {} image series.",
            query.rulesets.len()
        ));
    }

    if !query.checks.is_empty() {
        sentences.push(format!(
            "Matched series must agree on {} tag check{}.",
            query.checks.len(),
            if query.checks.len() == 1 { "" } else { "s" }
        ));
    }

    sentences.push(format!("The select statement is: {}", query.to_select_string()));
    sentences
}

/// `humanize` joined into a single paragraph
pub fn describe(query: &Query) -> String {
    humanize(query).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parse;

    #[test]
    fn test_describe_classifies_level_and_count() {
        let cases = [
            (
                "select series from study where series has modality == MR",
                "any single image series",
                "a single matching image series",
            ),
            (
                "select study from study where series has modality == MR also where series has modality == CT",
                "a single study and its matching image series",
                "with 2 image series",
            ),
            (
                "select patient from study where modality == MR also where modality == CT also where modality == PT",
                "all studies of a patient",
                "with 3 image series",
            ),
            (
                "select project from study where modality == MR",
                "all data with matching image series",
                "a single matching image series",
            ),
        ];
        for (text, level_phrase, count_phrase) in cases {
            let summary = describe(&parse(text).unwrap());
            assert!(summary.contains(level_phrase), "'{}' should mention '{}'", summary, level_phrase);
            assert!(summary.contains(count_phrase), "'{}' should mention '{}'", summary, count_phrase);
        }
    }

    #[test]
    fn test_humanize_includes_statement() {
        let query = parse("select series where modality == MR").unwrap();
        let sentences = humanize(&query);
        assert_eq!(sentences.len(), 3);
        assert!(sentences[2].ends_with(&query.to_select_string()));
    }

    #[test]
    fn test_humanize_mentions_checks() {
        let query = parse(
            r#"select study where series named "a" has modality == MR also where series named "b" has modality == CT
               check "a"@(0020,0052) == "b"@(0020,0052)"#,
        )
        .unwrap();
        let sentences = humanize(&query);
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[2], "Matched series must agree on 1 tag check.");
        assert!(sentences[3].ends_with(&query.to_select_string()));
    }
}
