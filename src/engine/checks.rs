//! Cross-series consistency checks, `check "a"@(g,e) == "b"@(g,e)`

use crate::compiler::ast::{Query, SeriesTag};
use crate::data::SeriesRecord;
use crate::engine::matcher::SeriesMatch;

/// Drop the series of one group that fail the query's check rules.
///
/// A series whose rule set is named by a check rule stays only if, for
/// every such rule, some series of the other named rule set in the same
/// group agrees with it on the two tags. Series of rule sets that no check
/// mentions are kept.
pub fn apply_checks<'s, 'a>(query: &Query, group: Vec<&'s SeriesMatch<'a>>) -> Vec<&'s SeriesMatch<'a>> {
    if query.checks.is_empty() {
        return group;
    }
    let kept: Vec<&SeriesMatch<'a>> = group
        .iter()
        .copied()
        .filter(|m| passes_checks(query, m, &group))
        .collect();
    if kept.len() < group.len() {
        log::debug!("Checks removed {} of {} series", group.len() - kept.len(), group.len());
    }
    kept
}

fn passes_checks(query: &Query, m: &SeriesMatch<'_>, group: &[&SeriesMatch<'_>]) -> bool {
    let name = query.rulesets[m.ruleset].name.as_str();
    query.checks.iter().filter(|check| check.mentions(name)).all(|check| {
        group.iter().any(|other| {
            let other_name = query.rulesets[other.ruleset].name.as_str();
            let as_left = check.left.series == name
                && check.right.series == other_name
                && tags_agree(m.record, &check.left, other.record, &check.right);
            let as_right = check.right.series == name
                && check.left.series == other_name
                && tags_agree(other.record, &check.left, m.record, &check.right);
            as_left || as_right
        })
    })
}

/// Both series carry their tag and the values agree position by position,
/// over the shorter of the two value lists
pub fn tags_agree(left: &SeriesRecord, left_tag: &SeriesTag, right: &SeriesRecord, right_tag: &SeriesTag) -> bool {
    match (
        left.tag_values(left_tag.group, left_tag.element),
        right.tag_values(right_tag.group, right_tag.element),
    ) {
        (Some(a), Some(b)) => a.iter().zip(b).all(|(x, y)| x.trim() == y.trim()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TagValue;

    fn with_tag(group: u16, element: u16, values: &[&str]) -> SeriesRecord {
        SeriesRecord {
            tags: vec![TagValue::new(group, element, values.iter().map(|v| v.to_string()).collect())],
            ..Default::default()
        }
    }

    #[test]
    fn test_tags_agree() {
        let thickness = SeriesTag::new("t1", 0x0018, 0x0050);
        let other = SeriesTag::new("dwi", 0x0018, 0x0050);

        assert!(tags_agree(&with_tag(0x0018, 0x0050, &["1"]), &thickness, &with_tag(0x0018, 0x0050, &[" 1 "]), &other));
        assert!(!tags_agree(&with_tag(0x0018, 0x0050, &["1"]), &thickness, &with_tag(0x0018, 0x0050, &["2"]), &other));
        // the shorter list decides
        assert!(tags_agree(
            &with_tag(0x0018, 0x0050, &["1", "2"]),
            &thickness,
            &with_tag(0x0018, 0x0050, &["1"]),
            &other
        ));
        // both series must carry the tag
        assert!(!tags_agree(&SeriesRecord::default(), &thickness, &with_tag(0x0018, 0x0050, &["1"]), &other));
    }
}
