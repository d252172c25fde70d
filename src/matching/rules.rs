//! Type/profile rule evaluation and the cross-type ambiguity rule.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::core::schema::TypeRule;
use crate::core::types::{
    AlleleVerdict, ClassificationResult, RegionVerdict, TargetVerdict, TypeOutcome,
    MULTIPLE_TYPES, NO_TYPE,
};

/// Presence verdicts derived from allele calls: a target is present when any
/// allele, known or novel, was called.
#[must_use]
pub fn allele_presence(verdict: &AlleleVerdict) -> TargetVerdict {
    verdict
        .iter()
        .map(|(target, call)| (target.clone(), call.is_called()))
        .collect()
}

/// Evaluate each rule against presence verdicts.
///
/// A rule passes when every required target is present and no excluded target
/// is. Targets missing from `verdicts` count as absent.
#[must_use]
pub fn evaluate_types(types: &[TypeRule], verdicts: &TargetVerdict) -> Vec<TypeOutcome> {
    let present = |t: &str| verdicts.get(t).copied().unwrap_or(false);
    types
        .iter()
        .map(|rule| evaluate_rule(rule, present))
        .collect()
}

/// Evaluate each rule against region coverage.
///
/// A target is present when its coverage is at least `min_coverage` percent.
/// Outcomes additionally carry the coverage and hit count of every satisfied
/// target, and their diagnostic comments.
#[must_use]
pub fn evaluate_regions(
    types: &[TypeRule],
    verdicts: &RegionVerdict,
    min_coverage: f64,
) -> Vec<TypeOutcome> {
    let present = |t: &str| verdicts.get(t).is_some_and(|r| r.coverage >= min_coverage);
    types
        .iter()
        .map(|rule| {
            let mut outcome = evaluate_rule(rule, present);
            let prefix_comments = rule.required.len() > 1;
            let mut diagnostics = Vec::new();
            for target in &outcome.satisfied {
                let Some(region) = verdicts.get(target) else {
                    continue;
                };
                outcome.coverages.push(region.coverage);
                outcome.hit_counts.push(region.hits.len());
                for comment in &region.comments {
                    if prefix_comments {
                        diagnostics.push(format!("{target}: {comment}"));
                    } else {
                        diagnostics.push(comment.clone());
                    }
                }
            }
            // Exclusion failures lead; coverage diagnostics follow
            outcome.comments.extend(diagnostics);
            outcome
        })
        .collect()
}

fn evaluate_rule(rule: &TypeRule, present: impl Fn(&str) -> bool) -> TypeOutcome {
    let (satisfied, missing): (Vec<String>, Vec<String>) =
        rule.required.iter().cloned().partition(|t| present(t));

    let mut comments = Vec::new();
    for exclude in rule.excludes.iter().filter(|t| present(t)) {
        debug!("Excluded target {exclude} found, failing type {}", rule.name);
        comments.push(format!(
            "Excluded target {exclude} found, failing type {}",
            rule.name
        ));
    }

    let status = missing.is_empty() && comments.is_empty();
    debug!(
        rule = %rule.name,
        status,
        satisfied = ?satisfied,
        missing = ?missing,
        "Evaluated rule"
    );

    TypeOutcome {
        name: rule.name.clone(),
        status,
        satisfied,
        missing,
        coverages: Vec::new(),
        hit_counts: Vec::new(),
        comments,
    }
}

/// Collapse per-type outcomes into a single call for a sample.
///
/// - No type passed: `-`, noting whether any target was found at all.
/// - One type passed: that type, with its comments.
/// - Several passed: `multiple`, listing every matching type.
#[must_use]
pub fn classify(
    sample: &str,
    outcomes: &[TypeOutcome],
    found_targets: Vec<String>,
) -> ClassificationResult {
    let matched: Vec<&TypeOutcome> = outcomes.iter().filter(|o| o.status).collect();
    let matched_types: Vec<String> = matched.iter().map(|o| o.name.clone()).collect();

    let mut seen = HashSet::new();
    let missing_targets: Vec<String> = outcomes
        .iter()
        .flat_map(|o| &o.missing)
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect();

    let (final_type, comment) = match matched.as_slice() {
        [] if found_targets.is_empty() => (
            NO_TYPE.to_string(),
            "A type could not be determined".to_string(),
        ),
        [] => (
            NO_TYPE.to_string(),
            "A type could not be determined, but one or more targets found".to_string(),
        ),
        [only] => (only.name.clone(), only.comment()),
        _ => {
            warn!(
                sample,
                types = %matched_types.join(", "),
                "Sample matched multiple types"
            );
            (
                MULTIPLE_TYPES.to_string(),
                format!(
                    "Found matches for multiple types including: {}",
                    matched_types.join(", ")
                ),
            )
        }
    };

    ClassificationResult {
        sample: sample.to_string(),
        final_type,
        matched_types,
        found_targets,
        missing_targets,
        comment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hit::HitRecord;
    use crate::core::types::{AlleleCall, RegionCoverage};

    fn rule(name: &str, required: &[&str], excludes: &[&str]) -> TypeRule {
        TypeRule {
            name: name.to_string(),
            required: required.iter().map(|s| (*s).to_string()).collect(),
            excludes: excludes.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn verdict(entries: &[(&str, bool)]) -> TargetVerdict {
        entries.iter().map(|(t, p)| ((*t).to_string(), *p)).collect()
    }

    #[test]
    fn test_all_required_present() {
        let outcomes = evaluate_types(
            &[rule("I", &["A", "B"], &["C"])],
            &verdict(&[("A", true), ("B", true), ("C", false)]),
        );
        assert!(outcomes[0].status);
        assert_eq!(outcomes[0].satisfied, vec!["A", "B"]);
        assert!(outcomes[0].missing.is_empty());
        assert_eq!(outcomes[0].comment(), "");
    }

    #[test]
    fn test_excluded_target_fails_type() {
        let outcomes = evaluate_types(
            &[rule("I", &["A", "B"], &["C"])],
            &verdict(&[("A", true), ("B", true), ("C", true)]),
        );
        assert!(!outcomes[0].status);
        assert_eq!(outcomes[0].satisfied, vec!["A", "B"]);
        assert_eq!(
            outcomes[0].comment(),
            "Excluded target C found, failing type I"
        );
    }

    #[test]
    fn test_missing_required_target() {
        let outcomes = evaluate_types(
            &[rule("I", &["A", "B"], &[])],
            &verdict(&[("A", true), ("B", false)]),
        );
        assert!(!outcomes[0].status);
        assert_eq!(outcomes[0].missing, vec!["B"]);
    }

    #[test]
    fn test_allele_presence() {
        let mut alleles = AlleleVerdict::new();
        alleles.insert("gene".to_string(), AlleleCall::none());
        let mut called = AlleleCall::none();
        called.id = "NEW".to_string();
        alleles.insert("other".to_string(), called);

        let presence = allele_presence(&alleles);
        assert_eq!(presence.get("gene"), Some(&false));
        assert_eq!(presence.get("other"), Some(&true));
    }

    fn region(coverage: f64, hits: usize, comments: &[&str]) -> RegionCoverage {
        RegionCoverage {
            coverage,
            hits: (0..hits).map(|_| HitRecord::new("x", "contig_1")).collect(),
            comments: comments.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn test_evaluate_regions() {
        let mut regions = RegionVerdict::new();
        regions.insert(
            "r1".to_string(),
            region(97.5, 2, &["Coverage based on 2 hits"]),
        );
        regions.insert("r2".to_string(), region(100.0, 1, &[]));
        regions.insert("r3".to_string(), region(40.0, 1, &[]));

        let outcomes = evaluate_regions(
            &[
                rule("single", &["r1"], &[]),
                rule("pair", &["r1", "r2"], &[]),
                rule("low", &["r3"], &[]),
            ],
            &regions,
            95.0,
        );

        assert!(outcomes[0].status);
        assert_eq!(outcomes[0].comments, vec!["Coverage based on 2 hits"]);
        assert_eq!(outcomes[0].hit_counts, vec![2]);

        assert!(outcomes[1].status);
        assert_eq!(outcomes[1].coverages, vec![97.5, 100.0]);
        assert_eq!(outcomes[1].comments, vec!["r1: Coverage based on 2 hits"]);

        assert!(!outcomes[2].status);
        assert_eq!(outcomes[2].missing, vec!["r3"]);
        assert!(outcomes[2].coverages.is_empty());
    }

    #[test]
    fn test_region_exclusion() {
        let mut regions = RegionVerdict::new();
        regions.insert("r1".to_string(), region(100.0, 1, &[]));
        regions.insert("r2".to_string(), region(99.0, 1, &[]));
        let outcomes = evaluate_regions(&[rule("I", &["r1"], &["r2"])], &regions, 95.0);
        assert!(!outcomes[0].status);
        assert_eq!(
            outcomes[0].comments,
            vec!["Excluded target r2 found, failing type I"]
        );
    }

    #[test]
    fn test_classify_single_type() {
        let outcomes = evaluate_types(
            &[rule("I", &["A"], &[]), rule("II", &["B"], &[])],
            &verdict(&[("A", true), ("B", false)]),
        );
        let result = classify("sample", &outcomes, vec!["A".to_string()]);
        assert_eq!(result.final_type, "I");
        assert_eq!(result.matched_types, vec!["I"]);
        assert_eq!(result.missing_targets, vec!["B"]);
        assert!(!result.is_ambiguous());
    }

    #[test]
    fn test_classify_collects_missing_targets() {
        let rules = [
            rule("I", &["A", "B", "C"], &[]),
            rule("II", &["C", "D"], &["A"]),
            rule("III", &["A"], &[]),
        ];
        let outcomes = evaluate_types(
            &rules,
            &verdict(&[("A", true), ("B", false), ("C", false), ("D", true)]),
        );
        let result = classify("sample", &outcomes, vec!["A".to_string(), "D".to_string()]);
        assert_eq!(result.final_type, "III");
        assert_eq!(result.found_targets, vec!["A", "D"]);
        // Each absent target listed once, excluded targets never
        assert_eq!(result.missing_targets, vec!["B", "C"]);
    }

    #[test]
    fn test_classify_multiple_types() {
        let outcomes = evaluate_types(
            &[rule("I", &["A"], &[]), rule("II", &["B"], &[])],
            &verdict(&[("A", true), ("B", true)]),
        );
        let result = classify("sample", &outcomes, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(result.final_type, "multiple");
        assert!(result.missing_targets.is_empty());
        assert!(result.is_ambiguous());
        assert!(result.comment.contains('I'));
        assert_eq!(
            result.comment,
            "Found matches for multiple types including: I, II"
        );
    }

    #[test]
    fn test_classify_no_type() {
        let rules = [rule("I", &["A", "B"], &[])];

        let outcomes = evaluate_types(&rules, &verdict(&[("A", false), ("B", false)]));
        let result = classify("sample", &outcomes, Vec::new());
        assert_eq!(result.final_type, "-");
        assert_eq!(result.comment, "A type could not be determined");

        let outcomes = evaluate_types(&rules, &verdict(&[("A", true), ("B", false)]));
        let result = classify("sample", &outcomes, vec!["A".to_string()]);
        assert_eq!(result.final_type, "-");
        assert_eq!(
            result.comment,
            "A type could not be determined, but one or more targets found"
        );
    }
}
