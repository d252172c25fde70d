//! Allele calling from hits against a catalogue of allele sequences.
//!
//! Allele sequences are named `<target>_<allele>`. A qualifying hit is either
//! an exact match (100% identity and coverage) to a catalogued allele, or a
//! novel variant reported as `NEW`.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::core::hit::HitRecord;
use crate::core::schema::SchemaError;
use crate::core::types::{AlleleCall, AlleleVerdict, NOVEL_ALLELE};

/// Split an allele sequence name on its last underscore into `(target, allele)`.
///
/// Returns `None` when the name has no underscore, or when either side of the
/// split would be empty.
#[must_use]
pub fn split_allele_name(name: &str) -> Option<(&str, &str)> {
    let (target, allele) = name.rsplit_once('_')?;
    if target.is_empty() || allele.is_empty() {
        return None;
    }
    Some((target, allele))
}

#[derive(Default)]
struct Candidates<'a> {
    known: Vec<(&'a str, &'a HitRecord)>,
    novel: Vec<&'a HitRecord>,
}

/// Call an allele for every target from the hits against allele sequences.
///
/// Resolution per target, in order:
///
/// 1. Exact matches: one is reported as-is; several are reported as a
///    comma-joined list of allele ids with comment
///    `"Exact matches to multiple alleles"`.
/// 2. Novel hits: one is reported as `NEW`; several report the highest
///    bit score with comment `"No exact matches to known alleles"`. Ties keep
///    the first hit encountered.
/// 3. Otherwise `-` with zeroed metrics.
///
/// Hits for names outside `targets` are ignored.
///
/// # Errors
///
/// Returns `SchemaError::MalformedAlleleName` if a hit's query id does not
/// follow the `<target>_<allele>` convention.
pub fn resolve_alleles<S: AsRef<str>>(
    targets: &[S],
    hits: &[HitRecord],
    min_pident: f64,
    min_coverage: f64,
) -> Result<AlleleVerdict, SchemaError> {
    let wanted: HashSet<&str> = targets.iter().map(|t| t.as_ref()).collect();
    let mut candidates: HashMap<&str, Candidates<'_>> = HashMap::new();

    for hit in hits {
        let (target, allele) = split_allele_name(&hit.qseqid)
            .ok_or_else(|| SchemaError::MalformedAlleleName(hit.qseqid.clone()))?;

        if !wanted.contains(target) {
            debug!(target, "Ignoring hit for target not in schema");
            continue;
        }
        if !hit.passes(min_pident, min_coverage) {
            continue;
        }

        let entry = candidates.entry(target).or_default();
        if hit.is_exact() {
            entry.known.push((allele, hit));
        } else {
            entry.novel.push(hit);
        }
    }

    let verdict: AlleleVerdict = targets
        .iter()
        .map(|t| {
            let target = t.as_ref();
            let call = candidates
                .get(target)
                .map_or_else(AlleleCall::none, |c| call_allele(target, c));
            (target.to_string(), call)
        })
        .collect();

    debug!(?verdict, "Resolved allele calls");
    Ok(verdict)
}

fn call_allele(target: &str, candidates: &Candidates<'_>) -> AlleleCall {
    match (candidates.known.as_slice(), candidates.novel.as_slice()) {
        ([(allele, hit)], _) => from_hit(allele, hit, ""),
        ([(_, first), ..], _) => {
            let ids: Vec<&str> = candidates.known.iter().map(|(a, _)| *a).collect();
            warn!(target, alleles = %ids.join(","), "Exact matches to multiple alleles");
            from_hit(&ids.join(","), first, "Exact matches to multiple alleles")
        }
        ([], [hit]) => from_hit(NOVEL_ALLELE, hit, ""),
        ([], [first, rest @ ..]) => {
            let best = rest
                .iter()
                .fold(*first, |best, h| if h.bitscore > best.bitscore { *h } else { best });
            from_hit(NOVEL_ALLELE, best, "No exact matches to known alleles")
        }
        ([], []) => AlleleCall::none(),
    }
}

fn from_hit(id: &str, hit: &HitRecord, comment: &str) -> AlleleCall {
    AlleleCall {
        id: id.to_string(),
        pident: hit.pident,
        qcovs: hit.qcovs,
        bitscore: hit.bitscore,
        comment: comment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(name: &str, pident: f64, qcovs: f64, bitscore: f64) -> HitRecord {
        HitRecord::new(name, "contig_1")
            .with_identity(pident, qcovs)
            .with_bitscore(bitscore)
    }

    #[test]
    fn test_split_allele_name() {
        assert_eq!(split_allele_name("gene_3"), Some(("gene", "3")));
        assert_eq!(split_allele_name("spa_t_12"), Some(("spa_t", "12")));
        assert_eq!(split_allele_name("gene"), None);
        assert_eq!(split_allele_name("gene_"), None);
        assert_eq!(split_allele_name("_3"), None);
    }

    #[test]
    fn test_single_exact_match() {
        let hits = vec![hit("gene_3", 100.0, 100.0, 500.0)];
        let verdict = resolve_alleles(&["gene"], &hits, 95.0, 95.0).unwrap();
        let call = &verdict["gene"];
        assert_eq!(call.id, "3");
        assert_eq!(call.comment, "");
        assert!((call.bitscore - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_multiple_exact_matches() {
        let hits = vec![
            hit("gene_3", 100.0, 100.0, 500.0),
            hit("gene_4", 100.0, 100.0, 500.0),
        ];
        let verdict = resolve_alleles(&["gene"], &hits, 95.0, 95.0).unwrap();
        assert_eq!(verdict["gene"].id, "3,4");
        assert_eq!(verdict["gene"].comment, "Exact matches to multiple alleles");
    }

    #[test]
    fn test_single_novel_hit() {
        let hits = vec![hit("gene_3", 98.0, 100.0, 480.0)];
        let verdict = resolve_alleles(&["gene"], &hits, 95.0, 95.0).unwrap();
        assert_eq!(verdict["gene"].id, "NEW");
        assert_eq!(verdict["gene"].comment, "");
        assert!((verdict["gene"].pident - 98.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exact_match_wins_over_novel() {
        let hits = vec![
            hit("gene_1", 97.0, 100.0, 600.0),
            hit("gene_2", 100.0, 100.0, 500.0),
        ];
        let verdict = resolve_alleles(&["gene"], &hits, 95.0, 95.0).unwrap();
        assert_eq!(verdict["gene"].id, "2");
    }

    #[test]
    fn test_multiple_novel_hits_keep_best_bitscore() {
        let hits = vec![
            hit("gene_1", 97.0, 100.0, 400.0),
            hit("gene_2", 98.0, 99.0, 450.0),
            hit("gene_3", 96.0, 100.0, 450.0),
        ];
        let verdict = resolve_alleles(&["gene"], &hits, 95.0, 95.0).unwrap();
        let call = &verdict["gene"];
        assert_eq!(call.id, "NEW");
        assert_eq!(call.comment, "No exact matches to known alleles");
        // First of the tied top scores
        assert!((call.pident - 98.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_qualifying_hits() {
        let hits = vec![hit("gene_1", 90.0, 100.0, 300.0)];
        let verdict = resolve_alleles(&["gene", "other"], &hits, 95.0, 95.0).unwrap();
        assert_eq!(verdict["gene"], AlleleCall::none());
        assert_eq!(verdict["other"], AlleleCall::none());
    }

    #[test]
    fn test_malformed_allele_name() {
        let hits = vec![hit("gene", 100.0, 100.0, 300.0)];
        let err = resolve_alleles(&["gene"], &hits, 95.0, 95.0).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedAlleleName(n) if n == "gene"));
    }
}
