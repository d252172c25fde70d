use std::collections::HashSet;

use tracing::debug;

use crate::core::hit::HitRecord;
use crate::core::types::TargetVerdict;

/// Mark each target present if any hit names it as the query.
///
/// Hits are expected to have been filtered by identity and coverage already
/// (the aligner applies the thresholds), so this is a pure membership check.
pub fn resolve_presence<S: AsRef<str>>(targets: &[S], hits: &[HitRecord]) -> TargetVerdict {
    let queries: HashSet<&str> = hits.iter().map(|h| h.qseqid.as_str()).collect();

    let verdict: TargetVerdict = targets
        .iter()
        .map(|t| {
            let name = t.as_ref();
            (name.to_string(), queries.contains(name))
        })
        .collect();

    debug!(?verdict, "Resolved target presence");
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_presence() {
        let hits = vec![HitRecord::new("A", "contig_1")];
        let verdict = resolve_presence(&["A", "B"], &hits);
        assert_eq!(verdict.get("A"), Some(&true));
        assert_eq!(verdict.get("B"), Some(&false));
    }

    #[test]
    fn test_resolve_presence_no_hits() {
        let verdict = resolve_presence(&["A"], &[]);
        assert_eq!(verdict.get("A"), Some(&false));
    }

    #[test]
    fn test_hits_for_unknown_targets_are_ignored() {
        let hits = vec![HitRecord::new("Z", "contig_1"), HitRecord::new("A", "contig_2")];
        let verdict = resolve_presence(&["A"], &hits);
        assert_eq!(verdict.len(), 1);
        assert_eq!(verdict.get("A"), Some(&true));
    }
}
