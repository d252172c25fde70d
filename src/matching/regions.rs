//! Coverage of larger genomic regions assembled from one or more hits.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::core::hit::HitRecord;
use crate::core::types::{RegionCoverage, RegionVerdict};

/// Per-base hit depth over a single target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageProfile {
    depth: Vec<u32>,
}

impl CoverageProfile {
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self {
            depth: vec![0; length],
        }
    }

    /// Add one to every base in the 0-based half-open interval `[start, end)`.
    ///
    /// Intervals running past the end of the target are clipped.
    pub fn add(&mut self, start: usize, end: usize) {
        let end = end.min(self.depth.len());
        if start >= end {
            return;
        }
        for d in &mut self.depth[start..end] {
            *d += 1;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    #[must_use]
    pub fn depth(&self) -> &[u32] {
        &self.depth
    }

    /// Bases covered by at least one hit
    #[must_use]
    pub fn covered_bases(&self) -> usize {
        self.depth.iter().filter(|&&d| d > 0).count()
    }

    /// Whether any base is covered by more than one hit
    #[must_use]
    pub fn has_overlap(&self) -> bool {
        self.depth.iter().any(|&d| d > 1)
    }

    /// Percent of bases covered, 0 for an empty target
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Target lengths are far below 2^52
    pub fn percent_covered(&self) -> f64 {
        if self.depth.is_empty() {
            return 0.0;
        }
        100.0 * self.covered_bases() as f64 / self.depth.len() as f64
    }
}

/// Merge hits into per-target coverage.
///
/// Every hit with identity at or above `min_pident` adds one to each base of
/// its query interval. Hits for sequences missing from `target_lengths` are
/// skipped. The result does not depend on hit order.
#[allow(clippy::implicit_hasher)]
pub fn resolve_regions(
    target_lengths: &BTreeMap<String, usize>,
    hits: &[HitRecord],
    min_pident: f64,
) -> RegionVerdict {
    let mut profiles: BTreeMap<&str, (CoverageProfile, Vec<HitRecord>)> = target_lengths
        .iter()
        .map(|(name, &len)| (name.as_str(), (CoverageProfile::new(len), Vec::new())))
        .collect();

    for hit in hits {
        if hit.pident < min_pident {
            continue;
        }
        let Some((profile, contributing)) = profiles.get_mut(hit.qseqid.as_str()) else {
            warn!(query = %hit.qseqid, "Hit for unknown target, skipping");
            continue;
        };
        let (start, end) = hit.query_interval();
        if end > profile.len() {
            warn!(
                query = %hit.qseqid,
                end,
                length = profile.len(),
                "Hit extends past the end of the target, clipping"
            );
        }
        profile.add(start, end);
        contributing.push(hit.clone());
    }

    let verdict: RegionVerdict = profiles
        .into_iter()
        .map(|(name, (profile, hits))| {
            let mut comments = Vec::new();
            if hits.len() > 1 {
                comments.push(format!("Coverage based on {} hits", hits.len()));
            }
            if profile.has_overlap() {
                comments.push("There were one or more overlapping hits".to_string());
            }
            let coverage = RegionCoverage {
                coverage: profile.percent_covered(),
                hits,
                comments,
            };
            (name.to_string(), coverage)
        })
        .collect();

    debug!(
        coverage = ?verdict.iter().map(|(k, v)| (k.as_str(), v.coverage)).collect::<Vec<_>>(),
        "Resolved region coverage"
    );
    verdict
}
