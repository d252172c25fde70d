//! Specificity threshold discovery for schema authors.
//!
//! For every reference, the combined reference set is aligned against that
//! reference's own sequences at decreasing identity/coverage thresholds. The
//! first pair at which a reference from a different family produces a hit is
//! recorded as the failure point for that reference. Looser thresholds are not
//! explored once a failure is found.
//!
//! References are independent of one another and are swept in parallel with
//! rayon. The suggested global thresholds are a max-reduction over all
//! failures, so the merge order does not matter.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::aligner::{AlignRequest, Aligner, AlignerError};
use crate::matching::presence::resolve_presence;

/// Identity and coverage floors plus the step used to walk down to them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub min_identity: u32,
    pub min_coverage: u32,
    pub step: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_identity: 70,
            min_coverage: 70,
            step: 1,
        }
    }
}

impl SweepConfig {
    /// Identity values to visit, from 100 down to the floor
    pub fn identities(&self) -> impl Iterator<Item = u32> {
        descending(self.min_identity, self.step)
    }

    /// Coverage values to visit for each identity, from 100 down to the floor
    pub fn coverages(&self) -> impl Iterator<Item = u32> {
        descending(self.min_coverage, self.step)
    }
}

fn descending(floor: u32, step: u32) -> impl Iterator<Item = u32> {
    let step = step.max(1);
    std::iter::successors(Some(100u32), move |v| v.checked_sub(step))
        .take_while(move |v| *v >= floor)
}

/// A reference and the FASTA holding only its sequences
#[derive(Debug, Clone)]
pub struct SweepReference {
    pub name: String,
    pub subject: PathBuf,
}

/// Where cross-reactivity first showed up for a reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepFailure {
    pub identity: u32,
    pub coverage: u32,
    /// Query ids of every hit at the failing thresholds
    pub hits: Vec<String>,
    /// References from another family among those hits
    pub cross_hits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdFinding {
    pub reference: String,
    pub failure: Option<SweepFailure>,
    pub comment: String,
}

impl ThresholdFinding {
    fn passed(reference: &str, config: &SweepConfig) -> Self {
        Self {
            reference: reference.to_string(),
            failure: None,
            comment: format!(
                "no detection failures for pident>={} and coverage>={}",
                config.min_identity, config.min_coverage
            ),
        }
    }

    fn failed(reference: &str, failure: SweepFailure) -> Self {
        let comment = if failure.identity == 100 || failure.coverage == 100 {
            format!(
                "Suspected overlap or containment with another target: {}",
                failure.cross_hits.join(",")
            )
        } else {
            String::new()
        };
        Self {
            reference: reference.to_string(),
            failure: Some(failure),
            comment,
        }
    }
}

/// Per-reference findings plus the suggested global thresholds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdReport {
    /// One finding per reference, in input order
    pub findings: Vec<ThresholdFinding>,
    /// Highest failing identity below 100, 0 if none
    pub suggested_identity: u32,
    /// Highest failing coverage below 100, 0 if none
    pub suggested_coverage: u32,
}

impl ThresholdReport {
    fn from_findings(findings: Vec<ThresholdFinding>) -> Self {
        let failures = || findings.iter().filter_map(|f| f.failure.as_ref());
        let suggested_identity = failures()
            .map(|f| f.identity)
            .filter(|v| *v != 100)
            .max()
            .unwrap_or(0);
        let suggested_coverage = failures()
            .map(|f| f.coverage)
            .filter(|v| *v != 100)
            .max()
            .unwrap_or(0);
        Self {
            findings,
            suggested_identity,
            suggested_coverage,
        }
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.findings.iter().filter(|f| f.failure.is_some()).count()
    }
}

/// Family of a reference name: everything before the first underscore
#[must_use]
pub fn family(name: &str) -> &str {
    name.split_once('_').map_or(name, |(prefix, _)| prefix)
}

/// Sweep a single reference until the first cross-family hit.
///
/// # Errors
///
/// Returns the first `AlignerError`; nothing is retried.
pub fn explore_reference<A: Aligner + ?Sized>(
    aligner: &A,
    query: &Path,
    reference: &SweepReference,
    names: &[String],
    config: &SweepConfig,
) -> Result<ThresholdFinding, AlignerError> {
    let own_family = family(&reference.name);
    info!("Detecting failure for {}", reference.name);

    for identity in config.identities() {
        for coverage in config.coverages() {
            debug!(
                "Running {} with pident={identity} and coverage={coverage}",
                reference.name
            );
            let alignment = aligner.align(&AlignRequest {
                query,
                subject: &reference.subject,
                min_pident: f64::from(identity),
                min_coverage: f64::from(coverage),
            })?;

            let cross_hits: Vec<String> = resolve_presence(names, &alignment.hits)
                .into_iter()
                .filter(|(name, present)| *present && family(name) != own_family)
                .map(|(name, _)| name)
                .collect();
            if cross_hits.is_empty() {
                continue;
            }

            let hits: Vec<String> = alignment.hits.iter().map(|h| h.qseqid.clone()).collect();
            info!(
                "Detected failure for {} with pident={identity} and coverage={coverage} - {}",
                reference.name,
                hits.join(",")
            );
            return Ok(ThresholdFinding::failed(
                &reference.name,
                SweepFailure {
                    identity,
                    coverage,
                    hits,
                    cross_hits,
                },
            ));
        }
    }

    debug!("No failure detected for {}", reference.name);
    Ok(ThresholdFinding::passed(&reference.name, config))
}

/// Sweep every reference, aligning `query` (all references combined) against
/// each reference's own FASTA.
///
/// Runs on the current rayon pool. Findings keep the order of `references`.
///
/// # Errors
///
/// Returns an `AlignerError` if any aligner invocation fails.
pub fn explore<A: Aligner + ?Sized>(
    aligner: &A,
    query: &Path,
    references: &[SweepReference],
    config: &SweepConfig,
) -> Result<ThresholdReport, AlignerError> {
    let names: Vec<String> = references.iter().map(|r| r.name.clone()).collect();
    let findings = references
        .par_iter()
        .map(|reference| explore_reference(aligner, query, reference, &names, config))
        .collect::<Result<Vec<_>, _>>()?;

    let report = ThresholdReport::from_findings(findings);
    info!(
        "Suggested thresholds for specificity: pident>{} and coverage>{}",
        report.suggested_identity, report.suggested_coverage
    );
    info!("**NOTE** these are suggestions for a starting point");
    Ok(report)
}
