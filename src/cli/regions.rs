use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::aligner::{Aligner, BlastAligner};
use crate::cli::common::{
    details_table, emit, join_numbers, TypingArgs, TypingReport, TypingRun, PROVENANCE_COLUMNS,
};
use crate::cli::OutputFormat;
use crate::core::types::{ClassificationResult, RegionVerdict};
use crate::matching::regions::resolve_regions;
use crate::matching::rules::{classify, evaluate_regions};
use crate::output::tsv::{hits_table, Table};
use crate::parsing::fasta::read_sequence_lengths;

#[derive(Args)]
pub struct RegionsArgs {
    #[command(flatten)]
    pub typing: TypingArgs,
}

/// Execute regions subcommand
///
/// # Errors
///
/// Returns an error if inputs are invalid, BLAST fails, or reports cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: RegionsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let run = TypingRun::prepare(&args.typing, true)?;
    let aligner = BlastAligner::locate(run.schema.engine.tool)?;

    let (_, _, report) = execute(&run, &aligner)?;
    report.write(&run.outputs)?;
    emit(&report.result, format)
}

/// Classify a sample by how much of each target region is covered.
///
/// The aligner runs without thresholds. Identity filters hits per region and
/// coverage decides whether a region counts as present.
///
/// # Errors
///
/// Returns an error if the targets FASTA cannot be read or the aligner fails.
pub fn execute<A: Aligner + ?Sized>(
    run: &TypingRun,
    aligner: &A,
) -> anyhow::Result<(RegionVerdict, ClassificationResult, TypingReport)> {
    // Target lengths must be readable before any alignment runs
    let lengths = read_sequence_lengths(&run.targets)
        .with_context(|| format!("Failed to read targets {}", run.targets.display()))?;
    for target in &run.schema.targets {
        if !lengths.contains_key(target) {
            warn!("Schema target {target} not found in {}", run.targets.display());
        }
    }

    let alignment = run.align(aligner, 0.0, 0.0)?;

    info!("Processing hits...");
    let regions = resolve_regions(&lengths, &alignment.hits, run.min_pident);
    let outcomes = evaluate_regions(&run.schema.types, &regions, run.min_coverage);

    let found: Vec<String> = run
        .schema
        .targets
        .iter()
        .filter(|t| {
            regions
                .get(t.as_str())
                .is_some_and(|r| r.coverage >= run.min_coverage)
        })
        .cloned()
        .collect();
    let result = classify(&run.sample, &outcomes, found);
    info!("Final type for {}: {}", result.sample, result.final_type);

    // Targets, coverages and hit counts of every passing type
    let passing: Vec<_> = outcomes.iter().filter(|o| o.status).collect();
    let targets = passing
        .iter()
        .map(|o| o.satisfied.join(","))
        .collect::<Vec<_>>()
        .join(",");
    let coverages = passing
        .iter()
        .map(|o| join_numbers(&o.coverages))
        .collect::<Vec<_>>()
        .join(",");
    let hits = passing
        .iter()
        .flat_map(|o| o.hit_counts.iter().map(ToString::to_string))
        .collect::<Vec<_>>()
        .join(",");

    let mut columns = vec!["sample", "type", "targets", "coverage", "hits"];
    columns.extend(PROVENANCE_COLUMNS);
    columns.push("comment");
    let mut summary = Table::new(columns);
    let mut row = vec![
        result.sample.clone(),
        result.final_type.clone(),
        targets,
        coverages,
        hits,
    ];
    row.extend(run.provenance());
    row.push(result.comment.clone());
    summary.push(row);

    let report = TypingReport {
        result: summary,
        details: Some(details_table(run, &outcomes, true)),
        hits: hits_table(&alignment.hits),
    };
    Ok((regions, result, report))
}
