use clap::Args;
use tracing::info;

use crate::aligner::{Aligner, BlastAligner};
use crate::cli::common::{
    details_table, emit, TypingArgs, TypingReport, TypingRun, PROVENANCE_COLUMNS,
};
use crate::cli::OutputFormat;
use crate::core::types::ClassificationResult;
use crate::matching::presence::resolve_presence;
use crate::matching::rules::{classify, evaluate_types};
use crate::output::tsv::{hits_table, Table};

#[derive(Args)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub typing: TypingArgs,
}

/// Execute classify subcommand
///
/// # Errors
///
/// Returns an error if inputs are invalid, BLAST fails, or reports cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ClassifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let run = TypingRun::prepare(&args.typing, true)?;
    let aligner = BlastAligner::locate(run.schema.engine.tool)?;

    let (_, report) = execute(&run, &aligner)?;
    report.write(&run.outputs)?;
    emit(&report.result, format)
}

/// Classify a sample by target presence.
///
/// The aligner applies the identity/coverage thresholds, so every returned hit
/// counts towards presence.
///
/// # Errors
///
/// Returns an error if the aligner fails.
pub fn execute<A: Aligner + ?Sized>(
    run: &TypingRun,
    aligner: &A,
) -> anyhow::Result<(ClassificationResult, TypingReport)> {
    let alignment = run.align(aligner, run.min_pident, run.min_coverage)?;

    info!("Processing hits...");
    let verdicts = resolve_presence(&run.schema.targets, &alignment.hits);
    let found: Vec<String> = run
        .schema
        .targets
        .iter()
        .filter(|t| verdicts.get(t.as_str()).copied().unwrap_or(false))
        .cloned()
        .collect();

    let outcomes = evaluate_types(&run.schema.types, &verdicts);
    let result = classify(&run.sample, &outcomes, found);
    info!("Final type for {}: {}", result.sample, result.final_type);

    let mut columns = vec!["sample", "type", "targets"];
    columns.extend(PROVENANCE_COLUMNS);
    columns.push("comment");
    let mut summary = Table::new(columns);
    let mut row = vec![
        result.sample.clone(),
        result.final_type.clone(),
        result.found_targets.join(","),
    ];
    row.extend(run.provenance());
    row.push(result.comment.clone());
    summary.push(row);

    let report = TypingReport {
        result: summary,
        details: Some(details_table(run, &outcomes, false)),
        hits: hits_table(&alignment.hits),
    };
    Ok((result, report))
}
