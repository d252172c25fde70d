use clap::Args;
use tracing::info;

use crate::aligner::{Aligner, BlastAligner};
use crate::cli::common::{
    details_table, emit, TypingArgs, TypingReport, TypingRun, PROVENANCE_COLUMNS,
};
use crate::cli::OutputFormat;
use crate::core::types::{AlleleVerdict, ClassificationResult};
use crate::matching::alleles::resolve_alleles;
use crate::matching::rules::{allele_presence, classify, evaluate_types};
use crate::output::tsv::{format_number, hits_table, Table};

#[derive(Args)]
pub struct AllelesArgs {
    #[command(flatten)]
    pub typing: TypingArgs,
}

/// Execute alleles subcommand
///
/// # Errors
///
/// Returns an error if inputs are invalid, BLAST fails, a target name has no
/// allele suffix, or reports cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: AllelesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let run = TypingRun::prepare(&args.typing, true)?;
    let aligner = BlastAligner::locate(run.schema.engine.tool)?;

    let (_, _, report) = execute(&run, &aligner)?;
    report.write(&run.outputs)?;
    emit(&report.result, format)
}

/// Call an allele for every schema target, then evaluate the schema's types
/// with "present" meaning any allele was called.
///
/// # Errors
///
/// Returns an error if the aligner fails or a hit name has no allele suffix.
pub fn execute<A: Aligner + ?Sized>(
    run: &TypingRun,
    aligner: &A,
) -> anyhow::Result<(AlleleVerdict, ClassificationResult, TypingReport)> {
    let alignment = run.align(aligner, run.min_pident, run.min_coverage)?;

    info!("Processing hits...");
    let alleles = resolve_alleles(
        &run.schema.targets,
        &alignment.hits,
        run.min_pident,
        run.min_coverage,
    )?;

    let presence = allele_presence(&alleles);
    let found: Vec<String> = run
        .schema
        .targets
        .iter()
        .filter(|t| presence.get(t.as_str()).copied().unwrap_or(false))
        .cloned()
        .collect();
    let outcomes = evaluate_types(&run.schema.types, &presence);
    let result = classify(&run.sample, &outcomes, found);

    let mut columns: Vec<String> = vec!["sample".to_string(), "type".to_string()];
    columns.extend(PROVENANCE_COLUMNS.iter().map(ToString::to_string));
    let mut row = vec![run.sample.clone(), result.final_type.clone()];
    row.extend(run.provenance());

    for target in &run.schema.targets {
        let Some(call) = alleles.get(target) else {
            continue;
        };
        info!("{target}: {}", call.id);
        columns.extend(
            ["id", "pident", "qcovs", "bitscore", "comment"]
                .iter()
                .map(|field| format!("{target}_{field}")),
        );
        row.extend([
            call.id.clone(),
            format_number(call.pident),
            format_number(call.qcovs),
            format_number(call.bitscore),
            call.comment.clone(),
        ]);
    }
    columns.push("comment".to_string());
    row.push(result.comment.clone());

    let mut summary = Table::new(columns);
    summary.push(row);

    let report = TypingReport {
        result: summary,
        details: Some(details_table(run, &outcomes, false)),
        hits: hits_table(&alignment.hits),
    };
    Ok((alleles, result, report))
}
