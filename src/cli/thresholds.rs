use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::aligner::{Aligner, BlastAligner};
use crate::cli::common::emit;
use crate::cli::OutputFormat;
use crate::core::types::BlastTool;
use crate::matching::thresholds::{explore, SweepConfig, SweepReference, ThresholdReport};
use crate::output::tsv::Table;
use crate::parsing::fasta::{read_reference_groups, write_fasta};
use crate::utils::validation::{check_output, output_path, validate_file, validate_prefix};

#[derive(Args)]
pub struct ThresholdsArgs {
    /// Reference sequences in FASTA format
    #[arg(short, long)]
    pub input: PathBuf,

    /// The BLAST+ program to use
    #[arg(short, long, value_enum)]
    pub blast: BlastTool,

    /// Directory to write output
    #[arg(short, long, default_value = "./blast-typer-thresholds")]
    pub outdir: PathBuf,

    /// Prefix to use for output files
    #[arg(short, long, default_value = "blast-typer")]
    pub prefix: String,

    /// Minimum percent identity to test
    #[arg(long, default_value = "70", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub min_pident: u32,

    /// Minimum percent coverage to test
    #[arg(long, default_value = "70", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub min_coverage: u32,

    /// The value to decrease the thresholds by at each step
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub increment: u32,

    /// Number of references to sweep in parallel (default: all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Overwrite existing reports
    #[arg(long)]
    pub force: bool,
}

/// Execute thresholds subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be read, BLAST fails, or the report
/// cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ThresholdsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let input = validate_file(&args.input)?;
    let prefix = validate_prefix(&args.prefix)?;
    let reference_dir = args.outdir.join("reference_seqs");
    std::fs::create_dir_all(&reference_dir)
        .with_context(|| format!("Failed to create {}", reference_dir.display()))?;
    let report_path = output_path(&args.outdir, prefix, ".tsv");
    check_output(&report_path, args.force)?;

    let config = SweepConfig {
        min_identity: args.min_pident,
        min_coverage: args.min_coverage,
        step: args.increment,
    };
    info!("Running with the following parameters:");
    info!("    --input {}", input.display());
    info!("    --blast {}", args.blast);
    info!("    --outdir {}", args.outdir.display());
    info!("    --prefix {prefix}");
    info!("    --min-pident {}", config.min_identity);
    info!("    --min-coverage {}", config.min_coverage);
    info!("    --increment {}", config.step);

    let aligner = BlastAligner::locate(args.blast)?;
    let references = write_references(&input, &reference_dir)?;

    let report = match args.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("Failed to build thread pool")?
            .install(|| sweep(&aligner, &input, &references, &config))?,
        None => sweep(&aligner, &input, &references, &config)?,
    };

    let table = report_table(&report);
    table
        .write_tsv(&report_path)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    info!("Results written to {}", report_path.display());
    emit(&table, format)
}

/// Split the input into one FASTA per reference id, in sorted order
fn write_references(
    input: &Path,
    reference_dir: &Path,
) -> anyhow::Result<Vec<SweepReference>> {
    info!("Gathering sequences from {}...", input.display());
    let groups = read_reference_groups(input)
        .with_context(|| format!("Failed to read references {}", input.display()))?;

    info!("Writing reference sequences to {}...", reference_dir.display());
    let mut references = Vec::with_capacity(groups.len());
    for (name, sequences) in &groups {
        let subject = reference_dir.join(format!("{name}.fasta"));
        write_fasta(&subject, name, sequences)
            .with_context(|| format!("Failed to write {}", subject.display()))?;
        references.push(SweepReference {
            name: name.clone(),
            subject,
        });
    }
    Ok(references)
}

fn sweep<A: Aligner + ?Sized>(
    aligner: &A,
    input: &Path,
    references: &[SweepReference],
    config: &SweepConfig,
) -> anyhow::Result<ThresholdReport> {
    let report = explore(aligner, input, references, config)?;
    info!(
        "{} of {} references failed within the tested range",
        report.failure_count(),
        report.findings.len()
    );
    Ok(report)
}

/// One row per reference: failing identity/coverage or `-`, hits and comment
#[must_use]
pub fn report_table(report: &ThresholdReport) -> Table {
    let mut table = Table::new([
        "reference",
        "pident_failure",
        "coverage_failure",
        "hits",
        "comment",
    ]);
    for finding in &report.findings {
        let (identity, coverage, hits) = match &finding.failure {
            Some(failure) => (
                failure.identity.to_string(),
                failure.coverage.to_string(),
                failure.hits.join(","),
            ),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        table.push([
            finding.reference.clone(),
            identity,
            coverage,
            hits,
            finding.comment.clone(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::thresholds::{SweepFailure, ThresholdFinding};

    #[test]
    fn test_report_table() {
        let report = ThresholdReport {
            findings: vec![
                ThresholdFinding {
                    reference: "geneA_1".to_string(),
                    failure: Some(SweepFailure {
                        identity: 85,
                        coverage: 90,
                        hits: vec!["geneA_1".to_string(), "geneB_1".to_string()],
                        cross_hits: vec!["geneB_1".to_string()],
                    }),
                    comment: String::new(),
                },
                ThresholdFinding {
                    reference: "geneB_1".to_string(),
                    failure: None,
                    comment: "no detection failures for pident>=70 and coverage>=70".to_string(),
                },
            ],
            suggested_identity: 85,
            suggested_coverage: 90,
        };

        let table = report_table(&report);
        assert_eq!(table.rows()[0], vec!["geneA_1", "85", "90", "geneA_1,geneB_1", ""]);
        assert_eq!(table.rows()[1][1], "-");
        assert_eq!(table.rows()[1][3], "-");
    }

    #[test]
    fn test_write_references() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("refs.fasta");
        std::fs::write(&input, ">geneB_1\nTTTT\n>geneA_1\nACGT\n>geneA_1\nGGCC\n").unwrap();
        let reference_dir = dir.path().join("reference_seqs");
        std::fs::create_dir_all(&reference_dir).unwrap();

        let references = write_references(&input, &reference_dir).unwrap();
        let names: Vec<&str> = references.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["geneA_1", "geneB_1"]);
        let written = std::fs::read_to_string(reference_dir.join("geneA_1.fasta")).unwrap();
        assert_eq!(written, ">geneA_1\nACGT\n>geneA_1\nGGCC\n");
    }
}
