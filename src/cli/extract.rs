use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::{debug, info};

use crate::cli::common::emit;
use crate::cli::OutputFormat;
use crate::output::tsv::Table;
use crate::parsing::extract::{
    extract_targets, read_extract_table, read_reference, ExtractRow, ExtractedSequence,
    ReferenceFormat,
};
use crate::parsing::fasta::write_records;
use crate::utils::validation::{
    check_output, output_path, validate_dir, validate_file, validate_prefix,
};

#[derive(Args)]
pub struct ExtractArgs {
    /// Directory holding the reference files named in the targets table
    #[arg(short = 'i', long)]
    pub path: PathBuf,

    /// Tab-separated table of target coordinates to extract
    #[arg(short, long)]
    pub targets: PathBuf,

    /// Directory to write one FASTA per target
    #[arg(short, long, default_value = "./blast-typer-extract")]
    pub outdir: PathBuf,

    /// Overwrite existing target files
    #[arg(long)]
    pub force: bool,
}

/// Execute extract subcommand
///
/// # Errors
///
/// Returns an error if an input is missing or malformed, a format is unknown,
/// or a target file cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ExtractArgs, format: OutputFormat) -> anyhow::Result<()> {
    let reference_dir = validate_dir(&args.path)?;
    let table = validate_file(&args.targets)?;

    let rows = read_extract_table(&table)
        .with_context(|| format!("Failed to read targets {}", table.display()))?;
    let references = load_references(&reference_dir, &rows)?;
    let targets = extract_targets(&rows, &references)?;

    let written = write_targets(&targets, &args.outdir, args.force)?;
    info!(
        "Extracted {} sequences for {} targets to {}",
        rows.len(),
        targets.len(),
        args.outdir.display()
    );
    emit(&summary_table(&targets, &written), format)
}

/// Validate and parse each reference file once, in the format of its first row
fn load_references(
    reference_dir: &Path,
    rows: &[ExtractRow],
) -> anyhow::Result<BTreeMap<String, Vec<u8>>> {
    let mut formats: BTreeMap<&str, (PathBuf, &str)> = BTreeMap::new();
    for row in rows {
        if !formats.contains_key(row.file.as_str()) {
            let path = validate_file(&reference_dir.join(&row.file))?;
            debug!("Found file: {}", path.display());
            formats.insert(row.file.as_str(), (path, row.format.as_str()));
        }
    }

    let mut references = BTreeMap::new();
    for (file, (path, format)) in formats {
        let format: ReferenceFormat = format.parse()?;
        let sequence = read_reference(&path, format)
            .with_context(|| format!("Failed to read reference {}", path.display()))?;
        references.insert(file.to_string(), sequence);
    }
    Ok(references)
}

/// Write `{outdir}/{target}.fasta` for every target, returning the paths
fn write_targets(
    targets: &BTreeMap<String, Vec<ExtractedSequence>>,
    outdir: &Path,
    force: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(targets.len());
    for target in targets.keys() {
        let path = output_path(outdir, validate_prefix(target)?, ".fasta");
        check_output(&path, force)?;
        paths.push(path);
    }

    std::fs::create_dir_all(outdir)
        .with_context(|| format!("Failed to create {}", outdir.display()))?;
    for (sequences, path) in targets.values().zip(&paths) {
        debug!("Writing {}", path.display());
        write_records(
            path,
            sequences
                .iter()
                .map(|s| (s.definition.as_str(), s.sequence.as_slice())),
        )
        .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(paths)
}

/// One row per target: sequence count and output file
fn summary_table(
    targets: &BTreeMap<String, Vec<ExtractedSequence>>,
    paths: &[PathBuf],
) -> Table {
    let mut table = Table::new(["target", "sequences", "file"]);
    for ((target, sequences), path) in targets.iter().zip(paths) {
        table.push([
            target.clone(),
            sequences.len().to_string(),
            path.display().to_string(),
        ]);
    }
    table
}
