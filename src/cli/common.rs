use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::aligner::{AlignRequest, Aligner, Alignment};
use crate::cli::OutputFormat;
use crate::core::schema::Schema;
use crate::core::types::TypeOutcome;
use crate::output::tsv::{format_number, Table};
use crate::utils::validation::{check_output, output_path, validate_file, validate_prefix};

/// Identity and coverage used when neither the command line nor the schema sets one
pub const DEFAULT_MIN_PIDENT: f64 = 95.0;
pub const DEFAULT_MIN_COVERAGE: f64 = 95.0;

/// Crate version reported in every output row
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options shared by the classification subcommands
#[derive(Args, Debug, Clone)]
pub struct TypingArgs {
    /// Input assembly in FASTA format (may be gzipped)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Typing schema (YAML or JSON)
    #[arg(short, long, env = "BLAST_TYPER_SCHEMA")]
    pub schema: PathBuf,

    /// Target sequences in FASTA format
    #[arg(short, long, env = "BLAST_TYPER_TARGETS")]
    pub targets: PathBuf,

    /// Directory to write output
    #[arg(short, long, default_value = "./")]
    pub outdir: PathBuf,

    /// Prefix for output files, also used as the sample name
    #[arg(short, long, default_value = "blast-typer")]
    pub prefix: String,

    /// Minimum percent identity to count a hit [default: schema value, else 95]
    #[arg(long, value_parser = parse_percent)]
    pub min_pident: Option<f64>,

    /// Minimum percent coverage to count a hit [default: schema value, else 95]
    #[arg(long, value_parser = parse_percent)]
    pub min_coverage: Option<f64>,

    /// Overwrite existing reports
    #[arg(long)]
    pub force: bool,
}

fn parse_percent(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not between 0 and 100"))
    }
}

/// Report files written by a classification subcommand
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub result: PathBuf,
    pub details: Option<PathBuf>,
    pub hits: PathBuf,
}

impl OutputPaths {
    fn all(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.result.as_path())
            .chain(self.details.as_deref())
            .chain(std::iter::once(self.hits.as_path()))
    }
}

/// Validated inputs for one classification run
#[derive(Debug, Clone)]
pub struct TypingRun {
    pub sample: String,
    pub input: PathBuf,
    pub targets: PathBuf,
    pub schema: Schema,
    pub min_pident: f64,
    pub min_coverage: f64,
    pub outputs: OutputPaths,
}

impl TypingRun {
    /// Validate inputs, load the schema, settle thresholds and claim output paths.
    ///
    /// Thresholds come from the command line, then the schema's `engine.params`,
    /// then the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an input is missing or empty, the schema is invalid,
    /// the prefix is not a plain file name, or an output exists without `--force`.
    pub fn prepare(args: &TypingArgs, with_details: bool) -> anyhow::Result<Self> {
        let input = validate_file(&args.input)?;
        let schema_path = validate_file(&args.schema)?;
        let targets = validate_file(&args.targets)?;
        let prefix = validate_prefix(&args.prefix)?;

        let schema = Schema::load(&schema_path)
            .with_context(|| format!("Failed to load schema {}", schema_path.display()))?;

        let min_pident = args
            .min_pident
            .or(schema.engine.params.min_pident)
            .unwrap_or(DEFAULT_MIN_PIDENT);
        let min_coverage = args
            .min_coverage
            .or(schema.engine.params.min_coverage)
            .unwrap_or(DEFAULT_MIN_COVERAGE);

        std::fs::create_dir_all(&args.outdir).with_context(|| {
            format!("Failed to create output directory {}", args.outdir.display())
        })?;
        let outputs = OutputPaths {
            result: output_path(&args.outdir, prefix, ".tsv"),
            details: with_details.then(|| output_path(&args.outdir, prefix, ".details.tsv")),
            hits: output_path(&args.outdir, prefix, &format!(".{}.tsv", schema.engine.tool)),
        };
        for path in outputs.all() {
            check_output(path, args.force)?;
        }

        info!("Running with the following parameters:");
        info!("    --input {}", input.display());
        info!("    --schema {}", schema_path.display());
        info!("    --targets {}", targets.display());
        info!("    --outdir {}", args.outdir.display());
        info!("    --prefix {prefix}");
        info!("    --min-pident {}", format_number(min_pident));
        info!("    --min-coverage {}", format_number(min_coverage));
        info!("Starting {}...", schema.metadata.name);

        Ok(Self {
            sample: prefix.to_string(),
            input,
            targets,
            schema,
            min_pident,
            min_coverage,
            outputs,
        })
    }

    /// Align the targets (query) against the assembly (subject)
    ///
    /// # Errors
    ///
    /// Returns an error if the aligner fails.
    pub fn align<A: Aligner + ?Sized>(
        &self,
        aligner: &A,
        min_pident: f64,
        min_coverage: f64,
    ) -> anyhow::Result<Alignment> {
        info!("Running {}...", aligner.name());
        let alignment = aligner.align(&AlignRequest {
            query: &self.targets,
            subject: &self.input,
            min_pident,
            min_coverage,
        })?;
        info!("{} returned {} hits", aligner.name(), alignment.hits.len());
        Ok(alignment)
    }

    /// `min-coverage=C;min-pident=P`
    #[must_use]
    pub fn params(&self) -> String {
        format!(
            "min-coverage={};min-pident={}",
            format_number(self.min_coverage),
            format_number(self.min_pident)
        )
    }

    /// Schema id, schema version, crate version and params, in column order
    #[must_use]
    pub fn provenance(&self) -> [String; 4] {
        [
            self.schema.metadata.id.clone(),
            self.schema.metadata.version.clone(),
            VERSION.to_string(),
            self.params(),
        ]
    }
}

/// Column names matching [`TypingRun::provenance`]
pub const PROVENANCE_COLUMNS: [&str; 4] =
    ["schema", "schema_version", "blast_typer_version", "params"];

/// Tables produced by one classification run
#[derive(Debug, Clone)]
pub struct TypingReport {
    pub result: Table,
    pub details: Option<Table>,
    pub hits: Table,
}

impl TypingReport {
    /// Write every table to its output path
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written.
    pub fn write(&self, outputs: &OutputPaths) -> anyhow::Result<()> {
        self.result.write_tsv(&outputs.result)?;
        info!("Final predicted type written to {}", outputs.result.display());
        if let (Some(details), Some(path)) = (&self.details, &outputs.details) {
            details.write_tsv(path)?;
            info!("Results against each type written to {}", path.display());
        }
        self.hits.write_tsv(&outputs.hits)?;
        info!("Alignment results written to {}", outputs.hits.display());
        Ok(())
    }
}

/// One row per type/profile with its status, satisfied and missing targets.
///
/// Region runs add the coverage and hit count of each satisfied target.
#[must_use]
pub fn details_table(run: &TypingRun, outcomes: &[TypeOutcome], with_coverage: bool) -> Table {
    let mut columns = vec!["sample", "type", "status", "targets", "missing"];
    if with_coverage {
        columns.extend(["coverage", "hits"]);
    }
    columns.extend(PROVENANCE_COLUMNS);
    columns.push("comment");

    let mut table = Table::new(columns);
    for outcome in outcomes {
        let mut row = vec![
            run.sample.clone(),
            outcome.name.clone(),
            outcome.status.to_string(),
            outcome.satisfied.join(","),
            outcome.missing.join(","),
        ];
        if with_coverage {
            row.push(join_numbers(&outcome.coverages));
            row.push(
                outcome
                    .hit_counts
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }
        row.extend(run.provenance());
        row.push(outcome.comment());
        table.push(row);
    }
    table
}

/// Print a table to stdout in the requested format
///
/// # Errors
///
/// Returns an error if stdout cannot be written or JSON serialization fails.
pub fn emit(table: &Table, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", table.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(table)?),
        OutputFormat::Tsv => table.write_to(std::io::stdout().lock())?,
    }
    Ok(())
}

/// Join numbers with commas using the report number format
#[must_use]
pub fn join_numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format_number(*v))
        .collect::<Vec<_>>()
        .join(",")
}
