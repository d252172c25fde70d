//! Command-line interface for blast-typer.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **classify**: Type an assembly by target presence
//! - **alleles**: Call known or novel alleles for each target
//! - **regions**: Type an assembly by coverage of larger regions
//! - **thresholds**: Find identity/coverage thresholds where references cross-match
//! - **extract**: Cut target sequences out of annotated references
//! - **describe**: Summarize a schema
//! - **check**: Verify the BLAST+ executables are available
//!
//! ## Usage
//!
//! ```text
//! # Classify an assembly
//! blast-typer classify -i sample.fna.gz -s sccmec.yaml -t sccmec.fasta -p sample
//!
//! # Allele calls as JSON
//! blast-typer --format json alleles -i sample.fna -s mlst.yaml -t mlst.fasta
//!
//! # Suggest thresholds for a new target set
//! blast-typer thresholds -i references.fasta --blast blastn --threads 8
//!
//! # Build one FASTA per target from reference coordinates
//! blast-typer extract -i references/ -t targets.tsv -o sccmec-targets
//! ```

use clap::{Parser, Subcommand};

pub mod alleles;
pub mod check;
pub mod classify;
pub mod common;
pub mod describe;
pub mod extract;
pub mod regions;
pub mod thresholds;

#[derive(Parser)]
#[command(name = "blast-typer")]
#[command(version)]
#[command(about = "Classify assemblies against a typing schema using BLAST")]
#[command(
    long_about = "blast-typer classifies assemblies against a declarative schema of targets, aliases and types.\n\nBLAST+ provides the alignment evidence, which is resolved as:\n- Target presence\n- Known or novel alleles\n- Coverage of larger regions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "silent")]
    pub verbose: bool,

    /// Only print errors
    #[arg(long, global = true)]
    pub silent: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify an assembly by the presence of targets
    Classify(classify::ClassifyArgs),

    /// Call alleles for each target
    Alleles(alleles::AllelesArgs),

    /// Classify an assembly by coverage of target regions
    Regions(regions::RegionsArgs),

    /// Determine specificity thresholds for a set of reference sequences
    Thresholds(thresholds::ThresholdsArgs),

    /// Extract typing targets from a set of reference sequences
    Extract(extract::ExtractArgs),

    /// Describe the contents of a schema
    Describe(describe::DescribeArgs),

    /// Check that BLAST+ executables are available
    Check(check::CheckArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
