//! Boundary to the external sequence aligner.
//!
//! The engine never aligns sequences itself. An [`Aligner`] takes a query
//! FASTA and a subject FASTA plus optional thresholds and returns parsed hit
//! records. [`blast::BlastAligner`] shells out to BLAST+; tests substitute
//! their own implementations.

use std::path::Path;

use thiserror::Error;

use crate::core::hit::HitRecord;
use crate::parsing::blast::ParseError;

pub mod blast;

pub use blast::BlastAligner;

#[derive(Error, Debug)]
pub enum AlignerError {
    #[error("{0} not found on PATH, is BLAST+ installed?")]
    ToolNotFound(String),

    #[error("IO error while running aligner: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Could not parse aligner output: {0}")]
    Parse(#[from] ParseError),
}

/// One aligner invocation
#[derive(Debug, Clone, Copy)]
pub struct AlignRequest<'a> {
    /// Sequences whose ids appear as `qseqid`
    pub query: &'a Path,
    /// Sequences searched against, optionally gzip-compressed
    pub subject: &'a Path,
    /// Minimum percent identity, 0 to disable
    pub min_pident: f64,
    /// Minimum percent query coverage per HSP, 0 to disable
    pub min_coverage: f64,
}

/// Hits from one invocation
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    pub hits: Vec<HitRecord>,
    /// Anything the aligner wrote to stderr, e.g. warnings
    pub stderr: String,
}

/// Anything that can produce alignment hits for a query/subject pair
pub trait Aligner: Sync {
    /// Run one alignment.
    ///
    /// # Errors
    ///
    /// Returns `AlignerError` if the aligner cannot be run, exits unsuccessfully,
    /// or produces output that cannot be parsed. Failures are never retried.
    fn align(&self, request: &AlignRequest<'_>) -> Result<Alignment, AlignerError>;

    /// Short name used in output file names and logs
    fn name(&self) -> &str;
}
