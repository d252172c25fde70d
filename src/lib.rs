//! # blast-typer
//!
//! A library for classifying assemblies against a declarative typing schema
//! using BLAST+ alignment evidence.
//!
//! A schema names a set of sequence targets, optional aliases that group them,
//! and types (or profiles) that require some targets and exclude others. The
//! targets are aligned against an assembly and the hits are resolved into
//! per-target verdicts in one of three ways:
//!
//! - **Presence**: a target is present if any hit names it
//! - **Alleles**: exact matches report the allele id, other qualifying hits `NEW`
//! - **Regions**: per-base coverage of larger regions assembled from many hits
//!
//! The verdicts are evaluated against every type and collapsed into a single
//! call, `multiple`, or `-`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use blast_typer::aligner::{AlignRequest, Aligner, BlastAligner};
//! use blast_typer::core::schema::Schema;
//! use blast_typer::matching::presence::resolve_presence;
//! use blast_typer::matching::rules::{classify, evaluate_types};
//!
//! let schema = Schema::load(Path::new("sccmec.yaml")).unwrap();
//! let aligner = BlastAligner::locate(schema.engine.tool).unwrap();
//! let alignment = aligner
//!     .align(&AlignRequest {
//!         query: Path::new("sccmec.fasta"),
//!         subject: Path::new("sample.fna.gz"),
//!         min_pident: 95.0,
//!         min_coverage: 95.0,
//!     })
//!     .unwrap();
//!
//! let verdicts = resolve_presence(&schema.targets, &alignment.hits);
//! let outcomes = evaluate_types(&schema.types, &verdicts);
//! let found = verdicts.iter().filter(|(_, p)| **p).map(|(t, _)| t.clone()).collect();
//! let result = classify("sample", &outcomes, found);
//! println!("{}: {}", result.final_type, result.comment);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Schema model, hit records and verdict types
//! - [`matching`]: Hit resolvers, rule evaluation and the threshold sweep
//! - [`aligner`]: Boundary to BLAST+
//! - [`parsing`]: BLAST tabular output, FASTA, schema documents and extraction tables
//! - [`output`]: Tabular reports
//! - [`cli`]: Command-line interface implementation

pub mod aligner;
pub mod cli;
pub mod core;
pub mod matching;
pub mod output;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use aligner::{AlignRequest, Aligner, AlignerError, BlastAligner};
pub use core::hit::HitRecord;
pub use core::schema::{Schema, SchemaError};
pub use core::types::*;
