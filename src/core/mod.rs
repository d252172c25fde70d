//! Core data types for schema-driven typing.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`Schema`](schema::Schema): Validated targets, aliases and type/profile rules
//! - [`HitRecord`](hit::HitRecord): A single row of tabular alignment output
//! - [`TargetVerdict`](types::TargetVerdict), [`AlleleVerdict`](types::AlleleVerdict),
//!   [`RegionVerdict`](types::RegionVerdict): Per-target evidence in each classification mode
//! - [`TypeOutcome`](types::TypeOutcome), [`ClassificationResult`](types::ClassificationResult):
//!   Rule evaluation results
//!
//! ## Naming Conventions
//!
//! Schema authors encode structure in sequence names:
//!
//! | Mode   | Target FASTA id | Meaning                         |
//! |--------|-----------------|---------------------------------|
//! | Allele | `gene_3`        | allele `3` of target `gene`     |
//! | Sweep  | `geneA_1`       | member `1` of family `geneA`    |
//!
//! Allele ids are split on the **last** underscore, families on the **first**.

pub mod hit;
pub mod schema;
pub mod types;
