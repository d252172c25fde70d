//! Readers for the files the engine consumes.
//!
//! - **BLAST tabular output**: `-outfmt 6` rows with the columns of
//!   [`crate::core::hit::HIT_COLUMNS`]
//! - **FASTA**: target lengths and per-reference sequence groups (noodles)
//! - **Schema documents**: YAML or JSON, chosen by extension
//! - **Extraction tables**: target coordinates in FASTA or GenBank references

pub mod blast;
pub mod extract;
pub mod fasta;
pub mod schema;
