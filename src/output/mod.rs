//! Tabular reports: TSV files on disk and text/JSON/TSV on stdout.

pub mod tsv;

pub use tsv::{hits_table, Table};
