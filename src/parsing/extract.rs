//! Target extraction from annotated reference sequences.
//!
//! A tab-separated table names, for every target sequence, the reference file
//! it comes from and its 1-based inclusive coordinates:
//!
//! ```text
//! target  file            format  start  stop   strand  accession    type
//! mecA    N315.fasta      fasta   34127  36133  -       NC_002745.2  II
//! ```
//!
//! Rows on the `-` strand are reverse complemented. Rows for the same target
//! are collected into one FASTA with definitions `{target} {accession}|{type}`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::debug;

use crate::parsing::blast::ParseError;
use crate::parsing::fasta::read_single_sequence;

/// Column names of the extraction table, in order
pub const EXTRACT_COLUMNS: [&str; 8] = [
    "target",
    "file",
    "format",
    "start",
    "stop",
    "strand",
    "accession",
    "type",
];

/// One row of the extraction table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractRow {
    pub target: String,
    pub file: String,
    pub format: String,
    pub start: usize,
    pub stop: usize,
    pub strand: String,
    pub accession: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ExtractRow {
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.strand == "-"
    }

    /// FASTA definition line for the extracted sequence
    #[must_use]
    pub fn definition(&self) -> String {
        format!("{} {}|{}", self.target, self.accession, self.kind)
    }
}

/// Reference file formats accepted by extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFormat {
    Fasta,
    Genbank,
}

impl FromStr for ReferenceFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fasta" => Ok(Self::Fasta),
            "genbank" => Ok(Self::Genbank),
            _ => Err(ParseError::InvalidFormat(format!("Unknown format: {s}"))),
        }
    }
}

impl fmt::Display for ReferenceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fasta => write!(f, "fasta"),
            Self::Genbank => write!(f, "genbank"),
        }
    }
}

/// A target sequence cut from its reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSequence {
    pub definition: String,
    pub sequence: Vec<u8>,
}

/// Read the extraction table. A header row with [`EXTRACT_COLUMNS`] is required.
///
/// # Errors
///
/// Returns `ParseError::Csv` if the table cannot be read or a row does not
/// match the expected columns.
pub fn read_extract_table(path: &Path) -> Result<Vec<ExtractRow>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_path(path)?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<ExtractRow>, csv::Error>>()?;
    if rows.is_empty() {
        return Err(ParseError::InvalidFormat(format!(
            "No targets found in {}",
            path.display()
        )));
    }
    debug!("Read {} extraction rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read the single sequence of a reference file.
///
/// # Errors
///
/// Returns `ParseError` if the file cannot be read or does not hold exactly
/// one record.
pub fn read_reference(path: &Path, format: ReferenceFormat) -> Result<Vec<u8>, ParseError> {
    debug!("Parsing {} as {format}", path.display());
    match format {
        ReferenceFormat::Fasta => read_single_sequence(path),
        ReferenceFormat::Genbank => {
            let mut records = gb_io::reader::parse_file(path).map_err(|e| {
                ParseError::InvalidFormat(format!(
                    "Failed to parse GenBank {}: {e}",
                    path.display()
                ))
            })?;
            let count = records.len();
            match records.pop() {
                Some(record) if count == 1 => Ok(record.seq),
                _ => Err(ParseError::InvalidFormat(format!(
                    "Expected one record in {}, found {count}",
                    path.display()
                ))),
            }
        }
    }
}

/// Complement of a nucleotide, IUPAC ambiguity codes included. Case is kept
/// and unknown symbols pass through.
#[must_use]
pub fn complement(base: u8) -> u8 {
    let upper = match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'T' | b'U' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        other => other,
    };
    if base.is_ascii_lowercase() {
        upper.to_ascii_lowercase()
    } else {
        upper
    }
}

#[must_use]
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().rev().map(|&b| complement(b)).collect()
}

/// Cut `start..=stop` (1-based) from a reference, reverse complementing
/// `-` strand rows.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if the coordinates are empty or run
/// past the end of the reference.
pub fn slice_target(row: &ExtractRow, reference: &[u8]) -> Result<Vec<u8>, ParseError> {
    if row.start == 0 || row.stop < row.start || row.stop > reference.len() {
        return Err(ParseError::InvalidFormat(format!(
            "Invalid coordinates {}:{} for {} in {} (length {})",
            row.start,
            row.stop,
            row.target,
            row.file,
            reference.len()
        )));
    }

    let slice = &reference[row.start - 1..row.stop];
    Ok(if row.is_reverse() {
        reverse_complement(slice)
    } else {
        slice.to_vec()
    })
}

/// Slice every row from its reference, grouped by target in table order.
///
/// `references` maps each row's `file` to its sequence.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a row names a file missing from
/// `references` or has invalid coordinates.
pub fn extract_targets(
    rows: &[ExtractRow],
    references: &BTreeMap<String, Vec<u8>>,
) -> Result<BTreeMap<String, Vec<ExtractedSequence>>, ParseError> {
    let mut targets: BTreeMap<String, Vec<ExtractedSequence>> = BTreeMap::new();
    for row in rows {
        let reference = references.get(&row.file).ok_or_else(|| {
            ParseError::InvalidFormat(format!("No sequence loaded for {}", row.file))
        })?;
        debug!(
            "Extracting {} from {} ({}:{})",
            row.target, row.file, row.start, row.stop
        );
        targets
            .entry(row.target.clone())
            .or_default()
            .push(ExtractedSequence {
                definition: row.definition(),
                sequence: slice_target(row, reference)?,
            });
    }
    Ok(targets)
}
