//! FASTA helpers using noodles.
//!
//! - Target lengths for region coverage
//! - Reference sequences grouped by id for the threshold sweep
//! - Single-record references for target extraction
//!
//! Both uncompressed and gzip/bgzip compressed files are supported.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta;
use tracing::debug;

use crate::parsing::blast::ParseError;

/// Residues per line when writing FASTA
const LINE_WIDTH: usize = 80;

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Visit every record of a FASTA file as `(name, sequence)`
fn for_each_record<F>(path: &Path, mut visit: F) -> Result<usize, ParseError>
where
    F: FnMut(String, &[u8]),
{
    let file = File::open(path)?;
    if is_gzipped(path) {
        let reader = BufReader::new(MultiGzDecoder::new(file));
        read_records(&mut fasta::io::Reader::new(reader), &mut visit)
    } else {
        read_records(&mut fasta::io::Reader::new(BufReader::new(file)), &mut visit)
    }
}

fn read_records<R: BufRead, F>(
    reader: &mut fasta::io::Reader<R>,
    visit: &mut F,
) -> Result<usize, ParseError>
where
    F: FnMut(String, &[u8]),
{
    let mut count = 0;
    for result in reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;
        let name = String::from_utf8_lossy(record.name()).to_string();
        visit(name, record.sequence().as_ref());
        count += 1;
    }
    Ok(count)
}

/// Read the length of every sequence in a FASTA file, keyed by id.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles`
/// if parsing fails, or `ParseError::InvalidFormat` if no sequences are found.
pub fn read_sequence_lengths(path: &Path) -> Result<BTreeMap<String, usize>, ParseError> {
    let mut lengths = BTreeMap::new();
    let count = for_each_record(path, |name, sequence| {
        debug!("Processing {name} with length {}", sequence.len());
        lengths.insert(name, sequence.len());
    })?;

    if count == 0 {
        return Err(ParseError::InvalidFormat(format!(
            "No sequences found in FASTA file {}",
            path.display()
        )));
    }
    Ok(lengths)
}

/// Read a FASTA file, grouping sequences that share an id.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles`
/// if parsing fails, or `ParseError::InvalidFormat` if no sequences are found.
pub fn read_reference_groups(path: &Path) -> Result<BTreeMap<String, Vec<Vec<u8>>>, ParseError> {
    let mut groups: BTreeMap<String, Vec<Vec<u8>>> = BTreeMap::new();
    let count = for_each_record(path, |name, sequence| {
        groups.entry(name).or_default().push(sequence.to_vec());
    })?;

    if count == 0 {
        return Err(ParseError::InvalidFormat(format!(
            "No sequences found in FASTA file {}",
            path.display()
        )));
    }
    Ok(groups)
}

/// Read a FASTA file that must hold exactly one record.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles`
/// if parsing fails, or `ParseError::InvalidFormat` unless there is exactly
/// one record.
pub fn read_single_sequence(path: &Path) -> Result<Vec<u8>, ParseError> {
    let mut sequences = Vec::new();
    let count = for_each_record(path, |_, sequence| sequences.push(sequence.to_vec()))?;

    match sequences.pop() {
        Some(sequence) if count == 1 => Ok(sequence),
        _ => Err(ParseError::InvalidFormat(format!(
            "Expected one record in {}, found {count}",
            path.display()
        ))),
    }
}

/// Write sequences under a single id
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be written.
pub fn write_fasta(path: &Path, name: &str, sequences: &[Vec<u8>]) -> Result<(), ParseError> {
    write_records(path, sequences.iter().map(|s| (name, s.as_slice())))
}

/// Write `(definition, sequence)` pairs, wrapping sequence lines
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be written.
pub fn write_records<'a, I, D>(path: &Path, records: I) -> Result<(), ParseError>
where
    I: IntoIterator<Item = (D, &'a [u8])>,
    D: std::fmt::Display,
{
    let mut writer = BufWriter::new(File::create(path)?);
    for (definition, sequence) in records {
        writeln!(writer, ">{definition}")?;
        for line in sequence.chunks(LINE_WIDTH) {
            writer.write_all(line)?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(())
}
