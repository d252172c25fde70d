use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use crate::core::hit::{HitRecord, HIT_COLUMNS, NO_HITS};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid YAML schema: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON schema: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse tab-separated hits with the columns of [`HIT_COLUMNS`], in order.
///
/// A header line starting with `qseqid` is skipped. Rows whose `qseqid` is
/// `NO_HITS` stand for an empty result set and yield no records.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a row has the wrong number of fields
/// or a numeric field cannot be parsed.
pub fn parse_hits_text(text: &str) -> Result<Vec<HitRecord>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());

    let mut hits = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        // Line numbers in errors are 1-based for user friendliness
        let line_num = record.position().map_or(i + 1, |p| p.line() as usize);

        match record.get(0) {
            None | Some("") => continue,
            Some(NO_HITS) => continue,
            Some(first) if i == 0 && first == HIT_COLUMNS[0] => continue,
            Some(_) => {}
        }

        if record.len() != HIT_COLUMNS.len() {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has {} fields, expected {}",
                record.len(),
                HIT_COLUMNS.len()
            )));
        }

        hits.push(parse_record(&record, line_num)?);
    }

    Ok(hits)
}

fn parse_record(record: &StringRecord, line_num: usize) -> Result<HitRecord, ParseError> {
    let text = |i: usize| record[i].trim().to_string();
    let float = |i: usize| -> Result<f64, ParseError> {
        record[i].trim().parse().map_err(|_| invalid(line_num, i, &record[i]))
    };
    let int = |i: usize| -> Result<u64, ParseError> {
        record[i].trim().parse().map_err(|_| invalid(line_num, i, &record[i]))
    };

    Ok(HitRecord {
        qseqid: text(0),
        sseqid: text(1),
        pident: float(2)?,
        qcovs: float(3)?,
        qlen: int(4)?,
        slen: int(5)?,
        length: int(6)?,
        nident: int(7)?,
        mismatch: int(8)?,
        gapopen: int(9)?,
        qstart: int(10)?,
        qend: int(11)?,
        sstart: int(12)?,
        send: int(13)?,
        evalue: float(14)?,
        bitscore: float(15)?,
    })
}

fn invalid(line_num: usize, column: usize, value: &str) -> ParseError {
    ParseError::InvalidFormat(format!(
        "Invalid {} on line {line_num}: '{value}'",
        HIT_COLUMNS[column]
    ))
}
