use std::io::Write;
use std::path::Path;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::core::hit::{HitRecord, HIT_COLUMNS};
use crate::parsing::blast::ParseError;

/// A header plus rows of string cells, written as TSV or printed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; missing cells are padded with empty strings
    pub fn push<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        debug_assert!(row.len() <= self.columns.len());
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Write as tab-separated values with a header line.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Csv` if the destination cannot be written.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), ParseError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write to a file, replacing it if present.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the file cannot be created or written.
    pub fn write_tsv(&self, path: &Path) -> Result<(), ParseError> {
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))
    }

    /// Render as aligned plain-text columns
    #[must_use]
    pub fn to_text(&self) -> String {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                self.rows
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(c.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = line(&self.columns);
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "─".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}

/// Serializes as a list of objects keyed by column, in column order
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Row<'a>(&'a [String], &'a [String]);

        impl Serialize for Row<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (column, cell) in self.0.iter().zip(self.1) {
                    map.serialize_entry(column, cell)?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Row(&self.columns, row))?;
        }
        seq.end()
    }
}

/// Table of alignment hits with the `-outfmt 6` columns; header only when empty
#[must_use]
pub fn hits_table(hits: &[HitRecord]) -> Table {
    let mut table = Table::new(HIT_COLUMNS);
    for hit in hits {
        table.push([
            hit.qseqid.clone(),
            hit.sseqid.clone(),
            format_number(hit.pident),
            format_number(hit.qcovs),
            hit.qlen.to_string(),
            hit.slen.to_string(),
            hit.length.to_string(),
            hit.nident.to_string(),
            hit.mismatch.to_string(),
            hit.gapopen.to_string(),
            hit.qstart.to_string(),
            hit.qend.to_string(),
            hit.sstart.to_string(),
            hit.send.to_string(),
            format!("{}", hit.evalue),
            format_number(hit.bitscore),
        ]);
    }
    table
}

/// Integral values print without a fractional part, others at up to 3 places
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let formatted = format!("{value:.3}");
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
