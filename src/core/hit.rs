use serde::{Deserialize, Serialize};

/// Value of every field in the row standing in for an empty alignment result
pub const NO_HITS: &str = "NO_HITS";

/// Tabular (`-outfmt 6`) columns requested from the aligner, in order
pub const HIT_COLUMNS: [&str; 16] = [
    "qseqid", "sseqid", "pident", "qcovs", "qlen", "slen", "length", "nident", "mismatch",
    "gapopen", "qstart", "qend", "sstart", "send", "evalue", "bitscore",
];

/// A single alignment between a query (target) and a subject sequence
///
/// Coordinates are 1-based and inclusive. `qstart` may exceed `qend` for hits
/// reported in reverse orientation; use [`HitRecord::query_interval`] to get
/// the ascending interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    pub qseqid: String,
    pub sseqid: String,
    pub pident: f64,
    pub qcovs: f64,
    pub qlen: u64,
    pub slen: u64,
    pub length: u64,
    pub nident: u64,
    pub mismatch: u64,
    pub gapopen: u64,
    pub qstart: u64,
    pub qend: u64,
    pub sstart: u64,
    pub send: u64,
    pub evalue: f64,
    pub bitscore: f64,
}

impl HitRecord {
    /// Minimal hit for a query, used when only the query id matters
    pub fn new(qseqid: impl Into<String>, sseqid: impl Into<String>) -> Self {
        Self {
            qseqid: qseqid.into(),
            sseqid: sseqid.into(),
            pident: 100.0,
            qcovs: 100.0,
            qlen: 0,
            slen: 0,
            length: 0,
            nident: 0,
            mismatch: 0,
            gapopen: 0,
            qstart: 0,
            qend: 0,
            sstart: 0,
            send: 0,
            evalue: 0.0,
            bitscore: 0.0,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, pident: f64, qcovs: f64) -> Self {
        self.pident = pident;
        self.qcovs = qcovs;
        self
    }

    #[must_use]
    pub fn with_query_range(mut self, qstart: u64, qend: u64) -> Self {
        self.qstart = qstart;
        self.qend = qend;
        self
    }

    #[must_use]
    pub fn with_bitscore(mut self, bitscore: f64) -> Self {
        self.bitscore = bitscore;
        self
    }

    /// Whether the hit meets both an identity and a coverage threshold
    #[must_use]
    pub fn passes(&self, min_pident: f64, min_qcovs: f64) -> bool {
        self.pident >= min_pident && self.qcovs >= min_qcovs
    }

    /// Whether the hit is a perfect, full-length match to its query
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.pident == 100.0 && self.qcovs == 100.0
    }

    /// Query interval as a 0-based half-open range `[start, end)`
    #[must_use]
    pub fn query_interval(&self) -> (usize, usize) {
        let (lo, hi) = if self.qstart <= self.qend {
            (self.qstart, self.qend)
        } else {
            (self.qend, self.qstart)
        };
        let to_usize = |v: u64| usize::try_from(v).unwrap_or(usize::MAX);
        (to_usize(lo.saturating_sub(1)), to_usize(hi))
    }
}
