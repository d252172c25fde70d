use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::hit::HitRecord;
use crate::core::schema::SchemaError;

/// Final type reported when more than one type passes for a sample
pub const MULTIPLE_TYPES: &str = "multiple";

/// Final type reported when no type passes for a sample
pub const NO_TYPE: &str = "-";

/// Allele id reported for a qualifying hit that is not an exact match
pub const NOVEL_ALLELE: &str = "NEW";

/// Allele id reported when no hit met the thresholds
pub const NO_ALLELE: &str = "-";

/// BLAST+ program named in a schema's `engine.tool`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BlastTool {
    Blastn,
    Blastp,
    Blastx,
    Tblastn,
    Tblastx,
}

impl BlastTool {
    /// Name of the executable on `PATH`
    #[must_use]
    pub fn executable(self) -> &'static str {
        match self {
            Self::Blastn => "blastn",
            Self::Blastp => "blastp",
            Self::Blastx => "blastx",
            Self::Tblastn => "tblastn",
            Self::Tblastx => "tblastx",
        }
    }

    /// Whether the program accepts `-perc_identity`
    #[must_use]
    pub fn supports_perc_identity(self) -> bool {
        !matches!(self, Self::Tblastn)
    }

    pub const ALL: [BlastTool; 5] = [
        Self::Blastn,
        Self::Blastp,
        Self::Blastx,
        Self::Tblastn,
        Self::Tblastx,
    ];
}

impl std::str::FromStr for BlastTool {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.executable() == s)
            .ok_or_else(|| SchemaError::UnsupportedTool(s.to_string()))
    }
}

impl std::fmt::Display for BlastTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.executable())
    }
}

/// Presence verdicts: target name -> present
pub type TargetVerdict = BTreeMap<String, bool>;

/// Allele verdicts: target name -> called allele
pub type AlleleVerdict = BTreeMap<String, AlleleCall>;

/// Region verdicts: target name -> coverage summary
pub type RegionVerdict = BTreeMap<String, RegionCoverage>;

/// The allele called for a single target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlleleCall {
    /// Allele id, `NEW`, `-`, or comma-joined ids for multiple exact matches
    pub id: String,
    pub pident: f64,
    pub qcovs: f64,
    pub bitscore: f64,
    pub comment: String,
}

impl AlleleCall {
    /// The call for a target with no qualifying hits
    #[must_use]
    pub fn none() -> Self {
        Self {
            id: NO_ALLELE.to_string(),
            pident: 0.0,
            qcovs: 0.0,
            bitscore: 0.0,
            comment: "No hits met thresholds".to_string(),
        }
    }

    /// Whether any allele (known or novel) was called
    #[must_use]
    pub fn is_called(&self) -> bool {
        self.id != NO_ALLELE
    }
}

/// Coverage of a single region-mode target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCoverage {
    /// Percent of bases covered by at least one hit, in [0, 100]
    pub coverage: f64,
    /// Hits that contributed to the coverage
    pub hits: Vec<HitRecord>,
    pub comments: Vec<String>,
}

/// Outcome of evaluating one type/profile rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeOutcome {
    pub name: String,
    pub status: bool,
    /// Required targets that were present
    pub satisfied: Vec<String>,
    /// Required targets that were absent
    pub missing: Vec<String>,
    /// Coverage of each satisfied target (region mode only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coverages: Vec<f64>,
    /// Hit count of each satisfied target (region mode only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hit_counts: Vec<usize>,
    pub comments: Vec<String>,
}

impl TypeOutcome {
    #[must_use]
    pub fn comment(&self) -> String {
        self.comments.join(";")
    }
}

/// Final classification of one sample across all types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub sample: String,
    /// Single passing type, `multiple`, or `-`
    pub final_type: String,
    /// Every type that passed
    pub matched_types: Vec<String>,
    /// Targets found in the sample, in schema order
    pub found_targets: Vec<String>,
    /// Targets some type required but the sample lacked, in rule order
    pub missing_targets: Vec<String>,
    pub comment: String,
}

impl ClassificationResult {
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.final_type == MULTIPLE_TYPES
    }
}
