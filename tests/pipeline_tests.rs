//! End-to-end classification tests with a stub aligner standing in for BLAST+.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use blast_typer::aligner::{AlignRequest, Aligner, AlignerError, Alignment};
use blast_typer::cli::common::{TypingArgs, TypingRun};
use blast_typer::cli::{alleles, classify, regions};
use blast_typer::core::hit::{HitRecord, HIT_COLUMNS};
use blast_typer::utils::validation::ValidationError;
use tempfile::TempDir;

const SCCMEC_SCHEMA: &str = r#"
metadata:
  id: sccmec_targets
  name: SCCmec Typing Targets
  version: 1.0.0
engine:
  type: blast
  tool: blastn
targets:
  - ccrA1
  - ccrB1
  - ccrA2
  - ccrB2
  - mecA
aliases:
  - name: ccr Type 1
    targets: [ccrA1, ccrB1]
  - name: ccr Type 2
    targets: [ccrA2, ccrB2]
types:
  - name: I
    targets: [ccr Type 1, mecA]
  - name: II
    targets: [ccr Type 2, mecA]
"#;

/// Returns canned hits, filtered the way BLAST+ would filter them
struct StubAligner {
    hits: Vec<HitRecord>,
    requests: Mutex<Vec<(f64, f64)>>,
}

impl StubAligner {
    fn new(hits: Vec<HitRecord>) -> Self {
        Self {
            hits,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl Aligner for StubAligner {
    fn align(&self, request: &AlignRequest<'_>) -> Result<Alignment, AlignerError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.min_pident, request.min_coverage));
        let hits = self
            .hits
            .iter()
            .filter(|h| h.passes(request.min_pident, request.min_coverage))
            .cloned()
            .collect();
        Ok(Alignment {
            hits,
            ..Alignment::default()
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(schema: &str, targets_fasta: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schema.yaml"), schema).unwrap();
        std::fs::write(dir.path().join("targets.fasta"), targets_fasta).unwrap();
        std::fs::write(dir.path().join("sample.fasta"), ">contig_1\nACGTACGTAC\n").unwrap();
        Self { dir }
    }

    fn outdir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn args(&self) -> TypingArgs {
        TypingArgs {
            input: self.dir.path().join("sample.fasta"),
            schema: self.dir.path().join("schema.yaml"),
            targets: self.dir.path().join("targets.fasta"),
            outdir: self.outdir(),
            prefix: "sample01".to_string(),
            min_pident: None,
            min_coverage: None,
            force: false,
        }
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_classify_single_type() {
    let workspace = Workspace::new(SCCMEC_SCHEMA, ">ccrA1\nACGT\n");
    let run = TypingRun::prepare(&workspace.args(), true).unwrap();
    assert_eq!(run.min_pident, 95.0);

    let aligner = StubAligner::new(vec![
        HitRecord::new("ccrA1", "contig_1"),
        HitRecord::new("ccrB1", "contig_1"),
        HitRecord::new("mecA", "contig_2"),
        // Below the default identity, so never reported
        HitRecord::new("ccrA2", "contig_3").with_identity(80.0, 100.0),
    ]);
    let (result, report) = classify::execute(&run, &aligner).unwrap();
    assert_eq!(result.final_type, "I");
    assert_eq!(result.found_targets, vec!["ccrA1", "ccrB1", "mecA"]);
    assert_eq!(result.missing_targets, vec!["ccrA2", "ccrB2"]);
    assert!(result.comment.is_empty());
    assert_eq!(*aligner.requests.lock().unwrap(), vec![(95.0, 95.0)]);

    report.write(&run.outputs).unwrap();
    let summary = read(&workspace.outdir().join("sample01.tsv"));
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(
        lines[0],
        "sample\ttype\ttargets\tschema\tschema_version\tblast_typer_version\tparams\tcomment"
    );
    assert!(lines[1].starts_with("sample01\tI\tccrA1,ccrB1,mecA\tsccmec_targets\t1.0.0\t"));
    assert!(lines[1].contains("min-coverage=95;min-pident=95"));

    let details = read(&workspace.outdir().join("sample01.details.tsv"));
    assert!(details.contains("sample01\tII\tfalse\tmecA\tccrA2,ccrB2\t"));

    let hits = read(&workspace.outdir().join("sample01.blastn.tsv"));
    assert_eq!(hits.lines().count(), 4);
}

#[test]
fn test_classify_without_hits() {
    let workspace = Workspace::new(SCCMEC_SCHEMA, ">ccrA1\nACGT\n");
    let run = TypingRun::prepare(&workspace.args(), true).unwrap();

    let (result, report) = classify::execute(&run, &StubAligner::new(Vec::new())).unwrap();
    assert_eq!(result.final_type, "-");
    assert_eq!(result.comment, "A type could not be determined");

    report.write(&run.outputs).unwrap();
    let hits = read(&workspace.outdir().join("sample01.blastn.tsv"));
    assert_eq!(hits, format!("{}\n", HIT_COLUMNS.join("\t")));
}

#[test]
fn test_classify_multiple_types() {
    let workspace = Workspace::new(SCCMEC_SCHEMA, ">ccrA1\nACGT\n");
    let run = TypingRun::prepare(&workspace.args(), true).unwrap();

    let hits = ["ccrA1", "ccrB1", "ccrA2", "ccrB2", "mecA"]
        .iter()
        .map(|t| HitRecord::new(*t, "contig_1"))
        .collect();
    let (result, _) = classify::execute(&run, &StubAligner::new(hits)).unwrap();
    assert_eq!(result.final_type, "multiple");
    assert_eq!(
        result.comment,
        "Found matches for multiple types including: I, II"
    );
}

#[test]
fn test_existing_outputs_require_force() {
    let workspace = Workspace::new(SCCMEC_SCHEMA, ">ccrA1\nACGT\n");
    let run = TypingRun::prepare(&workspace.args(), true).unwrap();
    let (_, report) = classify::execute(&run, &StubAligner::new(Vec::new())).unwrap();
    report.write(&run.outputs).unwrap();

    let err = TypingRun::prepare(&workspace.args(), true).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::OutputExists(_))
    ));

    let mut args = workspace.args();
    args.force = true;
    assert!(TypingRun::prepare(&args, true).is_ok());
}

#[test]
fn test_schema_params_and_flag_precedence() {
    let schema = SCCMEC_SCHEMA.replace(
        "  tool: blastn\n",
        "  tool: blastn\n  params:\n    min_pident: 90\n    min_coverage: 80\n",
    );
    let workspace = Workspace::new(&schema, ">ccrA1\nACGT\n");

    let run = TypingRun::prepare(&workspace.args(), true).unwrap();
    assert_eq!((run.min_pident, run.min_coverage), (90.0, 80.0));

    let mut args = workspace.args();
    args.min_pident = Some(99.0);
    let run = TypingRun::prepare(&args, true).unwrap();
    assert_eq!((run.min_pident, run.min_coverage), (99.0, 80.0));
    assert_eq!(run.params(), "min-coverage=80;min-pident=99");
}

#[test]
fn test_alleles_known_and_novel() {
    let schema = r#"
metadata: {id: mlst, name: MLST, version: 2}
engine: {tool: blastn}
targets: [arcC, aroE, glpF]
profiles:
  - name: "ST1"
    targets: [arcC, aroE]
"#;
    let workspace = Workspace::new(schema, ">arcC_3\nACGT\n");
    let run = TypingRun::prepare(&workspace.args(), true).unwrap();

    let aligner = StubAligner::new(vec![
        HitRecord::new("arcC_3", "contig_1").with_bitscore(900.0),
        HitRecord::new("aroE_4", "contig_2")
            .with_identity(98.0, 100.0)
            .with_bitscore(850.0),
    ]);
    let (calls, result, report) = alleles::execute(&run, &aligner).unwrap();

    assert_eq!(calls["arcC"].id, "3");
    assert_eq!(calls["aroE"].id, "NEW");
    assert_eq!(calls["glpF"].id, "-");
    assert_eq!(calls["glpF"].comment, "No hits met thresholds");
    assert_eq!(result.final_type, "ST1");

    let columns = report.result.columns();
    assert!(columns.iter().any(|c| c == "arcC_id"));
    assert!(columns.iter().any(|c| c == "glpF_comment"));
    let row = &report.result.rows()[0];
    let arcc = columns.iter().position(|c| c == "arcC_id").unwrap();
    assert_eq!(row[arcc], "3");
    assert_eq!(row[arcc + 1], "100");
}

#[test]
fn test_regions_coverage() {
    let schema = r#"
metadata: {id: regions, name: Regions, version: 1}
engine: {tool: blastn}
targets: [region1, region2]
types:
  - name: "R1"
    targets: [region1]
    excludes: [region2]
"#;
    let region1 = "A".repeat(100);
    let region2 = "C".repeat(50);
    let workspace = Workspace::new(
        schema,
        &format!(">region1\n{region1}\n>region2\n{region2}\n"),
    );
    let mut args = workspace.args();
    args.min_pident = Some(90.0);
    args.min_coverage = Some(90.0);
    let run = TypingRun::prepare(&args, true).unwrap();

    let aligner = StubAligner::new(vec![
        HitRecord::new("region1", "contig_1")
            .with_identity(99.0, 60.0)
            .with_query_range(1, 60),
        HitRecord::new("region1", "contig_1")
            .with_identity(99.0, 60.0)
            .with_query_range(41, 100),
        // Identity below the floor, ignored for coverage
        HitRecord::new("region2", "contig_5")
            .with_identity(70.0, 100.0)
            .with_query_range(1, 50),
    ]);
    let (verdicts, result, report) = regions::execute(&run, &aligner).unwrap();

    // Region mode never passes thresholds to the aligner
    assert_eq!(*aligner.requests.lock().unwrap(), vec![(0.0, 0.0)]);
    assert!((verdicts["region1"].coverage - 100.0).abs() < 1e-9);
    assert!(verdicts["region2"].coverage.abs() < 1e-9);

    assert_eq!(result.final_type, "R1");
    assert_eq!(
        result.comment,
        "Coverage based on 2 hits;There were one or more overlapping hits"
    );
    let row = &report.result.rows()[0];
    assert_eq!(&row[..5], &["sample01", "R1", "region1", "100", "2"]);
}

#[test]
fn test_regions_unreadable_targets_fail_before_alignment() {
    let schema = r#"
metadata: {id: regions, name: Regions, version: 1}
engine: {tool: blastn}
targets: [region1]
types:
  - name: "R1"
    targets: [region1]
"#;
    let workspace = Workspace::new(schema, "no records here\n");
    let run = TypingRun::prepare(&workspace.args(), true).unwrap();

    let aligner = StubAligner::new(vec![HitRecord::new("region1", "contig_1")]);
    let err = regions::execute(&run, &aligner).unwrap_err();
    assert!(err.to_string().contains("Failed to read targets"));
    assert!(aligner.requests.lock().unwrap().is_empty());
}
