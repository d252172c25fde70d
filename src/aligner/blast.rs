use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::aligner::{AlignRequest, Aligner, AlignerError, Alignment};
use crate::core::hit::HitRecord;
use crate::core::types::BlastTool;
use crate::parsing::blast::parse_hits_text;

/// Runs a BLAST+ program with the subject streamed on stdin
#[derive(Debug, Clone)]
pub struct BlastAligner {
    tool: BlastTool,
    executable: PathBuf,
}

impl BlastAligner {
    #[must_use]
    pub fn new(tool: BlastTool) -> Self {
        Self {
            tool,
            executable: PathBuf::from(tool.executable()),
        }
    }

    /// Resolve the tool on `PATH` up front, so a missing install fails before any work.
    ///
    /// # Errors
    ///
    /// Returns `AlignerError::ToolNotFound` if the executable is not on `PATH`.
    pub fn locate(tool: BlastTool) -> Result<Self, AlignerError> {
        let executable = which::which(tool.executable())
            .map_err(|_| AlignerError::ToolNotFound(tool.executable().to_string()))?;
        debug!("Using {}", executable.display());
        Ok(Self { tool, executable })
    }

    /// Use a specific executable instead of looking the tool up on `PATH`
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Command-line arguments for a request
    #[must_use]
    pub fn arguments(&self, request: &AlignRequest<'_>) -> Vec<String> {
        let mut args = vec![
            "-query".to_string(),
            request.query.display().to_string(),
            "-subject".to_string(),
            "-".to_string(),
            "-outfmt".to_string(),
            format!("6 {}", crate::core::hit::HIT_COLUMNS.join(" ")),
        ];
        if request.min_coverage > 0.0 {
            args.push("-qcov_hsp_perc".to_string());
            args.push(request.min_coverage.to_string());
        }
        if request.min_pident > 0.0 && self.tool.supports_perc_identity() {
            args.push("-perc_identity".to_string());
            args.push(request.min_pident.to_string());
        }
        args
    }
}

/// Open a subject file, decompressing `.gz` transparently
fn open_subject(path: &Path) -> io::Result<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    let is_gzipped = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"));
    if is_gzipped {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

impl Aligner for BlastAligner {
    fn align(&self, request: &AlignRequest<'_>) -> Result<Alignment, AlignerError> {
        let args = self.arguments(request);
        let executable = self.executable.display().to_string();
        debug!("Running {executable} {}", args.join(" "));

        // Fail on an unreadable subject before spawning anything
        let mut subject = open_subject(request.subject)?;

        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    AlignerError::ToolNotFound(executable.clone())
                } else {
                    AlignerError::Io(e)
                }
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("aligner stdin was not captured"))?;
        let feeder = std::thread::spawn(move || -> io::Result<()> {
            io::copy(&mut subject, &mut stdin)?;
            stdin.flush()
        });

        let output = child.wait_with_output()?;
        match feeder.join() {
            Ok(Ok(())) => {}
            // The aligner may exit before reading all of stdin; its exit status decides
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(AlignerError::Io(e)),
            Err(_) => return Err(io::Error::other("subject feeder thread panicked").into()),
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(AlignerError::ToolFailed {
                tool: executable,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", self.tool, stderr.trim());
        }

        let hits: Vec<HitRecord> = parse_hits_text(&String::from_utf8_lossy(&output.stdout))?;
        debug!(hits = hits.len(), "{} finished", self.tool);

        Ok(Alignment { hits, stderr })
    }

    fn name(&self) -> &str {
        self.tool.executable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(pident: f64, coverage: f64) -> AlignRequest<'a> {
        AlignRequest {
            query: Path::new("targets.fasta"),
            subject: Path::new("assembly.fna.gz"),
            min_pident: pident,
            min_coverage: coverage,
        }
    }

    #[test]
    fn test_arguments_with_thresholds() {
        let args = BlastAligner::new(BlastTool::Blastn).arguments(&request(95.0, 90.0));
        assert_eq!(&args[..4], &["-query", "targets.fasta", "-subject", "-"]);
        assert!(args[5].starts_with("6 qseqid sseqid pident qcovs"));
        assert!(args.windows(2).any(|w| w == ["-qcov_hsp_perc", "90"]));
        assert!(args.windows(2).any(|w| w == ["-perc_identity", "95"]));
    }

    #[test]
    fn test_arguments_without_thresholds() {
        let args = BlastAligner::new(BlastTool::Blastn).arguments(&request(0.0, 0.0));
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn test_tblastn_skips_perc_identity() {
        let args = BlastAligner::new(BlastTool::Tblastn).arguments(&request(95.0, 90.0));
        assert!(!args.iter().any(|a| a == "-perc_identity"));
        assert!(args.iter().any(|a| a == "-qcov_hsp_perc"));
    }

    #[test]
    fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let subject = dir.path().join("subject.fasta");
        std::fs::write(&subject, ">s\nACGT\n").unwrap();

        let aligner = BlastAligner::new(BlastTool::Blastn)
            .with_executable(dir.path().join("no-such-blastn"));
        let result = aligner.align(&AlignRequest {
            query: &subject,
            subject: &subject,
            min_pident: 0.0,
            min_coverage: 0.0,
        });
        assert!(matches!(result, Err(AlignerError::ToolNotFound(_))));
    }
}
