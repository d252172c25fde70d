//! Input and output path checks shared by the subcommands.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Longest output prefix accepted
pub const MAX_PREFIX_LENGTH: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("File is empty: {0}")]
    EmptyFile(PathBuf),
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("Output file already exists: {0}, use --force to overwrite")]
    OutputExists(PathBuf),
    #[error("Invalid output prefix '{0}': must be a plain file name")]
    InvalidPrefix(String),
}

/// Check that an input file exists and is not empty.
///
/// # Errors
///
/// Returns `ValidationError::FileNotFound` if the path does not name a file,
/// or `ValidationError::EmptyFile` if it has no content.
pub fn validate_file(path: &Path) -> Result<PathBuf, ValidationError> {
    let metadata = std::fs::metadata(path)
        .ok()
        .filter(std::fs::Metadata::is_file)
        .ok_or_else(|| ValidationError::FileNotFound(path.to_path_buf()))?;
    if metadata.len() == 0 {
        return Err(ValidationError::EmptyFile(path.to_path_buf()));
    }
    debug!("Validated input {}", path.display());
    Ok(path.to_path_buf())
}

/// Check that an input directory exists.
///
/// # Errors
///
/// Returns `ValidationError::DirectoryNotFound` if the path is not a directory.
pub fn validate_dir(path: &Path) -> Result<PathBuf, ValidationError> {
    if !path.is_dir() {
        return Err(ValidationError::DirectoryNotFound(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}

/// Refuse to overwrite an existing output unless `force` is set.
///
/// # Errors
///
/// Returns `ValidationError::OutputExists` if the path exists and `force` is false.
pub fn check_output(path: &Path, force: bool) -> Result<(), ValidationError> {
    if path.exists() {
        if !force {
            return Err(ValidationError::OutputExists(path.to_path_buf()));
        }
        debug!("Overwriting existing output {}", path.display());
    }
    Ok(())
}

/// Output prefixes become file names, so separators and traversal are rejected.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPrefix` if the prefix is empty, too long,
/// or contains a path separator, `..`, or a control character.
pub fn validate_prefix(prefix: &str) -> Result<&str, ValidationError> {
    let invalid = prefix.trim().is_empty()
        || prefix.len() > MAX_PREFIX_LENGTH
        || prefix.contains("..")
        || prefix.contains('/')
        || prefix.contains('\\')
        || prefix.chars().any(char::is_control);
    if invalid {
        return Err(ValidationError::InvalidPrefix(prefix.to_string()));
    }
    Ok(prefix)
}

/// `{outdir}/{prefix}{suffix}`
#[must_use]
pub fn output_path(outdir: &Path, prefix: &str, suffix: &str) -> PathBuf {
    outdir.join(format!("{prefix}{suffix}"))
}
