use std::path::PathBuf;

use clap::Args;
use tracing::{error, info};

use crate::cli::common::emit;
use crate::cli::OutputFormat;
use crate::core::types::BlastTool;
use crate::output::tsv::Table;

#[derive(Args)]
pub struct CheckArgs {
    /// Only check these programs (default: all BLAST+ programs)
    #[arg(short, long, value_enum)]
    pub tool: Vec<BlastTool>,
}

/// Where a program was found, if anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub tool: BlastTool,
    pub path: Option<PathBuf>,
}

impl Dependency {
    #[must_use]
    pub fn locate(tool: BlastTool) -> Self {
        Self {
            tool,
            path: which::which(tool.executable()).ok(),
        }
    }
}

/// Execute check subcommand
///
/// # Errors
///
/// Returns an error if any requested program is missing from `PATH`.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let tools = if args.tool.is_empty() {
        BlastTool::ALL.to_vec()
    } else {
        args.tool
    };

    let dependencies: Vec<Dependency> = tools.into_iter().map(Dependency::locate).collect();
    for dependency in &dependencies {
        match &dependency.path {
            Some(path) => info!("{}: {}", dependency.tool, path.display()),
            None => error!("{}: not found", dependency.tool),
        }
    }
    emit(&dependency_table(&dependencies), format)?;

    let missing: Vec<String> = dependencies
        .iter()
        .filter(|d| d.path.is_none())
        .map(|d| d.tool.to_string())
        .collect();
    if !missing.is_empty() {
        anyhow::bail!(
            "Missing required dependencies: {}, is BLAST+ installed?",
            missing.join(", ")
        );
    }
    Ok(())
}

fn dependency_table(dependencies: &[Dependency]) -> Table {
    let mut table = Table::new(["tool", "status", "path"]);
    for dependency in dependencies {
        let (status, path) = match &dependency.path {
            Some(path) => ("found", path.display().to_string()),
            None => ("missing", String::new()),
        };
        table.push([dependency.tool.to_string(), status.to_string(), path]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_table() {
        let dependencies = vec![
            Dependency {
                tool: BlastTool::Blastn,
                path: Some(PathBuf::from("/usr/bin/blastn")),
            },
            Dependency {
                tool: BlastTool::Tblastn,
                path: None,
            },
        ];
        let table = dependency_table(&dependencies);
        assert_eq!(table.rows()[0], vec!["blastn", "found", "/usr/bin/blastn"]);
        assert_eq!(table.rows()[1], vec!["tblastn", "missing", ""]);
    }
}
