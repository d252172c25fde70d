use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::warn;

use crate::cli::OutputFormat;
use crate::core::schema::Schema;
use crate::output::tsv::Table;
use crate::utils::validation::validate_file;

#[derive(Args)]
pub struct DescribeArgs {
    /// Typing schema (YAML or JSON)
    #[arg(short, long, env = "BLAST_TYPER_SCHEMA")]
    pub schema: PathBuf,
}

/// Execute describe subcommand
///
/// # Errors
///
/// Returns an error if the schema cannot be loaded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DescribeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = validate_file(&args.schema)?;
    let schema = Schema::load(&path)
        .with_context(|| format!("Failed to load schema {}", path.display()))?;

    let used = schema.rule_targets();
    let unused: Vec<&str> = schema
        .targets
        .iter()
        .map(String::as_str)
        .filter(|t| !used.contains(t))
        .collect();
    if !unused.is_empty() {
        warn!(
            "Targets not used by any {}: {}",
            schema.rule_kind,
            unused.join(", ")
        );
    }

    match format {
        OutputFormat::Text => print_text(&schema),
        OutputFormat::Json => print_json(&schema)?,
        OutputFormat::Tsv => rules_table(&schema).write_to(std::io::stdout().lock())?,
    }
    Ok(())
}

fn print_text(schema: &Schema) {
    let metadata = &schema.metadata;
    println!("{} (id: {}, version: {})", metadata.name, metadata.id, metadata.version);
    if let Some(description) = &metadata.description {
        println!("   {description}");
    }
    if let Some(author) = &metadata.author {
        println!("   Author: {author}");
    }

    println!("\nEngine: blast ({})", schema.engine.tool);
    if let Some(pident) = schema.engine.params.min_pident {
        println!("   min_pident: {pident}");
    }
    if let Some(coverage) = schema.engine.params.min_coverage {
        println!("   min_coverage: {coverage}");
    }

    println!("\nTargets ({}):", schema.targets.len());
    for target in &schema.targets {
        println!("   - {target}");
    }

    if !schema.aliases.is_empty() {
        println!("\nAliases ({}):", schema.aliases.len());
        for (name, targets) in &schema.aliases {
            println!("   - {name}: {}", targets.join(", "));
        }
    }

    println!("\n{}s ({}):", capitalize(&schema.rule_kind.to_string()), schema.types.len());
    print!("{}", rules_table(schema).to_text());
}

fn print_json(schema: &Schema) -> anyhow::Result<()> {
    let aliases: serde_json::Map<String, serde_json::Value> = schema
        .aliases
        .iter()
        .map(|(name, targets)| (name.clone(), serde_json::json!(targets)))
        .collect();
    let rules: Vec<serde_json::Value> = schema
        .types
        .iter()
        .map(|rule| {
            serde_json::json!({
                "name": rule.name,
                "targets": rule.required,
                "excludes": rule.excludes,
            })
        })
        .collect();

    let output = serde_json::json!({
        "metadata": schema.metadata,
        "engine": {
            "tool": schema.engine.tool,
            "params": schema.engine.params,
        },
        "targets": schema.targets,
        "aliases": aliases,
        "rule_kind": schema.rule_kind.to_string(),
        "types": rules,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One row per type/profile with its expanded targets and exclusions
fn rules_table(schema: &Schema) -> Table {
    let mut table = Table::new(["name", "targets", "excludes"]);
    for rule in &schema.types {
        table.push([
            rule.name.clone(),
            rule.required.join(","),
            rule.excludes.join(","),
        ]);
    }
    table
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}
