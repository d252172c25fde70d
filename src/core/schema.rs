//! Typing schema: targets, aliases and the type/profile rules built from them.
//!
//! A schema document is deserialized into [`RawSchema`] and validated once by
//! [`Schema::from_raw`]. Every alias, type and profile reference is expanded to
//! concrete target names at that point, so evaluation code never has to deal
//! with an unknown name.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::types::BlastTool;
use crate::parsing::blast::ParseError;
use crate::parsing::schema::read_schema_file;

/// Only engine family currently understood
pub const SUPPORTED_ENGINE: &str = "blast";

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Target {name} not found in schema (referenced by {context})")]
    TargetNotFound { name: String, context: String },

    #[error("Unsupported engine ('{0}'), only '{SUPPORTED_ENGINE}' is supported")]
    UnsupportedEngine(String),

    #[error("Unsupported tool ('{0}'), expected one of blastn, blastp, blastx, tblastn, tblastx")]
    UnsupportedTool(String),

    #[error("Schema must define either 'types' or 'profiles'")]
    MissingTypes,

    #[error("Schema defines both 'types' and 'profiles'")]
    ConflictingTypes,

    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Alias {0} refers back to itself")]
    AliasCycle(String),

    #[error("Target name '{0}' has no '_<allele>' suffix")]
    MalformedAlleleName(String),

    #[error("Failed to read schema: {0}")]
    Read(#[from] ParseError),
}

/// Descriptive metadata carried through to every output row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Thresholds a schema may suggest for its own targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    #[serde(default)]
    pub min_pident: Option<f64>,
    #[serde(default)]
    pub min_coverage: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEngine {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub tool: String,
    #[serde(default)]
    pub params: EngineParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAlias {
    pub name: String,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRule {
    pub name: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

/// Schema document as written by its author, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct RawSchema {
    pub metadata: SchemaMetadata,
    pub engine: RawEngine,
    pub targets: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<RawAlias>,
    #[serde(default)]
    pub types: Option<Vec<RawRule>>,
    #[serde(default)]
    pub profiles: Option<Vec<RawRule>>,
}

/// Validated alignment engine settings
#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    pub tool: BlastTool,
    pub params: EngineParams,
}

/// Whether rules were declared as `types` or `profiles`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Types,
    Profiles,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Types => write!(f, "type"),
            Self::Profiles => write!(f, "profile"),
        }
    }
}

/// A classification rule with alias references already expanded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRule {
    pub name: String,
    pub required: Vec<String>,
    pub excludes: Vec<String>,
}

/// Named groups of targets, possibly nested
pub type AliasTable = HashMap<String, Vec<String>>;

/// A validated typing schema
#[derive(Debug, Clone)]
pub struct Schema {
    pub metadata: SchemaMetadata,
    pub engine: Engine,
    /// Targets in declaration order
    pub targets: Vec<String>,
    /// Aliases in declaration order, as written
    pub aliases: Vec<(String, Vec<String>)>,
    pub rule_kind: RuleKind,
    pub types: Vec<TypeRule>,
}

impl Schema {
    /// Read and validate a YAML or JSON schema document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Read` if the document cannot be read or parsed,
    /// otherwise the errors of [`Schema::from_raw`].
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let raw = read_schema_file(path)?;
        Self::from_raw(raw)
    }

    /// Validate a raw schema document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the engine or tool is unsupported, a name is
    /// declared twice, neither `types` nor `profiles` is present, or any
    /// alias/type/profile references a name that is neither a target nor an alias.
    pub fn from_raw(raw: RawSchema) -> Result<Self, SchemaError> {
        if let Some(kind) = &raw.engine.kind {
            if kind != SUPPORTED_ENGINE {
                return Err(SchemaError::UnsupportedEngine(kind.clone()));
            }
        }
        let tool: BlastTool = raw.engine.tool.parse()?;

        let mut target_set = HashSet::new();
        for target in &raw.targets {
            if !target_set.insert(target.as_str()) {
                return Err(SchemaError::DuplicateName {
                    kind: "target",
                    name: target.clone(),
                });
            }
        }

        let mut alias_table = AliasTable::new();
        for alias in &raw.aliases {
            if target_set.contains(alias.name.as_str())
                || alias_table
                    .insert(alias.name.clone(), alias.targets.clone())
                    .is_some()
            {
                return Err(SchemaError::DuplicateName {
                    kind: "alias",
                    name: alias.name.clone(),
                });
            }
        }

        // Aliases are checked even when no rule uses them
        for alias in &raw.aliases {
            expand_aliases(&alias.targets, &alias_table, &target_set).map_err(|e| {
                with_context(e, &format!("alias {}", alias.name))
            })?;
        }

        let (rule_kind, rules) = match (raw.types, raw.profiles) {
            (Some(types), None) => (RuleKind::Types, types),
            (None, Some(profiles)) => (RuleKind::Profiles, profiles),
            (None, None) => return Err(SchemaError::MissingTypes),
            (Some(_), Some(_)) => return Err(SchemaError::ConflictingTypes),
        };

        let mut seen = HashSet::new();
        let mut types = Vec::with_capacity(rules.len());
        for rule in rules {
            if !seen.insert(rule.name.clone()) {
                return Err(SchemaError::DuplicateName {
                    kind: "type",
                    name: rule.name,
                });
            }
            let context = format!("{rule_kind} {}", rule.name);
            let required = expand_aliases(&rule.targets, &alias_table, &target_set)
                .map_err(|e| with_context(e, &context))?;
            let excludes = expand_aliases(&rule.excludes, &alias_table, &target_set)
                .map_err(|e| with_context(e, &context))?;
            types.push(TypeRule {
                name: rule.name,
                required,
                excludes,
            });
        }

        debug!(
            targets = raw.targets.len(),
            aliases = raw.aliases.len(),
            rules = types.len(),
            "Validated schema {}",
            raw.metadata.id
        );

        Ok(Self {
            metadata: raw.metadata,
            engine: Engine {
                tool,
                params: raw.engine.params,
            },
            targets: raw.targets,
            aliases: raw
                .aliases
                .into_iter()
                .map(|a| (a.name, a.targets))
                .collect(),
            rule_kind,
            types,
        })
    }

    /// Every target that appears in at least one rule
    #[must_use]
    pub fn rule_targets(&self) -> HashSet<&str> {
        self.types
            .iter()
            .flat_map(|t| t.required.iter().chain(&t.excludes))
            .map(String::as_str)
            .collect()
    }
}

fn with_context(error: SchemaError, context: &str) -> SchemaError {
    match error {
        SchemaError::TargetNotFound { name, .. } => SchemaError::TargetNotFound {
            name,
            context: context.to_string(),
        },
        other => other,
    }
}

/// Expand alias references in `names` to concrete target names.
///
/// Aliases may refer to other aliases. The result has no duplicates and keeps
/// first-encounter order; expanding an already expanded list returns it unchanged.
///
/// # Errors
///
/// Returns `SchemaError::TargetNotFound` if a name is neither a target nor an
/// alias, or `SchemaError::AliasCycle` if aliases refer to each other in a loop.
#[allow(clippy::implicit_hasher)]
pub fn expand_aliases<S: AsRef<str>>(
    names: &[S],
    aliases: &AliasTable,
    targets: &HashSet<&str>,
) -> Result<Vec<String>, SchemaError> {
    let mut expanded = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = Vec::new();
    for name in names {
        expand_one(
            name.as_ref(),
            aliases,
            targets,
            &mut stack,
            &mut seen,
            &mut expanded,
        )?;
    }
    Ok(expanded)
}

fn expand_one(
    name: &str,
    aliases: &AliasTable,
    targets: &HashSet<&str>,
    stack: &mut Vec<String>,
    seen: &mut HashSet<String>,
    expanded: &mut Vec<String>,
) -> Result<(), SchemaError> {
    if let Some(members) = aliases.get(name) {
        if stack.iter().any(|s| s == name) {
            return Err(SchemaError::AliasCycle(name.to_string()));
        }
        stack.push(name.to_string());
        for member in members {
            expand_one(member, aliases, targets, stack, seen, expanded)?;
        }
        stack.pop();
        Ok(())
    } else if targets.contains(name) {
        if seen.insert(name.to_string()) {
            expanded.push(name.to_string());
        }
        Ok(())
    } else {
        Err(SchemaError::TargetNotFound {
            name: name.to_string(),
            context: stack
                .last()
                .map_or_else(|| "rule".to_string(), |a| format!("alias {a}")),
        })
    }
}

/// Accept `version: 1.2` or `id: 42` as well as quoted strings
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Str(s) => s,
        Scalar::Int(i) => i.to_string(),
        // Debug keeps the decimal point, so `1.0` stays `1.0`
        Scalar::Float(f) => format!("{f:?}"),
    })
}
