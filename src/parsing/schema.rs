use std::path::Path;

use crate::core::schema::RawSchema;
use crate::parsing::blast::ParseError;

/// Document format of a schema file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Yaml,
    Json,
}

impl SchemaFormat {
    /// Detect from the file extension, defaulting to YAML
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Read a raw schema document from a YAML or JSON file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or `ParseError::Yaml` /
/// `ParseError::Json` if the document does not have the schema structure.
pub fn read_schema_file(path: &Path) -> Result<RawSchema, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_schema_text(&content, SchemaFormat::from_path(path))
}

/// Parse a raw schema document
///
/// # Errors
///
/// Returns `ParseError::Yaml` or `ParseError::Json` if the document does not
/// have the schema structure.
pub fn parse_schema_text(text: &str, format: SchemaFormat) -> Result<RawSchema, ParseError> {
    Ok(match format {
        SchemaFormat::Yaml => serde_yaml::from_str(text)?,
        SchemaFormat::Json => serde_json::from_str(text)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{RuleKind, Schema};
    use crate::core::types::BlastTool;

    const YAML: &str = r#"
metadata:
  id: "sccmec_targets"
  name: "SCCmec Typing Targets"
  description: "Classify SCCmec cassettes"
  version: 1.0
  author: "Staphopia"
engine:
  type: blast
  tool: blastn
  params:
    min_pident: 90
targets:
  - ccrA1
  - ccrB1
  - mecA
aliases:
  - name: "ccr Type 1"
    targets: ["ccrA1", "ccrB1"]
types:
  - name: "I"
    targets:
      - "ccr Type 1"
      - "mecA"
  - name: "ccr only"
    targets: ["ccr Type 1"]
    excludes: ["mecA"]
"#;

    #[test]
    fn test_parse_yaml_schema() {
        let raw = parse_schema_text(YAML, SchemaFormat::Yaml).unwrap();
        assert_eq!(raw.metadata.version, "1.0");
        assert_eq!(raw.engine.params.min_pident, Some(90.0));
        assert_eq!(raw.engine.params.min_coverage, None);

        let schema = Schema::from_raw(raw).unwrap();
        assert_eq!(schema.engine.tool, BlastTool::Blastn);
        assert_eq!(schema.rule_kind, RuleKind::Types);
        assert_eq!(schema.types[0].required, vec!["ccrA1", "ccrB1", "mecA"]);
        assert_eq!(schema.types[1].excludes, vec!["mecA"]);
    }

    #[test]
    fn test_parse_json_schema() {
        let json = r#"{
            "metadata": {"id": "x", "name": "X", "version": "2.1.0"},
            "engine": {"tool": "tblastn"},
            "targets": ["a"],
            "profiles": [{"name": "P", "targets": ["a"]}]
        }"#;
        let raw = parse_schema_text(json, SchemaFormat::Json).unwrap();
        let schema = Schema::from_raw(raw).unwrap();
        assert_eq!(schema.engine.tool, BlastTool::Tblastn);
        assert_eq!(schema.rule_kind, RuleKind::Profiles);
    }

    #[test]
    fn test_numeric_versions_keep_their_form() {
        let text = |version: &str| {
            format!(
                "metadata: {{id: 7, name: X, version: {version}}}\nengine: {{tool: blastn}}\n\
                 targets: [a]\ntypes: [{{name: A, targets: [a]}}]\n"
            )
        };
        for (written, expected) in [
            ("1.0", "1.0"),
            ("2.25", "2.25"),
            ("3", "3"),
            ("'1.0.0'", "1.0.0"),
        ] {
            let raw = parse_schema_text(&text(written), SchemaFormat::Yaml).unwrap();
            assert_eq!(raw.metadata.version, expected);
            assert_eq!(raw.metadata.id, "7");
        }

        let json = r#"{"metadata": {"id": "x", "name": "X", "version": 1.0},
            "engine": {"tool": "blastn"}, "targets": ["a"],
            "types": [{"name": "A", "targets": ["a"]}]}"#;
        let raw = parse_schema_text(json, SchemaFormat::Json).unwrap();
        assert_eq!(raw.metadata.version, "1.0");
    }

    #[test]
    fn test_missing_section() {
        let err = parse_schema_text("metadata: {}\n", SchemaFormat::Yaml).unwrap_err();
        assert!(matches!(err, ParseError::Yaml(_)));
    }

    #[test]
    fn test_schema_load_from_file() {
        use std::io::Write;

        let mut temp = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        temp.write_all(YAML.as_bytes()).unwrap();
        temp.flush().unwrap();
        let schema = Schema::load(temp.path()).unwrap();
        assert_eq!(schema.metadata.id, "sccmec_targets");

        let mut broken = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        broken.write_all(b"{not json").unwrap();
        broken.flush().unwrap();
        let err = Schema::load(broken.path()).unwrap_err();
        assert!(matches!(
            err,
            crate::core::schema::SchemaError::Read(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(SchemaFormat::from_path(Path::new("s.json")), SchemaFormat::Json);
        assert_eq!(SchemaFormat::from_path(Path::new("s.yaml")), SchemaFormat::Yaml);
        assert_eq!(SchemaFormat::from_path(Path::new("s.YML")), SchemaFormat::Yaml);
    }
}
