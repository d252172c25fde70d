//! Evidence resolution and rule evaluation.
//!
//! Alignment hits are turned into per-target verdicts by one of three
//! resolvers, then the schema's type/profile rules are evaluated against them:
//!
//! - [`presence`]: a target is present if any hit names it
//! - [`alleles`]: exact, novel or missing allele calls per target
//! - [`regions`]: percent of each region covered by qualifying hits
//! - [`rules`]: required/excluded targets per type and the final call
//!
//! [`thresholds`] is separate from classification. It repeatedly invokes the
//! aligner to find where references start to cross-match each other.
//!
//! ## Example
//!
//! ```rust
//! use blast_typer::core::hit::HitRecord;
//! use blast_typer::core::schema::TypeRule;
//! use blast_typer::matching::presence::resolve_presence;
//! use blast_typer::matching::rules::{classify, evaluate_types};
//!
//! let rules = vec![TypeRule {
//!     name: "I".to_string(),
//!     required: vec!["ccrA1".to_string(), "mecA".to_string()],
//!     excludes: vec![],
//! }];
//! let hits = vec![HitRecord::new("ccrA1", "contig_1"), HitRecord::new("mecA", "contig_2")];
//!
//! let verdicts = resolve_presence(&["ccrA1", "mecA"], &hits);
//! let outcomes = evaluate_types(&rules, &verdicts);
//! let result = classify("sample", &outcomes, vec!["ccrA1".into(), "mecA".into()]);
//! assert_eq!(result.final_type, "I");
//! ```

pub mod alleles;
pub mod presence;
pub mod regions;
pub mod rules;
pub mod thresholds;
