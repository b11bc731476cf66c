//! Cross validation of declared and scanned chunks
//!
//! The preamble and the body each describe the document's chunks. The validator
//! reconciles the two under a consistency mode:
//!
//! - permissive (default): undeclared body chunks are fine and simply carry no metadata
//! - strict: every body chunk needs a declaration
//!
//! The checks live in a rule table (see [`rules`]). After the rules ran, each body chunk
//! is paired with the declaration that may be trusted for it:
//!
//! - the first declaration wins when an id is declared more than once
//! - a declaration whose id fails the identifier grammar still pairs with its chunk, but
//!   its metadata is withheld
//! - dependencies on undeclared or untrusted ids are dropped from the pairing; cycles
//!   are reported and left alone

pub mod graph;
pub mod rules;

use crate::ctxfst::ast::identifier::is_valid_identifier;
use crate::ctxfst::ast::{DeclaredChunk, DiagnosticSeverity, Diagnostics, Field, ScannedChunk};
use rules::RuleContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    Strict,
    #[default]
    Permissive,
}

/// How declarations without a body chunk are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanSeverity {
    Error,
    #[default]
    Warning,
    Info,
    Ignore,
}

impl OrphanSeverity {
    /// `None` means orphans are not reported
    pub fn severity(self) -> Option<DiagnosticSeverity> {
        match self {
            OrphanSeverity::Error => Some(DiagnosticSeverity::Error),
            OrphanSeverity::Warning => Some(DiagnosticSeverity::Warning),
            OrphanSeverity::Info => Some(DiagnosticSeverity::Information),
            OrphanSeverity::Ignore => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationOptions {
    pub mode: ConsistencyMode,
    pub orphan_severity: OrphanSeverity,
}

/// A body chunk and the declaration trusted for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPair {
    pub declaration: Option<DeclaredChunk>,
    pub scanned: ScannedChunk,
}

/// Run the rule table and pair chunks with their declarations
///
/// Keyed by chunk id. When an id appears more than once in the body, its first
/// occurrence is kept; the duplicate is already a structural diagnostic.
pub fn validate(
    declared: &[DeclaredChunk],
    scanned: &[ScannedChunk],
    options: &ValidationOptions,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<String, ValidatedPair> {
    let context = RuleContext::new(declared, scanned, options);
    rules::run_all(&context, diagnostics);

    let mut pairs = BTreeMap::new();
    for chunk in scanned {
        if pairs.contains_key(&chunk.id) {
            continue;
        }
        let declaration = context
            .declaration(&chunk.id)
            .filter(|declaration| is_valid_identifier(&declaration.id))
            .map(|declaration| trusted_declaration(declaration, &context));
        pairs.insert(
            chunk.id.clone(),
            ValidatedPair {
                declaration,
                scanned: chunk.clone(),
            },
        );
    }

    tracing::debug!(
        pairs = pairs.len(),
        declared = declared.len(),
        "validated chunks"
    );
    pairs
}

/// Copy of a declaration with dependencies narrowed to trusted ids
fn trusted_declaration(declaration: &DeclaredChunk, context: &RuleContext<'_>) -> DeclaredChunk {
    let mut trusted = declaration.clone();
    if let Field::Valid(dependencies) = &declaration.dependencies {
        trusted.dependencies = Field::Valid(
            dependencies
                .iter()
                .filter(|target| context.is_trusted(target))
                .cloned()
                .collect(),
        );
    }
    trusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctxfst::ast::DiagnosticKind;

    fn chunk(id: &str, start: usize) -> ScannedChunk {
        ScannedChunk::new(id, "content", start..start + 10)
    }

    #[test]
    fn test_pairs_declared_and_undeclared() {
        let declared = vec![DeclaredChunk::new("a:b").with_context("A")];
        let scanned = vec![chunk("a:b", 0), chunk("c:d", 20)];
        let mut diagnostics = Diagnostics::new();

        let pairs = validate(&declared, &scanned, &Default::default(), &mut diagnostics);

        assert!(diagnostics.is_empty());
        assert!(pairs["a:b"].declaration.is_some());
        assert!(pairs["c:d"].declaration.is_none());
    }

    #[test]
    fn test_first_declaration_wins() {
        let declared = vec![
            DeclaredChunk::new("skill:python").with_context("first"),
            DeclaredChunk::new("skill:python").with_context("second"),
        ];
        let scanned = vec![chunk("skill:python", 0)];
        let mut diagnostics = Diagnostics::new();

        let pairs = validate(&declared, &scanned, &Default::default(), &mut diagnostics);

        let declaration = pairs["skill:python"].declaration.as_ref().unwrap();
        assert_eq!(declaration.context, Field::Valid("first".to_string()));
        assert_eq!(
            diagnostics.of_kind(DiagnosticKind::DuplicateDeclaration).count(),
            1
        );
    }

    #[test]
    fn test_invalid_identifier_withholds_metadata() {
        let declared = vec![DeclaredChunk::new("skill:Go").with_tags(["Go"])];
        let scanned = vec![chunk("skill:Go", 0)];
        let mut diagnostics = Diagnostics::new();

        let pairs = validate(&declared, &scanned, &Default::default(), &mut diagnostics);

        assert!(pairs["skill:Go"].declaration.is_none());
        let kinds: Vec<_> = diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::InvalidIdentifierFormat]);
    }

    #[test]
    fn test_invalid_identifier_is_not_undeclared_in_strict_mode() {
        let declared = vec![DeclaredChunk::new("skill:Go")];
        let scanned = vec![chunk("skill:Go", 0)];
        let options = ValidationOptions {
            mode: ConsistencyMode::Strict,
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        validate(&declared, &scanned, &options, &mut diagnostics);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::UndeclaredChunk).count(), 0);
    }

    #[test]
    fn test_dangling_dependencies_are_dropped() {
        let declared = vec![
            DeclaredChunk::new("a:b").with_dependencies(["c:d", "x:y"]),
            DeclaredChunk::new("c:d"),
        ];
        let scanned = vec![chunk("a:b", 0), chunk("c:d", 20)];
        let mut diagnostics = Diagnostics::new();

        let pairs = validate(&declared, &scanned, &Default::default(), &mut diagnostics);

        let declaration = pairs["a:b"].declaration.as_ref().unwrap();
        assert_eq!(declaration.dependency_ids(), ["c:d".to_string()]);
        assert_eq!(declared[0].dependency_ids().len(), 2);
    }

    #[test]
    fn test_cycles_do_not_alter_pairs() {
        let declared = vec![
            DeclaredChunk::new("a:b").with_dependencies(["c:d"]),
            DeclaredChunk::new("c:d").with_dependencies(["a:b"]),
        ];
        let scanned = vec![chunk("a:b", 0), chunk("c:d", 20)];
        let mut diagnostics = Diagnostics::new();

        let pairs = validate(&declared, &scanned, &Default::default(), &mut diagnostics);

        assert_eq!(diagnostics.of_kind(DiagnosticKind::DependencyCycle).count(), 1);
        let declaration = pairs["c:d"].declaration.as_ref().unwrap();
        assert_eq!(declaration.dependency_ids(), ["a:b".to_string()]);
    }

    #[test]
    fn test_orphan_severity_parses_from_config_strings() {
        let severity: OrphanSeverity = serde_json::from_str("\"ignore\"").unwrap();
        assert_eq!(severity, OrphanSeverity::Ignore);
        let mode: ConsistencyMode = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(mode, ConsistencyMode::Strict);
    }
}
