//! The parse pipeline
//!
//!     Parsing runs four stages over one document, threading a single diagnostics
//!     collector through all of them:
//!         1. Preamble extraction: split off the `---` block and decode declarations.
//!            See [preamble](crate::ctxfst::preamble).
//!         2. Scanning: slice the body into chunks. See [scanning](crate::ctxfst::scanning).
//!         3. Validation: reconcile declarations and chunks. See
//!            [validation](crate::ctxfst::validation).
//!         4. Assembling: build the resolved records. See
//!            [assembling](crate::ctxfst::assembling).
//!
//!     No stage fails. A parse always returns records (possibly none) and diagnostics
//!     (possibly none); callers decide what a diagnostic means for them.

use crate::ctxfst::assembling::assemble;
use crate::ctxfst::ast::{Diagnostics, ResolvedChunkRecord, SourceLocation};
use crate::ctxfst::preamble;
use crate::ctxfst::scanning::{scan, ScanOptions};
use crate::ctxfst::validation::{validate, ConsistencyMode, OrphanSeverity, ValidationOptions};
use serde::{Deserialize, Serialize};

/// Knobs for a parse, also the `[parsing]` section of the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub mode: ConsistencyMode,
    pub orphan_severity: OrphanSeverity,
    pub skip_code_fences: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            mode: ConsistencyMode::default(),
            orphan_severity: OrphanSeverity::default(),
            skip_code_fences: true,
        }
    }
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            mode: ConsistencyMode::Strict,
            ..Self::default()
        }
    }

    fn validation(&self) -> ValidationOptions {
        ValidationOptions {
            mode: self.mode,
            orphan_severity: self.orphan_severity,
        }
    }

    fn scanning(&self) -> ScanOptions {
        ScanOptions {
            skip_code_fences: self.skip_code_fences,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseOutput {
    pub records: Vec<ResolvedChunkRecord>,
    pub diagnostics: Diagnostics,
}

impl ParseOutput {
    /// Any diagnostic at error severity
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Structural problems, meaning `records` is empty regardless of the body
    pub fn has_structural_errors(&self) -> bool {
        self.diagnostics.has_structural()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub struct Pipeline {
    options: ParseOptions,
}

impl Pipeline {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn run(&self, text: &str) -> ParseOutput {
        self.run_with_source(text, None)
    }

    /// `source` is opaque to the parser and copied onto every record
    pub fn run_with_source(&self, text: &str, source: Option<&str>) -> ParseOutput {
        let span = tracing::debug_span!("parse", source = source.unwrap_or("<input>"));
        let _guard = span.enter();

        let mut diagnostics = Diagnostics::new();

        let preamble = preamble::extract(text, &mut diagnostics);
        let scanned = scan(
            text,
            preamble.body_start,
            &self.options.scanning(),
            &mut diagnostics,
        );
        let pairs = validate(
            &preamble.declared,
            &scanned,
            &self.options.validation(),
            &mut diagnostics,
        );
        let records = assemble(pairs, source, &diagnostics);

        diagnostics.locate(&SourceLocation::new(text));
        tracing::debug!(
            records = records.len(),
            diagnostics = diagnostics.len(),
            "parsed document"
        );

        ParseOutput {
            records,
            diagnostics,
        }
    }
}

/// Parse a CtxFST document
pub fn parse_document(text: &str, options: &ParseOptions) -> ParseOutput {
    Pipeline::new(*options).run(text)
}

/// Parse a CtxFST document, tagging every record with `source`
pub fn parse_document_with_source(text: &str, source: &str, options: &ParseOptions) -> ParseOutput {
    Pipeline::new(*options).run_with_source(text, Some(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctxfst::ast::DiagnosticKind;

    #[test]
    fn test_single_chunk_without_preamble() {
        let output = parse_document("<Chunk id=\"about:x\">hello</Chunk>", &ParseOptions::default());
        assert!(output.is_clean());
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].id, "about:x");
        assert_eq!(output.records[0].content, "hello");
        assert!(output.records[0].metadata.is_none());
    }

    #[test]
    fn test_missing_close_yields_no_records() {
        let output = parse_document(
            "<Chunk id=\"a:b\">x</Chunk>\n<Chunk id=\"skill:go\">\nbody",
            &ParseOptions::default(),
        );
        assert!(output.records.is_empty());
        let unclosed: Vec<_> = output.diagnostics.of_kind(DiagnosticKind::UnclosedChunk).collect();
        assert_eq!(unclosed.len(), 1);
        assert_eq!(unclosed[0].id.as_deref(), Some("skill:go"));
        assert_eq!(unclosed[0].line, Some(2));
    }

    #[test]
    fn test_source_is_attached() {
        let output = parse_document_with_source(
            "<Chunk id=\"a:b\">x</Chunk>",
            "notes/a.md",
            &ParseOptions::default(),
        );
        assert_eq!(output.records[0].source.as_deref(), Some("notes/a.md"));
    }

    #[test]
    fn test_strict_mode() {
        let text = "<Chunk id=\"a:b\">x</Chunk>";
        let output = parse_document(text, &ParseOptions::strict());
        assert_eq!(
            output.diagnostics.of_kind(DiagnosticKind::UndeclaredChunk).count(),
            1
        );
        // Semantic only: the record is still produced
        assert_eq!(output.records.len(), 1);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ParseOptions = serde_json::from_str(r#"{"mode": "strict"}"#).unwrap();
        assert_eq!(options.mode, ConsistencyMode::Strict);
        assert!(options.skip_code_fences);
        assert_eq!(options.orphan_severity, OrphanSeverity::Warning);
    }
}
