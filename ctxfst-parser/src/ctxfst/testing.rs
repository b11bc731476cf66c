//! Testing utilities
//!
//!     Test documents live as files under `ctxfst-parser/tests/fixtures/`, not as strings
//!     scattered through test modules. A CtxFST document mixes YAML, Markdown and tag
//!     markup, and small mistakes in hand-written strings (a tab in the preamble, a
//!     missing blank line) produce tests that pass against the wrong input. Keeping the
//!     documents in one place lets them be reviewed as documents.
//!
//!     Short inline strings are fine when the test is about a single marker or a single
//!     edge case of the scanner; anything with a preamble should be a fixture.
//!
//!     ```rust,ignore
//!     use ctxfst_parser::ctxfst::testing::{diagnostic_kinds, Fixture};
//!
//!     let output = Fixture::named("resume").parse();
//!     assert!(output.is_clean());
//!
//!     let output = Fixture::named("cycle").parse_with(&ParseOptions::strict());
//!     assert_eq!(diagnostic_kinds(&output), vec![DiagnosticKind::DependencyCycle]);
//!     ```

use crate::ctxfst::ast::DiagnosticKind;
use crate::ctxfst::pipeline::{parse_document_with_source, ParseOptions, ParseOutput};
use std::path::{Path, PathBuf};

/// Directory holding the fixture documents
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// A named document under the fixtures directory
#[derive(Debug, Clone)]
pub struct Fixture {
    name: String,
    path: PathBuf,
}

impl Fixture {
    /// `Fixture::named("resume")` resolves to `tests/fixtures/resume.md`
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: fixtures_dir().join(format!("{}.md", name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Panics when the fixture is missing, with the path in the message
    pub fn source(&self) -> String {
        std::fs::read_to_string(&self.path)
            .unwrap_or_else(|err| panic!("cannot read fixture {}: {}", self.path.display(), err))
    }

    pub fn parse(&self) -> ParseOutput {
        self.parse_with(&ParseOptions::default())
    }

    /// Records carry `<name>.md` as their source
    pub fn parse_with(&self, options: &ParseOptions) -> ParseOutput {
        let source = format!("{}.md", self.name);
        parse_document_with_source(&self.source(), &source, options)
    }
}

/// Kinds of all diagnostics, in reported order
pub fn diagnostic_kinds(output: &ParseOutput) -> Vec<DiagnosticKind> {
    output.diagnostics.iter().map(|d| d.kind).collect()
}

/// Ids of all records, in body order
pub fn record_ids(output: &ParseOutput) -> Vec<&str> {
    output.records.iter().map(|r| r.id.as_str()).collect()
}
