//! Human-readable diagnostic output

use ctxfst_parser::ctxfst::ast::error::format_source_context;
use ctxfst_parser::ctxfst::ast::{DiagnosticSeverity, Diagnostics};
use std::io::{self, Write};

/// Diagnostic counts across every processed document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl Totals {
    pub fn add(&mut self, diagnostics: &Diagnostics) {
        self.errors += diagnostics.count(DiagnosticSeverity::Error);
        self.warnings += diagnostics.count(DiagnosticSeverity::Warning);
        self.infos += diagnostics.count(DiagnosticSeverity::Information);
    }

    pub fn failed(&self, deny_warnings: bool) -> bool {
        self.errors > 0 || (deny_warnings && self.warnings > 0)
    }

    pub fn summary(&self) -> String {
        if self.errors == 0 && self.warnings == 0 {
            "All files valid".to_string()
        } else {
            format!(
                "Found {} error(s) and {} warning(s)",
                self.errors, self.warnings
            )
        }
    }
}

/// One line per diagnostic, sorted by position:
///
///     resume.md:12:1: error[unclosed-chunk]: chunk `skill:go` is never closed
///
/// With `excerpt`, the surrounding source lines follow each located diagnostic.
pub fn write_diagnostics(
    out: &mut impl Write,
    source: &str,
    text: &str,
    diagnostics: &Diagnostics,
    excerpt: bool,
) -> io::Result<()> {
    let mut sorted = diagnostics.clone();
    sorted.sort_by_offset();

    for diagnostic in sorted.iter() {
        let location = match (diagnostic.line, diagnostic.column) {
            (Some(line), Some(column)) => format!("{}:{}:{}", source, line, column),
            _ => source.to_string(),
        };
        writeln!(
            out,
            "{}: {}[{}]: {}",
            location, diagnostic.severity, diagnostic.kind, diagnostic.message
        )?;

        if excerpt {
            if let Some(position) = diagnostic.position() {
                for line in format_source_context(text, position).lines() {
                    writeln!(out, "    {}", line)?;
                }
            }
        }
    }
    Ok(())
}
