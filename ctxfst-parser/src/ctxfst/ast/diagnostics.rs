//! Diagnostics collected while parsing a document
//!
//! Every stage of the pipeline appends to one [`Diagnostics`] collector instead of
//! returning early, so a single parse reports every problem it can find.
//!
//! ## Classes
//!
//! Diagnostics fall into two classes:
//!
//! - **Structural**: the body cannot be sliced into chunks reliably. Unclosed, nested
//!   or stray tags, malformed open tags and duplicate chunk ids. These are always
//!   errors and the assembler produces no records when any of them is present.
//! - **Semantic**: the preamble and body disagree, or a declared value is unusable.
//!   These degrade individual records but never block assembly.
//!
//! Diagnostics carry byte offsets. Call [`Diagnostics::locate`] with the document's
//! [`SourceLocation`] to fill in line/column positions before display.

use super::range::{Position, SourceLocation};
use serde::Serialize;
use std::fmt;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    #[serde(rename = "info")]
    Information,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Information => write!(f, "info"),
        }
    }
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    // Structural
    UnclosedChunk,
    NestedChunk,
    StrayCloseTag,
    DuplicateChunk,
    MalformedTag,
    // Semantic
    UndeclaredChunk,
    OrphanDeclaration,
    DuplicateDeclaration,
    InvalidIdentifierFormat,
    InvalidFieldValue,
    DanglingDependency,
    DependencyCycle,
    MissingIdentifier,
    InvalidPreamble,
    UnterminatedPreamble,
    UnknownField,
}

impl DiagnosticKind {
    /// Stable kebab-case code, used in CLI output and JSON
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::UnclosedChunk => "unclosed-chunk",
            DiagnosticKind::NestedChunk => "nested-chunk",
            DiagnosticKind::StrayCloseTag => "stray-close-tag",
            DiagnosticKind::DuplicateChunk => "duplicate-chunk",
            DiagnosticKind::MalformedTag => "malformed-tag",
            DiagnosticKind::UndeclaredChunk => "undeclared-chunk",
            DiagnosticKind::OrphanDeclaration => "orphan-declaration",
            DiagnosticKind::DuplicateDeclaration => "duplicate-declaration",
            DiagnosticKind::InvalidIdentifierFormat => "invalid-identifier-format",
            DiagnosticKind::InvalidFieldValue => "invalid-field-value",
            DiagnosticKind::DanglingDependency => "dangling-dependency",
            DiagnosticKind::DependencyCycle => "dependency-cycle",
            DiagnosticKind::MissingIdentifier => "missing-identifier",
            DiagnosticKind::InvalidPreamble => "invalid-preamble",
            DiagnosticKind::UnterminatedPreamble => "unterminated-preamble",
            DiagnosticKind::UnknownField => "unknown-field",
        }
    }

    /// Structural kinds block record assembly
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::UnclosedChunk
                | DiagnosticKind::NestedChunk
                | DiagnosticKind::StrayCloseTag
                | DiagnosticKind::DuplicateChunk
                | DiagnosticKind::MalformedTag
        )
    }

    /// Undeclared chunks are only reported in strict mode, where they fail the document
    pub fn default_severity(&self) -> DiagnosticSeverity {
        if self.is_structural() || *self == DiagnosticKind::UndeclaredChunk {
            DiagnosticSeverity::Error
        } else if *self == DiagnosticKind::UnknownField {
            DiagnosticSeverity::Information
        } else {
            DiagnosticSeverity::Warning
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single problem found in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    /// The chunk identifier the problem is about, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Preamble field name, for field-level problems
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Offending raw value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Byte offset into the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// 1-based line, filled by [`Diagnostics::locate`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based column, filled by [`Diagnostics::locate`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Other ids involved (nested inner id, cycle path)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_ids: Vec<String>,
    /// Other offsets involved (every occurrence of a duplicated chunk)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_offsets: Vec<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            id: None,
            field: None,
            value: None,
            offset: None,
            line: None,
            column: None,
            related_ids: Vec::new(),
            related_offsets: Vec::new(),
            message: message.into(),
        }
    }

    pub fn with_severity(mut self, severity: DiagnosticSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn at_opt(mut self, offset: Option<usize>) -> Self {
        self.offset = offset;
        self
    }

    pub fn is_structural(&self) -> bool {
        self.kind.is_structural()
    }

    /// Zero-based position, once located
    pub fn position(&self) -> Option<Position> {
        match (self.line, self.column) {
            (Some(line), Some(column)) => Some(Position::new(line - 1, column - 1)),
            _ => None,
        }
    }

    // Constructors, one per kind

    pub fn unclosed_chunk(id: &str, offset: usize) -> Self {
        Self::new(
            DiagnosticKind::UnclosedChunk,
            format!("chunk `{}` is never closed", id),
        )
        .with_id(id)
        .at(offset)
    }

    /// `outer` is the chunk still open when `inner` was opened
    pub fn nested_chunk(
        outer: &str,
        outer_offset: usize,
        inner: Option<&str>,
        inner_offset: usize,
    ) -> Self {
        let message = match inner {
            Some(inner) => format!(
                "chunk `{}` is opened inside chunk `{}`; chunks cannot nest",
                inner, outer
            ),
            None => format!("chunk tag opened inside chunk `{}`; chunks cannot nest", outer),
        };
        let mut diagnostic = Self::new(DiagnosticKind::NestedChunk, message)
            .with_id(outer)
            .at(inner_offset);
        diagnostic.related_ids = inner.map(|id| vec![id.to_string()]).unwrap_or_default();
        diagnostic.related_offsets = vec![outer_offset];
        diagnostic
    }

    pub fn stray_close_tag(offset: usize) -> Self {
        Self::new(
            DiagnosticKind::StrayCloseTag,
            "closing tag `</Chunk>` without a matching open tag",
        )
        .at(offset)
    }

    /// `offsets` lists every occurrence, in body order
    pub fn duplicate_chunk(id: &str, offsets: Vec<usize>) -> Self {
        let mut diagnostic = Self::new(
            DiagnosticKind::DuplicateChunk,
            format!("chunk id `{}` appears {} times in the body", id, offsets.len()),
        )
        .with_id(id)
        .at_opt(offsets.get(1).copied());
        diagnostic.related_offsets = offsets;
        diagnostic
    }

    pub fn malformed_tag(raw: &str, reason: impl fmt::Display, offset: usize) -> Self {
        Self::new(
            DiagnosticKind::MalformedTag,
            format!("malformed chunk tag: {}", reason),
        )
        .with_value(raw)
        .at(offset)
    }

    pub fn undeclared_chunk(id: &str, offset: usize) -> Self {
        Self::new(
            DiagnosticKind::UndeclaredChunk,
            format!("chunk `{}` has no declaration in the preamble", id),
        )
        .with_id(id)
        .at(offset)
    }

    pub fn orphan_declaration(id: &str, offset: Option<usize>) -> Self {
        Self::new(
            DiagnosticKind::OrphanDeclaration,
            format!("chunk `{}` is declared but never appears in the body", id),
        )
        .with_id(id)
        .at_opt(offset)
    }

    pub fn duplicate_declaration(id: &str, offset: Option<usize>) -> Self {
        Self::new(
            DiagnosticKind::DuplicateDeclaration,
            format!(
                "chunk `{}` is declared more than once; the first declaration is used",
                id
            ),
        )
        .with_id(id)
        .at_opt(offset)
    }

    pub fn invalid_identifier_format(id: &str, offset: Option<usize>) -> Self {
        Self::new(
            DiagnosticKind::InvalidIdentifierFormat,
            format!(
                "`{}` is not a valid identifier (expected lowercase `category:topic`)",
                id
            ),
        )
        .with_id(id)
        .at_opt(offset)
    }

    pub fn invalid_field_value(id: &str, field: &str, value: &str, offset: Option<usize>) -> Self {
        Self::new(
            DiagnosticKind::InvalidFieldValue,
            format!("invalid value `{}` for field `{}` of `{}`", value, field, id),
        )
        .with_id(id)
        .with_field(field)
        .with_value(value)
        .at_opt(offset)
    }

    pub fn dangling_dependency(from: &str, to: &str, offset: Option<usize>) -> Self {
        let mut diagnostic = Self::new(
            DiagnosticKind::DanglingDependency,
            format!("`{}` depends on `{}`, which is not declared", from, to),
        )
        .with_id(from)
        .with_field("dependencies")
        .with_value(to)
        .at_opt(offset);
        diagnostic.related_ids = vec![to.to_string()];
        diagnostic
    }

    /// `path` starts and ends with the same id
    pub fn dependency_cycle(path: Vec<String>, offset: Option<usize>) -> Self {
        let mut diagnostic = Self::new(
            DiagnosticKind::DependencyCycle,
            format!("dependency cycle: {}", path.join(" -> ")),
        )
        .at_opt(offset);
        diagnostic.id = path.first().cloned();
        diagnostic.related_ids = path;
        diagnostic
    }

    pub fn missing_identifier(entry: usize, offset: Option<usize>) -> Self {
        Self::new(
            DiagnosticKind::MissingIdentifier,
            format!("preamble entry #{} has no `id`; entry skipped", entry + 1),
        )
        .at_opt(offset)
    }

    pub fn invalid_preamble(reason: impl fmt::Display, offset: usize) -> Self {
        Self::new(
            DiagnosticKind::InvalidPreamble,
            format!("invalid preamble: {}", reason),
        )
        .at(offset)
    }

    pub fn unterminated_preamble() -> Self {
        Self::new(
            DiagnosticKind::UnterminatedPreamble,
            "preamble opened with `---` is never closed; treating the whole input as body",
        )
        .at(0)
    }

    pub fn unknown_field(id: &str, field: &str, offset: Option<usize>) -> Self {
        Self::new(
            DiagnosticKind::UnknownField,
            format!("unknown field `{}` on `{}` ignored", field, id),
        )
        .with_id(id)
        .with_field(field)
        .at_opt(offset)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.kind, self.message)?;
        if let Some(position) = self.position() {
            write!(f, " at {}", position)?;
        }
        Ok(())
    }
}

/// Accumulates diagnostics across pipeline stages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_structural(&self) -> bool {
        self.items.iter().any(Diagnostic::is_structural)
    }

    pub fn has_errors(&self) -> bool {
        self.count(DiagnosticSeverity::Error) > 0
    }

    pub fn count(&self, severity: DiagnosticSeverity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    /// Fill in line/column for every diagnostic that has an offset
    pub fn locate(&mut self, location: &SourceLocation) {
        for diagnostic in &mut self.items {
            if let Some(offset) = diagnostic.offset {
                let position = location.byte_to_position(offset);
                diagnostic.line = Some(position.line + 1);
                diagnostic.column = Some(position.column + 1);
            }
        }
    }

    /// Stable sort by offset; diagnostics without one go last
    pub fn sort_by_offset(&mut self) {
        self.items
            .sort_by_key(|d| (d.offset.is_none(), d.offset.unwrap_or(0)));
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_kinds_are_errors() {
        for kind in [
            DiagnosticKind::UnclosedChunk,
            DiagnosticKind::NestedChunk,
            DiagnosticKind::StrayCloseTag,
            DiagnosticKind::DuplicateChunk,
            DiagnosticKind::MalformedTag,
        ] {
            assert!(kind.is_structural());
            assert_eq!(kind.default_severity(), DiagnosticSeverity::Error);
        }
        assert!(!DiagnosticKind::DependencyCycle.is_structural());
        assert!(!DiagnosticKind::UndeclaredChunk.is_structural());
        assert_eq!(
            DiagnosticKind::UndeclaredChunk.default_severity(),
            DiagnosticSeverity::Error
        );
        assert_eq!(
            DiagnosticKind::UnknownField.default_severity(),
            DiagnosticSeverity::Information
        );
    }

    #[test]
    fn test_display_without_position() {
        let diagnostic = Diagnostic::unclosed_chunk("skill:go", 12);
        assert_eq!(
            diagnostic.to_string(),
            "error[unclosed-chunk]: chunk `skill:go` is never closed"
        );
    }

    #[test]
    fn test_locate_fills_one_based_positions() {
        let source = "intro\n<Chunk id=\"a:b\">\n";
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::unclosed_chunk("a:b", 6));
        diagnostics.push(Diagnostic::orphan_declaration("c:d", None));
        diagnostics.locate(&SourceLocation::new(source));

        let located = diagnostics.as_slice();
        assert_eq!(located[0].line, Some(2));
        assert_eq!(located[0].column, Some(1));
        assert_eq!(located[0].position(), Some(Position::new(1, 0)));
        assert_eq!(located[1].line, None);
        assert!(located[0].to_string().ends_with("at 2:1"));
    }

    #[test]
    fn test_counts_and_structural_flag() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::orphan_declaration("a:b", None));
        assert!(!diagnostics.has_structural());
        assert!(!diagnostics.has_errors());

        diagnostics.push(Diagnostic::stray_close_tag(3));
        assert!(diagnostics.has_structural());
        assert_eq!(diagnostics.count(DiagnosticSeverity::Error), 1);
        assert_eq!(diagnostics.count(DiagnosticSeverity::Warning), 1);
    }

    #[test]
    fn test_sort_by_offset_puts_unlocated_last() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::orphan_declaration("a:b", None));
        diagnostics.push(Diagnostic::stray_close_tag(30));
        diagnostics.push(Diagnostic::unclosed_chunk("c:d", 4));
        diagnostics.sort_by_offset();

        let offsets: Vec<_> = diagnostics.iter().map(|d| d.offset).collect();
        assert_eq!(offsets, vec![Some(4), Some(30), None]);
    }

    #[test]
    fn test_json_shape() {
        let diagnostic = Diagnostic::invalid_field_value("skill:go", "priority", "urgent", Some(8));
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["kind"], "invalid-field-value");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["field"], "priority");
        assert_eq!(json["value"], "urgent");
        assert!(json.get("line").is_none());
        assert!(json.get("related_ids").is_none());
    }

    #[test]
    fn test_cycle_path_is_kept() {
        let diagnostic =
            Diagnostic::dependency_cycle(vec!["skill:go".into(), "skill:go".into()], None);
        assert_eq!(diagnostic.id.as_deref(), Some("skill:go"));
        assert_eq!(diagnostic.related_ids, vec!["skill:go", "skill:go"]);
        assert!(diagnostic.message.contains("skill:go -> skill:go"));
    }
}
