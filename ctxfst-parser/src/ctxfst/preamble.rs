//! Preamble extraction
//!
//! A document may open with a YAML preamble fenced by `---` lines:
//!
//!     ---
//!     chunks:
//!       - id: skill:python
//!         tags: [Python]
//!     ---
//!     <body>
//!
//! The opening line must be the very first line of the document (a UTF-8 BOM is
//! skipped). Both delimiter lines may carry trailing whitespace or a `\r`.
//!
//! Failure modes, none of them fatal:
//!
//! - opening `---` without a closing one: no preamble, the whole input is body
//! - YAML that does not parse, a root that is not a mapping, or a `chunks` value that
//!   is not a list: empty declared set, body starts after the closing delimiter
//!
//! Individual entries go through the schema decoder in [`decode`].

mod decode;

use crate::ctxfst::ast::{DeclaredChunk, Diagnostic, Diagnostics};
use serde_yaml::Value;

const BOM: &str = "\u{feff}";

/// Result of splitting a document into preamble and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    /// A terminated `---` block was found
    pub present: bool,
    /// Declarations in preamble order, duplicates included
    pub declared: Vec<DeclaredChunk>,
    /// Byte offset where the body starts
    pub body_start: usize,
}

impl Preamble {
    fn absent(body_start: usize) -> Self {
        Self {
            present: false,
            declared: Vec::new(),
            body_start,
        }
    }

    pub fn body<'a>(&self, source: &'a str) -> &'a str {
        &source[self.body_start..]
    }
}

/// The raw delimited block, before YAML parsing
struct Block {
    /// Offset of the first YAML byte
    yaml_start: usize,
    /// Offset of the closing delimiter line
    yaml_end: usize,
    /// Offset just past the closing delimiter line and its newline
    body_start: usize,
}

/// Iterate lines as (start offset, text without the trailing `\n`)
fn lines_with_offsets(source: &str, from: usize) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = from;
    source[from..].split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        (start, line.strip_suffix('\n').unwrap_or(line))
    })
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == "---"
}

/// Locate the `---` block. `Err(())` when it is opened but never closed.
fn find_block(source: &str) -> Option<Result<Block, ()>> {
    let start = if source.starts_with(BOM) { BOM.len() } else { 0 };
    let mut lines = lines_with_offsets(source, start);

    let (first_start, first) = lines.next()?;
    if !is_delimiter(first) {
        return None;
    }
    let yaml_start = first_start + first.len() + 1;

    for (line_start, line) in lines {
        if is_delimiter(line) {
            let body_start = (line_start + line.len() + 1).min(source.len());
            return Some(Ok(Block {
                yaml_start,
                yaml_end: line_start,
                body_start,
            }));
        }
    }

    Some(Err(()))
}

/// The YAML between the delimiters and the body offset, for a terminated block
pub fn raw_yaml(source: &str) -> Option<(&str, usize)> {
    match find_block(source)? {
        Ok(block) => Some((&source[block.yaml_start..block.yaml_end], block.body_start)),
        Err(()) => None,
    }
}

/// Split `source` into preamble declarations and body
pub fn extract(source: &str, diagnostics: &mut Diagnostics) -> Preamble {
    let block = match find_block(source) {
        None => {
            let body_start = if source.starts_with(BOM) { BOM.len() } else { 0 };
            return Preamble::absent(body_start);
        }
        Some(Err(())) => {
            diagnostics.push(Diagnostic::unterminated_preamble());
            return Preamble::absent(0);
        }
        Some(Ok(block)) => block,
    };

    let yaml = &source[block.yaml_start..block.yaml_end];
    let mut preamble = Preamble {
        present: true,
        declared: Vec::new(),
        body_start: block.body_start,
    };

    let root: Value = match serde_yaml::from_str(yaml) {
        Ok(value) => value,
        Err(err) => {
            let offset = block.yaml_start + err.location().map(|l| l.index()).unwrap_or(0);
            diagnostics.push(Diagnostic::invalid_preamble(err, offset));
            return preamble;
        }
    };

    let mapping = match root {
        Value::Null => return preamble,
        Value::Mapping(mapping) => mapping,
        _ => {
            diagnostics.push(Diagnostic::invalid_preamble(
                "the preamble must be a mapping with a `chunks` list",
                block.yaml_start,
            ));
            return preamble;
        }
    };

    let mut locator = decode::EntryLocator::new(source, block.yaml_start, block.yaml_end);

    let entries = match mapping.get("chunks") {
        None | Some(Value::Null) => return preamble,
        Some(Value::Sequence(entries)) => entries,
        Some(_) => {
            diagnostics.push(Diagnostic::invalid_preamble(
                "`chunks` must be a list",
                locator.chunks_offset(),
            ));
            return preamble;
        }
    };

    for (index, entry) in entries.iter().enumerate() {
        if let Some(declared) = decode::decode_entry(index, entry, &mut locator, diagnostics) {
            preamble.declared.push(declared);
        }
    }

    tracing::debug!(
        declared = preamble.declared.len(),
        body_start = preamble.body_start,
        "extracted preamble"
    );

    preamble
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctxfst::ast::{DiagnosticKind, Field};

    fn kinds(diagnostics: &Diagnostics) -> Vec<DiagnosticKind> {
        diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_no_preamble() {
        let mut diagnostics = Diagnostics::new();
        let preamble = extract("# Title\n<Chunk id=\"a:b\">x</Chunk>", &mut diagnostics);
        assert!(!preamble.present);
        assert_eq!(preamble.body_start, 0);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_basic_preamble() {
        let source = "---\nchunks:\n  - id: skill:go\n    tags: [Go]\n---\nbody";
        let mut diagnostics = Diagnostics::new();
        let preamble = extract(source, &mut diagnostics);

        assert!(preamble.present);
        assert_eq!(preamble.body(source), "body");
        assert_eq!(preamble.declared.len(), 1);
        assert_eq!(preamble.declared[0].id, "skill:go");
        assert_eq!(preamble.declared[0].offset, Some(source.find("skill:go").unwrap()));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_crlf_and_trailing_whitespace_delimiters() {
        let source = "---  \r\nchunks:\r\n  - id: a:b\r\n--- \r\nbody";
        let mut diagnostics = Diagnostics::new();
        let preamble = extract(source, &mut diagnostics);
        assert!(preamble.present);
        assert_eq!(preamble.body(source), "body");
        assert_eq!(preamble.declared[0].id, "a:b");
    }

    #[test]
    fn test_bom_is_skipped() {
        let source = "\u{feff}---\nchunks: []\n---\nbody";
        let mut diagnostics = Diagnostics::new();
        let preamble = extract(source, &mut diagnostics);
        assert!(preamble.present);
        assert_eq!(preamble.body(source), "body");
    }

    #[test]
    fn test_unterminated_preamble() {
        let source = "---\nchunks:\n  - id: a:b\nbody";
        let mut diagnostics = Diagnostics::new();
        let preamble = extract(source, &mut diagnostics);
        assert!(!preamble.present);
        assert_eq!(preamble.body_start, 0);
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnterminatedPreamble]);
    }

    #[test]
    fn test_closing_delimiter_at_end_of_input() {
        let source = "---\nchunks: []\n---";
        let mut diagnostics = Diagnostics::new();
        let preamble = extract(source, &mut diagnostics);
        assert!(preamble.present);
        assert_eq!(preamble.body(source), "");
    }

    #[test]
    fn test_empty_preamble() {
        let mut diagnostics = Diagnostics::new();
        let preamble = extract("---\n---\nbody", &mut diagnostics);
        assert!(preamble.present);
        assert!(preamble.declared.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_mapping_without_chunks() {
        let mut diagnostics = Diagnostics::new();
        let preamble = extract("---\ntitle: Resume\n---\nbody", &mut diagnostics);
        assert!(preamble.declared.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_yaml() {
        let source = "---\nchunks: [unclosed\n---\nbody";
        let mut diagnostics = Diagnostics::new();
        let preamble = extract(source, &mut diagnostics);
        assert!(preamble.present);
        assert_eq!(preamble.body(source), "body");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::InvalidPreamble]);
    }

    #[test]
    fn test_non_mapping_root_and_non_list_chunks() {
        let mut diagnostics = Diagnostics::new();
        extract("---\n- a\n- b\n---\n", &mut diagnostics);
        extract("---\nchunks: skill:go\n---\n", &mut diagnostics);
        assert_eq!(
            kinds(&diagnostics),
            vec![DiagnosticKind::InvalidPreamble, DiagnosticKind::InvalidPreamble]
        );
    }

    #[test]
    fn test_bad_entry_does_not_stop_decoding() {
        let source = "---\nchunks:\n  - just a string\n  - tags: [x]\n  - id: a:b\n    version: two\n---\n";
        let mut diagnostics = Diagnostics::new();
        let preamble = extract(source, &mut diagnostics);

        assert_eq!(preamble.declared.len(), 1);
        assert_eq!(preamble.declared[0].version, Field::Invalid("two".into()));
        assert_eq!(
            kinds(&diagnostics),
            vec![
                DiagnosticKind::InvalidPreamble,
                DiagnosticKind::MissingIdentifier,
                DiagnosticKind::InvalidFieldValue,
            ]
        );
    }
}
