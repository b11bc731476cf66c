//! Chunk scanner
//!
//! A single pass over the body tokens driving a two-state automaton:
//!
//!     Outside ──<Chunk id="x">──▶ Inside(x) ──</Chunk>──▶ Outside
//!
//! Anything the automaton does not expect is recorded as a structural diagnostic and
//! scanning continues, so one parse reports every broken tag:
//!
//! - an open tag while inside a chunk is a nesting error; the depth is counted so the
//!   inner close tag does not end the outer chunk, and the outer chunk is dropped
//! - a close tag while outside is stray
//! - end of input while inside leaves the chunk unclosed
//! - a malformed open tag still opens a chunk, so its close tag pairs up, but that
//!   chunk is never emitted
//!
//! Fenced code blocks (``` or ~~~ at the start of a line) are opaque: tags inside them
//! are plain content, both inside and outside chunks.

use crate::ctxfst::ast::{Diagnostic, Diagnostics, ScannedChunk};
use crate::ctxfst::lexing::{parse_open_tag, tokenize, Token};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Treat fenced code blocks as opaque content
    pub skip_code_fences: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_code_fences: true,
        }
    }
}

#[derive(Debug)]
struct OpenChunk {
    id: String,
    start: usize,
    content_start: usize,
    /// Open tags seen inside this chunk and not yet closed
    nested: usize,
    /// False once the chunk is known to be unusable (malformed tag, nesting)
    valid: bool,
}

#[derive(Debug)]
enum State {
    Outside,
    Inside(OpenChunk),
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: u8,
    len: usize,
}

/// Tracks what precedes the current token on its line
#[derive(Debug, Clone, Copy)]
struct LineStart {
    blank_so_far: bool,
    indent: usize,
}

impl LineStart {
    fn new() -> Self {
        Self {
            blank_so_far: true,
            indent: 0,
        }
    }

    /// A fence may start here: only spaces before it, at most three
    fn allows_fence(&self) -> bool {
        self.blank_so_far && self.indent <= 3
    }

    fn advance(&mut self, text: &str) {
        if self.blank_so_far && !text.is_empty() && text.bytes().all(|b| b == b' ') {
            self.indent += text.len();
        } else {
            self.blank_so_far = false;
        }
    }
}

/// Strip at most one newline after the open tag and one before the close tag
fn trim_boundary_newlines(content: &str) -> &str {
    let content = content
        .strip_prefix("\r\n")
        .or_else(|| content.strip_prefix('\n'))
        .unwrap_or(content);
    content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content)
}

struct Scanner<'a> {
    source: &'a str,
    state: State,
    fence: Option<Fence>,
    chunks: Vec<ScannedChunk>,
    diagnostics: &'a mut Diagnostics,
}

impl Scanner<'_> {
    fn open_tag(&mut self, span: Range<usize>) {
        let source = self.source;
        let raw = &source[span.clone()];
        let parsed = parse_open_tag(raw);

        if let State::Inside(open) = &mut self.state {
            let inner = match &parsed {
                Ok(id) => Some(id.as_str()),
                Err(err) => err.id_hint(),
            };
            tracing::trace!(outer = %open.id, offset = span.start, "nested chunk tag");
            self.diagnostics.push(Diagnostic::nested_chunk(
                &open.id,
                open.start,
                inner,
                span.start,
            ));
            open.valid = false;
            open.nested += 1;
            return;
        }

        let (id, valid) = match parsed {
            Ok(id) => (id, true),
            Err(err) => {
                self.diagnostics
                    .push(Diagnostic::malformed_tag(raw, &err, span.start));
                (err.id_hint().unwrap_or(raw).to_string(), false)
            }
        };
        tracing::trace!(id = %id, offset = span.start, valid, "chunk opened");
        self.state = State::Inside(OpenChunk {
            id,
            start: span.start,
            content_start: span.end,
            nested: 0,
            valid,
        });
    }

    fn close_tag(&mut self, span: Range<usize>) {
        match std::mem::replace(&mut self.state, State::Outside) {
            State::Outside => {
                tracing::trace!(offset = span.start, "stray close tag");
                self.diagnostics.push(Diagnostic::stray_close_tag(span.start));
            }
            State::Inside(mut open) if open.nested > 0 => {
                open.nested -= 1;
                self.state = State::Inside(open);
            }
            State::Inside(open) => {
                tracing::trace!(id = %open.id, offset = span.start, "chunk closed");
                if open.valid {
                    let content =
                        trim_boundary_newlines(&self.source[open.content_start..span.start]);
                    self.chunks.push(ScannedChunk::new(
                        open.id,
                        content,
                        open.start..span.end,
                    ));
                }
            }
        }
    }

    fn finish(mut self) -> Vec<ScannedChunk> {
        if let State::Inside(open) = std::mem::replace(&mut self.state, State::Outside) {
            self.diagnostics
                .push(Diagnostic::unclosed_chunk(&open.id, open.start));
        }
        self.chunks
    }
}

/// Scan the body of `source`, which starts at `body_start`
///
/// Offsets in the returned chunks and in diagnostics are relative to `source`.
pub fn scan(
    source: &str,
    body_start: usize,
    options: &ScanOptions,
    diagnostics: &mut Diagnostics,
) -> Vec<ScannedChunk> {
    let body = &source[body_start..];
    let tokens: Vec<(Token, Range<usize>)> = tokenize(body)
        .map(|(token, span)| (token, span.start + body_start..span.end + body_start))
        .collect();

    let mut scanner = Scanner {
        source,
        state: State::Outside,
        fence: None,
        chunks: Vec::new(),
        diagnostics,
    };
    let mut line = LineStart::new();

    for (index, (token, span)) in tokens.iter().enumerate() {
        let text = &source[span.clone()];

        match token {
            Token::Newline => {
                line = LineStart::new();
                continue;
            }
            Token::Fence if options.skip_code_fences && line.allows_fence() => {
                let marker = text.as_bytes()[0];
                match scanner.fence {
                    None => scanner.fence = Some(Fence { marker, len: text.len() }),
                    Some(open)
                        if open.marker == marker
                            && text.len() >= open.len
                            && rest_of_line_is_blank(source, &tokens[index + 1..]) =>
                    {
                        scanner.fence = None
                    }
                    Some(_) => {}
                }
            }
            _ if scanner.fence.is_some() => {}
            Token::OpenTag => scanner.open_tag(span.clone()),
            Token::CloseTag => scanner.close_tag(span.clone()),
            _ => {}
        }

        line.advance(text);
    }

    let chunks = scanner.finish();
    tracing::debug!(chunks = chunks.len(), "scanned body");
    chunks
}

fn rest_of_line_is_blank(source: &str, rest: &[(Token, Range<usize>)]) -> bool {
    rest.iter()
        .take_while(|(token, _)| *token != Token::Newline)
        .all(|(_, span)| source[span.clone()].trim().is_empty())
}
