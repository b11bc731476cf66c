//! Scanned chunk
//!
//!     A `<Chunk id="...">` … `</Chunk>` region found in the body. Offsets are byte
//!     offsets into the whole document: `start_offset` is where the open tag begins and
//!     `end_offset` is just past the close tag.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedChunk {
    pub id: String,
    /// Literal text between the tags, minus at most one boundary newline on each side
    pub content: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl ScannedChunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>, span: std::ops::Range<usize>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            start_offset: span.start,
            end_offset: span.end,
        }
    }

    pub fn span(&self) -> std::ops::Range<usize> {
        self.start_offset..self.end_offset
    }
}
