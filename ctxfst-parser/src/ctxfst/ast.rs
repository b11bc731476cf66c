//! Data model for CtxFST documents
//!
//! - [`elements`]: declared chunks (preamble), scanned chunks (body) and the resolved
//!   records handed to callers
//! - [`identifier`]: the `category:topic` identifier grammar
//! - [`diagnostics`]: diagnostic kinds, severities and the accumulating collector
//! - [`range`]: byte offset to line/column conversion
//! - [`error`]: source excerpts for human-readable error output

pub mod diagnostics;
pub mod elements;
pub mod error;
pub mod identifier;
pub mod range;

pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSeverity, Diagnostics};
pub use elements::{
    ChunkKind, ChunkMetadata, DeclaredChunk, Field, Priority, ResolvedChunkRecord, ScannedChunk,
};
pub use identifier::is_valid_identifier;
pub use range::{Position, SourceLocation};
