//! # ctxfst-parser
//!
//! A parser and validator for CtxFST documents: Markdown files whose body is cut into
//! `<Chunk id="...">` regions, optionally preceded by a YAML preamble that declares
//! metadata for each chunk.
//!
//! File Layout
//!
//!     src/ctxfst
//!       ├── ast          Data model: declarations, scanned chunks, records, diagnostics
//!       ├── preamble     Preamble extraction and schema-driven decoding
//!       ├── lexing       logos tokens and the open-tag attribute parser
//!       ├── scanning     The two-state chunk scanner
//!       ├── validation   Cross validation rule table and dependency graph checks
//!       ├── assembling   Record assembly
//!       ├── export       Serialization, document rendering, record sinks
//!       └── pipeline     The Extractor → Scanner → Validator → Assembler pipeline
//!
//! Around the core sit the pieces that do I/O or talk to the outside world: the
//! [loader](ctxfst::loader), the [context generator](ctxfst::context) interface and the
//! [quality](ctxfst::quality) heuristics used by `ctxfst diagnose`.
//!
//! For most callers [`parse_document`](ctxfst::pipeline::parse_document) is the entry
//! point.

#![allow(rustdoc::invalid_html_tags)]

pub mod ctxfst;

pub use ctxfst::pipeline::{parse_document, parse_document_with_source, ParseOptions, ParseOutput};
