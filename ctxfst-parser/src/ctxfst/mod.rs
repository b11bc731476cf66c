//! The CtxFST format
//!
//! A CtxFST document looks like this:
//!
//! ```text
//! ---
//! chunks:
//!   - id: skill:python
//!     tags: [Python, Backend]
//!     context: Author's Python experience across backend services
//!     priority: high
//! ---
//!
//! # Skills
//!
//! <Chunk id="skill:python">
//! ## Python
//! Eight years of Django and FastAPI.
//! </Chunk>
//! ```
//!
//! Parsing runs four stages, each appending to a single [`Diagnostics`](ast::Diagnostics)
//! collector instead of failing early:
//!
//!     1. preamble::extract     text → declared chunks + body offset
//!     2. scanning::scan        body → scanned chunks
//!     3. validation::validate  declared × scanned → validated pairs
//!     4. assembling::assemble  validated pairs → resolved records
//!
//! Structural problems (unclosed, nested or stray tags, duplicate chunk ids, malformed
//! tags) stop stage 4 from producing anything. Everything else degrades single records.

pub mod assembling;
pub mod ast;
pub mod context;
pub mod export;
pub mod lexing;
pub mod loader;
pub mod pipeline;
pub mod preamble;
pub mod quality;
pub mod scanning;
pub mod testing;
pub mod validation;
