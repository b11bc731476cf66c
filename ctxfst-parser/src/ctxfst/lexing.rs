//! Lexing for the document body
//!
//! The body is tokenized with logos into the handful of shapes the scanner cares about:
//! chunk open and close tags, code fence runs, newlines, and everything else as text.
//! Open tags are then checked by a small chumsky parser over their attribute list.
//!
//! There is no general markup grammar here. Anything that is not one of the tag shapes
//! is text, including other HTML.

pub mod attributes;
pub mod tokens;

pub use attributes::{parse_open_tag, TagError};
pub use tokens::{tokenize, Token};
