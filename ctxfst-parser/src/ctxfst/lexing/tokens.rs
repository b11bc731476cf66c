//! Token definitions for the CtxFST body
//!
//! The tag name is matched case-insensitively. Tags never span lines.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token {
    /// `<Chunk ...>`, attributes not yet checked
    #[regex(r"<[Cc][Hh][Uu][Nn][Kk]([ \t][^>\n]*)?>")]
    OpenTag,

    /// `</Chunk>`, optional whitespace before `>`
    #[regex(r"</[Cc][Hh][Uu][Nn][Kk][ \t]*>")]
    CloseTag,

    /// A run of three or more backticks or tildes
    #[regex(r"```+|~~~+")]
    Fence,

    #[regex(r"\r?\n")]
    Newline,

    // Text content (catch-all for non-special characters)
    #[regex(r"[^<`~\r\n]+")]
    Text,

    /// A lone special character that did not start a longer token
    #[regex(r"[<`~\r]")]
    Char,
}

impl Token {
    pub fn is_tag(&self) -> bool {
        matches!(self, Token::OpenTag | Token::CloseTag)
    }

    /// Tokens that can only be content
    pub fn is_text(&self) -> bool {
        matches!(self, Token::Text | Token::Char)
    }
}

/// Tokenize body text with byte spans
///
/// Lexer errors cannot really happen with the catch-all patterns, but any that do are
/// kept as text so no input byte is lost.
pub fn tokenize(source: &str) -> impl Iterator<Item = (Token, Range<usize>)> + '_ {
    let mut lexer = Token::lexer(source);
    std::iter::from_fn(move || {
        let result = lexer.next()?;
        Some((result.unwrap_or(Token::Text), lexer.span()))
    })
}
