//! Open tag attribute parsing
//!
//! Grammar of the text between `<Chunk` and `>`:
//!
//!     <attributes> = (<ws>+ <attribute>)* <ws>* "/"? <ws>*
//!     <attribute>  = <name> (<ws>* "=" <ws>* <value>)?
//!     <value>      = '"' [^"]* '"' | "'" [^']* "'" | <bare>
//!
//! The grammar is deliberately wider than what is accepted. A tag is well formed only
//! when it has exactly one attribute, named `id`, with a non-empty double-quoted value
//! and no self-closing slash. Parsing the wider grammar first lets the error name the
//! actual problem.

use chumsky::prelude::*;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    Double,
    Single,
    Bare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RawAttribute {
    name: String,
    value: Option<(Quoting, String)>,
}

/// Why an open tag was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("cannot parse tag attributes ({0})")]
    Syntax(String),
    #[error("chunk tags cannot be self-closing")]
    SelfClosing,
    #[error("missing `id` attribute")]
    MissingId,
    #[error("unexpected attribute `{0}`; only `id` is allowed")]
    UnexpectedAttribute(String),
    #[error("`id` is given more than once")]
    DuplicateAttribute,
    #[error("`id` must be double-quoted, found '{0}'")]
    SingleQuoted(String),
    #[error("`id` must be double-quoted, found {0}")]
    Unquoted(String),
    #[error("`id` has no value")]
    MissingValue,
    #[error("`id` is empty")]
    EmptyId,
}

impl TagError {
    /// The id the author most likely meant, when one can be read from the tag
    pub fn id_hint(&self) -> Option<&str> {
        match self {
            TagError::SingleQuoted(id) | TagError::Unquoted(id) => Some(id),
            _ => None,
        }
    }
}

fn attributes_parser() -> impl Parser<char, (Vec<RawAttribute>, bool), Error = Simple<char>> {
    let ws = filter::<_, _, Simple<char>>(|c: &char| *c == ' ' || *c == '\t');

    let name = filter::<_, _, Simple<char>>(|c: &char| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')
    })
    .repeated()
    .at_least(1)
    .collect::<String>();

    let double = just('"')
        .ignore_then(filter(|c: &char| *c != '"').repeated().collect::<String>())
        .then_ignore(just('"'))
        .map(|value| (Quoting::Double, value));
    let single = just('\'')
        .ignore_then(filter(|c: &char| *c != '\'').repeated().collect::<String>())
        .then_ignore(just('\''))
        .map(|value| (Quoting::Single, value));
    let bare = filter(|c: &char| !c.is_whitespace() && !matches!(c, '"' | '\'' | '/' | '='))
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(|value| (Quoting::Bare, value));

    let value = just('=')
        .padded_by(ws.clone().repeated())
        .ignore_then(choice((double, single, bare)));

    let attribute = name
        .then(value.or_not())
        .map(|(name, value)| RawAttribute { name, value });

    ws.clone()
        .repeated()
        .at_least(1)
        .ignore_then(attribute)
        .repeated()
        .then_ignore(ws.clone().repeated())
        .then(just('/').or_not().map(|slash| slash.is_some()))
        .then_ignore(ws.repeated())
        .then_ignore(end())
}

/// Check an `OpenTag` token and return its id
///
/// `raw` is the whole tag text as lexed, `<Chunk` through `>`.
pub fn parse_open_tag(raw: &str) -> Result<String, TagError> {
    let inner = raw
        .get(6..raw.len().saturating_sub(1))
        .unwrap_or_default();

    let (attributes, self_closing) = attributes_parser().parse(inner).map_err(|errors| {
        let reason = errors
            .into_iter()
            .next()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        TagError::Syntax(reason)
    })?;

    if self_closing {
        return Err(TagError::SelfClosing);
    }

    if let Some(other) = attributes.iter().find(|a| a.name != "id") {
        return Err(TagError::UnexpectedAttribute(other.name.clone()));
    }

    let mut ids = attributes.into_iter();
    let id = ids.next().ok_or(TagError::MissingId)?;
    if ids.next().is_some() {
        return Err(TagError::DuplicateAttribute);
    }

    match id.value {
        None => Err(TagError::MissingValue),
        Some((Quoting::Single, value)) => Err(TagError::SingleQuoted(value)),
        Some((Quoting::Bare, value)) => Err(TagError::Unquoted(value)),
        Some((Quoting::Double, value)) if value.is_empty() => Err(TagError::EmptyId),
        Some((Quoting::Double, value)) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("<Chunk id=\"skill:go\">", "skill:go")]
    #[case("<chunk id=\"skill:go\">", "skill:go")]
    #[case("<Chunk  id = \"skill:go\" >", "skill:go")]
    #[case("<Chunk\tid=\"Bad Id\">", "Bad Id")]
    fn test_accepts(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(parse_open_tag(raw), Ok(expected.to_string()));
    }

    #[rstest]
    #[case("<Chunk>", TagError::MissingId)]
    #[case("<Chunk id=\"a:b\" />", TagError::SelfClosing)]
    #[case("<Chunk id=\"a:b\"/>", TagError::SelfClosing)]
    #[case("<Chunk id='a:b'>", TagError::SingleQuoted("a:b".into()))]
    #[case("<Chunk id=a:b>", TagError::Unquoted("a:b".into()))]
    #[case("<Chunk id>", TagError::MissingValue)]
    #[case("<Chunk id=\"\">", TagError::EmptyId)]
    #[case("<Chunk id=\"a:b\" id=\"c:d\">", TagError::DuplicateAttribute)]
    #[case("<Chunk id=\"a:b\" class=\"x\">", TagError::UnexpectedAttribute("class".into()))]
    #[case("<Chunk name=\"a:b\">", TagError::UnexpectedAttribute("name".into()))]
    fn test_rejects(#[case] raw: &str, #[case] expected: TagError) {
        assert_eq!(parse_open_tag(raw), Err(expected));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse_open_tag("<Chunk id=\"a:b>"),
            Err(TagError::Syntax(_))
        ));
        assert!(matches!(
            parse_open_tag("<Chunk id=\"a:b\"x=\"y\">"),
            Err(TagError::Syntax(_))
        ));
    }

    #[test]
    fn test_id_hint() {
        assert_eq!(TagError::Unquoted("a:b".into()).id_hint(), Some("a:b"));
        assert_eq!(TagError::MissingId.id_hint(), None);
    }
}
