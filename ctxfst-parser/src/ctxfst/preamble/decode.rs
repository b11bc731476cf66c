//! Schema decoder for preamble entries
//!
//! Each known key maps to one typed slot of [`DeclaredChunk`]. A value that does not
//! fit its slot becomes [`Field::Invalid`] with the raw text kept, and an
//! `InvalidFieldValue` diagnostic is recorded. Decoding always moves on to the next
//! field and the next entry.

use crate::ctxfst::ast::{ChunkKind, DeclaredChunk, Diagnostic, Diagnostics, Field, Priority};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;

const KNOWN_KEYS: &[&str] = &[
    "id",
    "tags",
    "context",
    "created_at",
    "version",
    "type",
    "kind",
    "priority",
    "dependencies",
];

static ID_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:-\s+)?id\s*:\s*(\S.*?)\s*$").unwrap());
static CHUNKS_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^chunks\s*:").unwrap());

/// Maps decoded entries back to byte offsets in the document
///
/// YAML values lose their positions once parsed, so the locator scans the raw
/// preamble lines for `id:` keys. Repeated ids resolve to successive occurrences.
pub(super) struct EntryLocator {
    offsets: HashMap<String, VecDeque<usize>>,
    chunks_offset: usize,
}

impl EntryLocator {
    pub(super) fn new(source: &str, yaml_start: usize, yaml_end: usize) -> Self {
        let mut offsets: HashMap<String, VecDeque<usize>> = HashMap::new();
        let mut chunks_offset = yaml_start;
        let mut offset = yaml_start;

        for line in source[yaml_start..yaml_end].split_inclusive('\n') {
            let text = line.trim_end_matches(['\n', '\r']);
            if CHUNKS_LINE.is_match(text) {
                chunks_offset = offset;
            }
            if let Some(captures) = ID_LINE.captures(text) {
                if let Some(value) = captures.get(1) {
                    let (id, skipped) = unquote(strip_comment(value.as_str()));
                    offsets
                        .entry(id.to_string())
                        .or_default()
                        .push_back(offset + value.start() + skipped);
                }
            }
            offset += line.len();
        }

        Self {
            offsets,
            chunks_offset,
        }
    }

    pub(super) fn chunks_offset(&self) -> usize {
        self.chunks_offset
    }

    /// Offset of the next unclaimed `id: <id>` line
    pub(super) fn locate(&mut self, id: &str) -> Option<usize> {
        self.offsets.get_mut(id)?.pop_front()
    }
}

fn strip_comment(value: &str) -> &str {
    match value.find(" #") {
        Some(index) => value[..index].trim_end(),
        None => value,
    }
}

/// Returns the unquoted value and how many bytes were skipped at the front
fn unquote(value: &str) -> (&str, usize) {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return (&value[1..value.len() - 1], 1);
        }
    }
    (value, 0)
}

/// Text of a YAML value as written, for diagnostics and [`Field::Invalid`]
fn raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{:?}", other)),
    }
}

struct FieldDecoder<'a> {
    id: &'a str,
    offset: Option<usize>,
    diagnostics: &'a mut Diagnostics,
}

impl FieldDecoder<'_> {
    fn decode<T>(
        &mut self,
        mapping: &Mapping,
        key: &str,
        convert: impl Fn(&Value) -> Option<T>,
    ) -> Field<T> {
        match mapping.get(key) {
            None | Some(Value::Null) => Field::Absent,
            Some(value) => match convert(value) {
                Some(decoded) => Field::Valid(decoded),
                None => {
                    let raw = raw(value);
                    self.diagnostics.push(Diagnostic::invalid_field_value(
                        self.id,
                        key,
                        &raw,
                        self.offset,
                    ));
                    Field::Invalid(raw)
                }
            },
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_sequence()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn tag_set(value: &Value) -> Option<Vec<String>> {
    let mut tags: Vec<String> = Vec::new();
    for tag in string_list(value)? {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Some(tags)
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?;
    // chrono accepts single-digit months and days; the format does not
    if text.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn version(value: &Value) -> Option<u64> {
    value.as_u64()
}

fn keyword<T: FromStr>(value: &Value) -> Option<T> {
    value.as_str()?.parse().ok()
}

/// Decode one `chunks` entry. Returns `None` when the entry has to be skipped.
pub(super) fn decode_entry(
    index: usize,
    entry: &Value,
    locator: &mut EntryLocator,
    diagnostics: &mut Diagnostics,
) -> Option<DeclaredChunk> {
    let Value::Mapping(mapping) = entry else {
        diagnostics.push(Diagnostic::invalid_preamble(
            format!("entry #{} of `chunks` is not a mapping; entry skipped", index + 1),
            locator.chunks_offset(),
        ));
        return None;
    };

    let id = match mapping.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        _ => {
            diagnostics.push(Diagnostic::missing_identifier(
                index,
                Some(locator.chunks_offset()),
            ));
            return None;
        }
    };

    let offset = locator.locate(&id);
    let mut declared = DeclaredChunk::new(id.as_str()).at(offset);
    let kind_key = if mapping.contains_key("type") { "type" } else { "kind" };

    let mut decoder = FieldDecoder {
        id: &id,
        offset,
        diagnostics: &mut *diagnostics,
    };
    declared.tags = decoder.decode(mapping, "tags", tag_set);
    declared.context = decoder.decode(mapping, "context", text);
    declared.created_at = decoder.decode(mapping, "created_at", date);
    declared.version = decoder.decode(mapping, "version", version);
    declared.kind = decoder.decode(mapping, kind_key, keyword::<ChunkKind>);
    declared.priority = decoder.decode(mapping, "priority", keyword::<Priority>);
    declared.dependencies = decoder.decode(mapping, "dependencies", string_list);

    for (key, _) in mapping.iter() {
        let name = raw(key);
        let shadowed_alias = name == "kind" && kind_key == "type";
        if shadowed_alias || !KNOWN_KEYS.contains(&name.as_str()) {
            diagnostics.push(Diagnostic::unknown_field(&id, &name, offset));
        }
    }

    Some(declared)
}
