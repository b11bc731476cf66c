//! Rendering records back into a CtxFST document
//!
//! The rendered form is canonical: a preamble holding every declared record (only when
//! at least one record carries metadata), then each chunk on its own lines, separated
//! by a blank line:
//!
//!     ---
//!     chunks:
//!     - id: skill:go
//!       tags:
//!       - Go
//!     ---
//!
//!     <Chunk id="skill:go">
//!     content
//!     </Chunk>
//!
//! Parsing a rendered document yields the records it was rendered from.

use crate::ctxfst::ast::{ChunkKind, ChunkMetadata, Diagnostics, Priority, ResolvedChunkRecord};
use crate::ctxfst::preamble;
use chrono::NaiveDate;
use serde::{de, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;

#[derive(Serialize)]
struct PreambleOut<'a> {
    chunks: Vec<DeclarationOut<'a>>,
}

fn is_empty(list: &&[String]) -> bool {
    list.is_empty()
}

/// Preamble entry layout; empty fields are left out
#[derive(Serialize)]
struct DeclarationOut<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<ChunkKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(skip_serializing_if = "is_empty")]
    dependencies: &'a [String],
}

impl<'a> DeclarationOut<'a> {
    fn from_metadata(id: &'a str, metadata: &'a ChunkMetadata) -> Self {
        Self {
            id,
            tags: &metadata.tags,
            context: metadata.context.as_deref(),
            created_at: metadata.created_at,
            version: metadata.version,
            kind: metadata.kind,
            priority: metadata.priority,
            dependencies: &metadata.dependencies,
        }
    }

    fn stub(id: &'a str) -> Self {
        Self {
            id,
            tags: &[],
            context: None,
            created_at: None,
            version: None,
            kind: None,
            priority: None,
            dependencies: &[],
        }
    }
}

/// The `---` block for `records`, or `None` when no record carries metadata
///
/// Dependency targets that are not among the records get a bare `- id:` entry so the
/// dependency survives a re-parse.
pub fn render_preamble(records: &[ResolvedChunkRecord]) -> Result<Option<String>, serde_yaml::Error> {
    let declared: Vec<(&str, &ChunkMetadata)> = records
        .iter()
        .filter_map(|record| record.metadata.as_ref().map(|m| (record.id.as_str(), m)))
        .collect();
    if declared.is_empty() {
        return Ok(None);
    }

    let mut known: HashSet<&str> = declared.iter().map(|(id, _)| *id).collect();
    let mut chunks: Vec<DeclarationOut<'_>> = declared
        .iter()
        .map(|(id, metadata)| DeclarationOut::from_metadata(id, metadata))
        .collect();

    for (_, metadata) in &declared {
        for target in &metadata.dependencies {
            if known.insert(target.as_str()) {
                chunks.push(DeclarationOut::stub(target));
            }
        }
    }

    let yaml = serde_yaml::to_string(&PreambleOut { chunks })?;
    Ok(Some(format!("---\n{}---\n", yaml)))
}

/// Render records as a complete CtxFST document
pub fn render_document(records: &[ResolvedChunkRecord]) -> Result<String, serde_yaml::Error> {
    let mut document = String::new();
    if let Some(preamble) = render_preamble(records)? {
        document.push_str(&preamble);
        document.push('\n');
    }

    let chunks: Vec<String> = records
        .iter()
        .map(|record| format!("<Chunk id=\"{}\">\n{}\n</Chunk>\n", record.id, record.content))
        .collect();
    document.push_str(&chunks.join("\n"));

    Ok(document)
}

/// Write the contexts of `records` into the preamble of `text`
///
/// An existing preamble is edited in place: the first `chunks` entry with a record's id
/// gets its `context` set, records with no entry are appended, and every other entry,
/// key and value is kept. Without a preamble one is rendered from `records`. The body
/// is kept byte for byte, so prose between chunks survives.
pub fn splice_preamble(text: &str, records: &[ResolvedChunkRecord]) -> Result<String, serde_yaml::Error> {
    let Some((yaml, body_start)) = preamble::raw_yaml(text) else {
        let body_start = preamble::extract(text, &mut Diagnostics::new()).body_start;
        let body = &text[body_start..];
        return Ok(match render_preamble(records)? {
            Some(preamble) => format!("{}{}", preamble, body),
            None => body.to_string(),
        });
    };

    let mut mapping = match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Mapping::new(),
        Value::Mapping(mapping) => mapping,
        _ => return Err(de::Error::custom("the preamble is not a mapping")),
    };

    let chunks = mapping
        .entry(Value::from("chunks"))
        .or_insert_with(|| Value::Sequence(Vec::new()));
    if chunks.is_null() {
        *chunks = Value::Sequence(Vec::new());
    }
    let Value::Sequence(entries) = chunks else {
        return Err(de::Error::custom("`chunks` is not a list"));
    };

    for record in records {
        let Some(metadata) = &record.metadata else {
            continue;
        };
        let existing = entries.iter_mut().find_map(|entry| match entry {
            Value::Mapping(fields) if fields.get("id").and_then(Value::as_str) == Some(record.id.as_str()) => {
                Some(fields)
            }
            _ => None,
        });

        match existing {
            Some(fields) => {
                if let Some(context) = &metadata.context {
                    fields.insert(Value::from("context"), Value::from(context.as_str()));
                }
            }
            None => entries.push(serde_yaml::to_value(DeclarationOut::from_metadata(
                &record.id, metadata,
            ))?),
        }
    }

    Ok(format!(
        "---\n{}---\n{}",
        serde_yaml::to_string(&mapping)?,
        &text[body_start..]
    ))
}
