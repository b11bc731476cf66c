//! Resolved chunk record
//!
//!     The unit handed to callers: an id, the chunk content, and the declared metadata
//!     when a trusted declaration exists. Undeclared chunks carry no metadata block at
//!     all, which is different from a declared chunk whose fields are all empty.
//!
//!     Serialized flat, the way downstream stores expect it:
//!
//!         {"id": "skill:python", "content": "...", "tags": ["Python"], "context": "...",
//!          "created_at": "2024-05-01", "version": 2, "kind": "text", "priority": "high",
//!          "dependencies": [], "source": "resume.md"}

use super::declared::{ChunkKind, DeclaredChunk, Priority};
use chrono::NaiveDate;
use serde::Serialize;

/// Declared metadata with invalid fields already emptied
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChunkMetadata {
    pub tags: Vec<String>,
    pub context: Option<String>,
    pub created_at: Option<NaiveDate>,
    pub version: Option<u64>,
    pub kind: Option<ChunkKind>,
    pub priority: Option<Priority>,
    pub dependencies: Vec<String>,
}

impl ChunkMetadata {
    pub fn from_declaration(declared: &DeclaredChunk) -> Self {
        Self {
            tags: declared.tags.valid().cloned().unwrap_or_default(),
            context: declared.context.valid().cloned(),
            created_at: declared.created_at.valid().copied(),
            version: declared.version.valid().copied(),
            kind: declared.kind.valid().copied(),
            priority: declared.priority.valid().copied(),
            dependencies: declared.dependency_ids().to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedChunkRecord {
    pub id: String,
    pub content: String,
    #[serde(flatten)]
    pub metadata: Option<ChunkMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ResolvedChunkRecord {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: None,
            source: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn is_declared(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn context(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.context.as_deref())
    }

    pub fn tags(&self) -> &[String] {
        self.metadata.as_ref().map(|m| m.tags.as_slice()).unwrap_or(&[])
    }
}
