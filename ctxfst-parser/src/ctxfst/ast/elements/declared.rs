//! Declared chunk
//!
//!     One entry of the preamble's `chunks` list:
//!
//!         - id: skill:python
//!           tags: [Python, Backend]
//!           context: Author's Python experience across backend services
//!           created_at: 2024-05-01
//!           version: 2
//!           type: text
//!           priority: high
//!           dependencies: [skill:sql]
//!
//!     Only `id` is required. Every other slot is a [Field] so an unusable value is
//!     recorded instead of being silently dropped or defaulted.

use super::field::Field;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media kind of a chunk (preamble key `type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Text,
    Image,
    Video,
    Audio,
}

impl FromStr for ChunkKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ChunkKind::Text),
            "image" => Ok(ChunkKind::Image),
            "video" => Ok(ChunkKind::Video),
            "audio" => Ok(ChunkKind::Audio),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkKind::Text => write!(f, "text"),
            ChunkKind::Image => write!(f, "image"),
            ChunkKind::Video => write!(f, "video"),
            ChunkKind::Audio => write!(f, "audio"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// A chunk as declared in the preamble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredChunk {
    pub id: String,
    /// Ordered set: duplicates are removed, first occurrence wins
    pub tags: Field<Vec<String>>,
    pub context: Field<String>,
    pub created_at: Field<NaiveDate>,
    pub version: Field<u64>,
    pub kind: Field<ChunkKind>,
    pub priority: Field<Priority>,
    pub dependencies: Field<Vec<String>>,
    /// Byte offset of the entry's `id` in the document, when it could be located
    pub offset: Option<usize>,
}

impl DeclaredChunk {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tags: Field::Absent,
            context: Field::Absent,
            created_at: Field::Absent,
            version: Field::Absent,
            kind: Field::Absent,
            priority: Field::Absent,
            dependencies: Field::Absent,
            offset: None,
        }
    }

    pub fn at(mut self, offset: Option<usize>) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Field::Valid(context.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Field::Valid(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Field::Valid(dependencies.into_iter().map(Into::into).collect());
        self
    }

    /// Valid dependency ids, or nothing
    pub fn dependency_ids(&self) -> &[String] {
        self.dependencies.valid().map(Vec::as_slice).unwrap_or(&[])
    }
}
