//! Export of resolved records
//!
//! - [`ExportedDocument`]: one parsed document as JSON, records plus diagnostics
//! - [`render`]: records back to CtxFST text
//! - [`sink`]: streaming record writers for downstream stores

pub mod render;
pub mod sink;

pub use render::{render_document, render_preamble, splice_preamble};
pub use sink::{JsonArraySink, JsonLinesSink, RecordSink, SinkError};

use crate::ctxfst::ast::{Diagnostics, ResolvedChunkRecord};
use crate::ctxfst::pipeline::ParseOutput;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub records: Vec<ResolvedChunkRecord>,
    pub diagnostics: Diagnostics,
}

impl ExportedDocument {
    pub fn new(source: Option<String>, output: ParseOutput) -> Self {
        Self {
            source,
            records: output.records,
            diagnostics: output.diagnostics,
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Record serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One JSON array holding every record
    #[default]
    Json,
    /// One JSON object per line
    Jsonl,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "jsonl" => Ok(ExportFormat::Jsonl),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}
