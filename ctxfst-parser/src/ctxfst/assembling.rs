//! Record assembly
//!
//! Turns validated pairs into [`ResolvedChunkRecord`]s in body order. Nothing is
//! assembled when the collector holds a structural diagnostic: a body whose chunk
//! boundaries cannot be trusted yields no records at all.

use crate::ctxfst::ast::{ChunkMetadata, Diagnostics, ResolvedChunkRecord};
use crate::ctxfst::validation::ValidatedPair;
use std::collections::BTreeMap;

pub fn assemble(
    pairs: BTreeMap<String, ValidatedPair>,
    source: Option<&str>,
    diagnostics: &Diagnostics,
) -> Vec<ResolvedChunkRecord> {
    if diagnostics.has_structural() {
        tracing::debug!("structural diagnostics present, no records assembled");
        return Vec::new();
    }

    let mut pairs: Vec<ValidatedPair> = pairs.into_values().collect();
    pairs.sort_by_key(|pair| pair.scanned.start_offset);

    pairs
        .into_iter()
        .map(|pair| {
            let metadata = pair
                .declaration
                .as_ref()
                .map(ChunkMetadata::from_declaration);
            ResolvedChunkRecord {
                id: pair.scanned.id,
                content: pair.scanned.content,
                metadata,
                source: source.map(str::to_string),
            }
        })
        .collect()
}
