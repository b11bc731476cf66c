//! Context generation
//!
//! Fills the `context` field of records with a short description situating the chunk
//! within its document. Generation itself is pluggable through [`ContextGenerator`]:
//!
//! - [`DryRunGenerator`] produces a placeholder naming the chunk, no external calls
//! - [`CommandGenerator`] pipes a JSON request to an external program and reads the
//!   context from its stdout
//! - [`CachedGenerator`] wraps another generator and memoizes results by content hash
//!
//! The external program receives one JSON object per chunk on stdin:
//!
//!     {"document": "...", "chunk_id": "skill:python", "content": "..."}
//!
//! and must print the context on stdout and exit successfully.

use crate::ctxfst::ast::{ChunkMetadata, ResolvedChunkRecord};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no context command configured")]
    NoCommand,
    #[error("failed to run context command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("context command '{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("context command returned no output for '{chunk_id}'")]
    EmptyOutput { chunk_id: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to encode context request: {0}")]
    Request(#[from] serde_json::Error),
}

pub trait ContextGenerator {
    fn generate(&self, document: &str, chunk: &ResolvedChunkRecord) -> Result<String, ContextError>;
}

/// Placeholder contexts for previewing a run
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunGenerator;

impl ContextGenerator for DryRunGenerator {
    fn generate(&self, _document: &str, chunk: &ResolvedChunkRecord) -> Result<String, ContextError> {
        Ok(format!("[DRY RUN] Context would be generated for: {}", chunk.id))
    }
}

#[derive(Serialize)]
struct ContextRequest<'a> {
    document: &'a str,
    chunk_id: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a full argv, program first
    pub fn from_argv(argv: &[String]) -> Result<Self, ContextError> {
        match argv.split_first() {
            Some((program, args)) if !program.trim().is_empty() => {
                Ok(Self::new(program.clone(), args.to_vec()))
            }
            _ => Err(ContextError::NoCommand),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ContextGenerator for CommandGenerator {
    fn generate(&self, document: &str, chunk: &ResolvedChunkRecord) -> Result<String, ContextError> {
        let request = serde_json::to_vec(&ContextRequest {
            document,
            chunk_id: &chunk.id,
            content: &chunk.content,
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ContextError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Stdin is fed from its own thread while stdout and stderr drain here.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || -> io::Result<()> {
                // A program may exit without reading its input; its status decides.
                match stdin.write_all(&request) {
                    Err(err) if err.kind() != io::ErrorKind::BrokenPipe => Err(err),
                    _ => Ok(()),
                }
            })
        });

        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "context request writer panicked"))??;
        }
        if !output.status.success() {
            return Err(ContextError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let context = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if context.is_empty() {
            return Err(ContextError::EmptyOutput {
                chunk_id: chunk.id.clone(),
            });
        }

        tracing::trace!(chunk = %chunk.id, words = context.split_whitespace().count(), "context generated");
        Ok(context)
    }
}

/// Hex SHA-256 of chunk content, the cache key
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cache: {} hit(s), {} miss(es)", self.hits, self.misses)
    }
}

/// Memoizes another generator by content hash
pub struct CachedGenerator<G> {
    inner: G,
    cache: RefCell<HashMap<String, String>>,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl<G: ContextGenerator> CachedGenerator<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }
}

impl<G: ContextGenerator> ContextGenerator for CachedGenerator<G> {
    fn generate(&self, document: &str, chunk: &ResolvedChunkRecord) -> Result<String, ContextError> {
        let key = content_hash(&chunk.content);
        if let Some(context) = self.cache.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return Ok(context.clone());
        }

        let context = self.inner.generate(document, chunk)?;
        self.misses.set(self.misses.get() + 1);
        self.cache.borrow_mut().insert(key, context.clone());
        Ok(context)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ContextualizeReport {
    pub generated: usize,
    /// Records that already had a context and were left alone
    pub skipped: usize,
}

/// Generate contexts for `records` in place
///
/// Records with a non-empty context are skipped unless `overwrite` is set. Undeclared
/// records get a metadata block holding just the new context. Stops at the first
/// generator failure.
pub fn contextualize(
    records: &mut [ResolvedChunkRecord],
    document: &str,
    generator: &dyn ContextGenerator,
    overwrite: bool,
) -> Result<ContextualizeReport, ContextError> {
    let mut report = ContextualizeReport::default();
    let total = records.len();

    for (index, record) in records.iter_mut().enumerate() {
        let has_context = record.context().is_some_and(|c| !c.trim().is_empty());
        if has_context && !overwrite {
            report.skipped += 1;
            continue;
        }

        tracing::debug!(chunk = %record.id, "generating context {}/{}", index + 1, total);
        let context = generator.generate(document, record)?;
        record
            .metadata
            .get_or_insert_with(ChunkMetadata::default)
            .context = Some(context);
        report.generated += 1;
    }

    Ok(report)
}
