//! Document loading utilities
//!
//! This module provides `DocumentLoader`, which reads CtxFST text from a file or a string
//! and runs the parse pipeline on it, plus `discover_documents` for walking a directory
//! tree. Both the CLI and the tests load documents through here.
//!
//! # Example
//!
//! ```rust
//! use ctxfst_parser::ctxfst::loader::{discover_documents, DocumentLoader};
//! use ctxfst_parser::ParseOptions;
//!
//! // From file
//! let loader = DocumentLoader::from_path("resume.md").unwrap();
//! let output = loader.parse(&ParseOptions::default());
//!
//! // From string
//! let loader = DocumentLoader::from_string("<Chunk id=\"about:x\">hello</Chunk>");
//! let output = loader.parse(&ParseOptions::default());
//!
//! // Every Markdown file under a directory, sorted
//! let paths = discover_documents("docs/", &["md"]).unwrap();
//! ```

use crate::ctxfst::pipeline::{parse_document, parse_document_with_source, ParseOptions, ParseOutput};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions picked up when walking a directory
pub const DEFAULT_EXTENSIONS: &[&str] = &["md"];

/// Error that can occur when loading documents
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A document's text together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub source: String,
    pub text: String,
}

/// Document loader with a parse shortcut
pub struct DocumentLoader {
    source: Option<String>,
    text: String,
}

impl DocumentLoader {
    /// Load from a file path; the path becomes the record source
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LoaderError::NotFound(path.to_path_buf())
            } else {
                LoaderError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "loaded document");
        Ok(DocumentLoader {
            source: Some(path.display().to_string()),
            text,
        })
    }

    /// Load from a string
    pub fn from_string<S: Into<String>>(text: S) -> Self {
        DocumentLoader {
            source: None,
            text: text.into(),
        }
    }

    /// Parse the text, attaching the file path as source when there is one
    pub fn parse(&self, options: &ParseOptions) -> ParseOutput {
        match &self.source {
            Some(source) => parse_document_with_source(&self.text, source, options),
            None => parse_document(&self.text, options),
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_document(self) -> SourceDocument {
        SourceDocument {
            source: self.source.unwrap_or_else(|| "<input>".to_string()),
            text: self.text,
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Resolve a file or directory argument into document paths
///
/// A file is returned as-is whatever its extension. A directory is walked recursively and
/// files with one of `extensions` are returned in sorted order.
pub fn discover_documents<P: AsRef<Path>>(
    path: P,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, LoaderError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoaderError::NotFound(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|source| LoaderError::Walk {
            path: path.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    tracing::debug!(root = %path.display(), documents = found.len(), "discovered documents");
    Ok(found)
}

/// Load every document under `path`
pub fn load_documents<P: AsRef<Path>>(
    path: P,
    extensions: &[&str],
) -> Result<Vec<SourceDocument>, LoaderError> {
    discover_documents(path, extensions)?
        .into_iter()
        .map(|path| DocumentLoader::from_path(path).map(DocumentLoader::into_document))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_from_string_has_no_source() {
        let loader = DocumentLoader::from_string("<Chunk id=\"about:x\">hello</Chunk>");
        let output = loader.parse(&ParseOptions::default());
        assert_eq!(loader.source(), None);
        assert_eq!(output.records[0].source, None);
    }

    #[test]
    fn test_from_path_sets_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.md");
        fs::write(&path, "<Chunk id=\"about:x\">hello</Chunk>").unwrap();

        let loader = DocumentLoader::from_path(&path).unwrap();
        let output = loader.parse(&ParseOptions::default());
        assert_eq!(output.records[0].source.as_deref(), Some(path.display().to_string().as_str()));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DocumentLoader::from_path(dir.path().join("nope.md"))
            .err()
            .unwrap();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn test_discover_sorted_markdown_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.md"), "").unwrap();
        fs::write(dir.path().join("a.MD"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("nested/c.md"), "").unwrap();

        let found = discover_documents(dir.path(), DEFAULT_EXTENSIONS).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.MD"),
                PathBuf::from("b.md"),
                PathBuf::from("nested/c.md")
            ]
        );
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "").unwrap();
        assert_eq!(discover_documents(&path, DEFAULT_EXTENSIONS).unwrap(), vec![path]);
    }

    #[test]
    fn test_load_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.md"), "first").unwrap();
        let docs = load_documents(dir.path(), DEFAULT_EXTENSIONS).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "first");
        assert!(docs[0].source.ends_with("one.md"));
    }
}
