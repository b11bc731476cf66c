//! Shared configuration loader for the ctxfst tools.
//!
//! `defaults/ctxfst.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`CtxfstConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use ctxfst_parser::ctxfst::export::ExportFormat;
use ctxfst_parser::ctxfst::quality::QualityThresholds;
use ctxfst_parser::ParseOptions;
use serde::Deserialize;
use std::path::Path;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/ctxfst.default.toml");

/// Name of the optional per-project configuration file
pub const PROJECT_FILE: &str = "ctxfst.toml";

/// Top-level configuration consumed by ctxfst applications.
#[derive(Debug, Clone, Deserialize)]
pub struct CtxfstConfig {
    pub parsing: ParseOptions,
    pub export: ExportConfig,
    pub diagnose: QualityThresholds,
    pub context: ContextConfig,
}

/// Output shape of `ctxfst export`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub pretty: bool,
}

/// Context generation for `ctxfst contextualize`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Program and arguments; empty means no generator is configured
    pub command: Vec<String>,
    pub overwrite: bool,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (CLI flags).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<CtxfstConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<CtxfstConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxfst_parser::ctxfst::validation::{ConsistencyMode, OrphanSeverity};
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.parsing, ParseOptions::default());
        assert_eq!(config.export.format, ExportFormat::Json);
        assert!(!config.export.pretty);
        assert_eq!(config.diagnose, QualityThresholds::default());
        assert!(config.context.command.is_empty());
        assert!(!config.context.overwrite);
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("parsing.mode", "strict")
            .expect("override to apply")
            .set_override("export.format", "jsonl")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.parsing.mode, ConsistencyMode::Strict);
        assert_eq!(config.export.format, ExportFormat::Jsonl);
    }

    #[test]
    fn layers_files_over_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "[parsing]\norphan_severity = \"ignore\"\n\n[diagnose]\nsimilarity = 0.75\n\n[context]\ncommand = [\"summarize\", \"--short\"]"
        )
        .expect("write config");

        let config = Loader::new()
            .with_file(file.path())
            .build()
            .expect("config to build");
        assert_eq!(config.parsing.orphan_severity, OrphanSeverity::Ignore);
        assert_eq!(config.parsing.mode, ConsistencyMode::Permissive);
        assert_eq!(config.diagnose.similarity, 0.75);
        assert_eq!(config.diagnose.min_context_words, 8);
        assert_eq!(config.context.command, vec!["summarize", "--short"]);
    }

    #[test]
    fn missing_required_file_fails() {
        let result = Loader::new().with_file("/nonexistent/ctxfst.toml").build();
        assert!(result.is_err());
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/ctxfst.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.parsing, ParseOptions::default());
    }

    #[test]
    fn rejects_unknown_mode() {
        let result = Loader::new()
            .set_override("parsing.mode", "lenient")
            .expect("override to apply")
            .build();
        assert!(result.is_err());
    }
}
