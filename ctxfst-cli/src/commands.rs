//! Subcommand implementations
//!
//! Every command returns an [`Outcome`] for documents it could process and a
//! [`CliError`] for anything that stopped it from processing them at all.

use crate::report::{write_diagnostics, Totals};
use ctxfst_config::{ConfigError, CtxfstConfig};
use ctxfst_parser::ctxfst::context::{
    contextualize, CachedGenerator, CommandGenerator, ContextError, DryRunGenerator,
};
use ctxfst_parser::ctxfst::export::{
    render_document, splice_preamble, ExportFormat, JsonArraySink, JsonLinesSink, RecordSink,
    SinkError,
};
use ctxfst_parser::ctxfst::loader::{
    discover_documents, DocumentLoader, LoaderError, DEFAULT_EXTENSIONS,
};
use ctxfst_parser::ctxfst::quality::{analyze, QualityLevel, QualityReport};
use ctxfst_parser::{ParseOptions, ParseOutput};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("failed to render document: {0}")]
    Render(#[from] serde_yaml::Error),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0} has structural errors; fix them before rewriting the document")]
    Structural(PathBuf),
}

/// Whether the processed documents passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    fn from_failed(failed: bool) -> Self {
        if failed {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }
}

/// A parsed document and its text
pub struct Parsed {
    pub source: String,
    pub text: String,
    pub output: ParseOutput,
}

/// Discover and parse every document under `path`, in parallel, keeping path order
pub fn parse_all(path: &Path, options: &ParseOptions) -> Result<Vec<Parsed>, CliError> {
    let paths = discover_documents(path, DEFAULT_EXTENSIONS)?;
    tracing::info!(documents = paths.len(), "parsing");

    let parsed = paths
        .par_iter()
        .map(|path| -> Result<Parsed, LoaderError> {
            let loader = DocumentLoader::from_path(path)?;
            let output = loader.parse(options);
            let document = loader.into_document();
            Ok(Parsed {
                source: document.source,
                text: document.text,
                output,
            })
        })
        .collect::<Result<Vec<_>, LoaderError>>()?;
    Ok(parsed)
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub struct ValidateArgs {
    pub json: bool,
    pub excerpt: bool,
    pub deny_warnings: bool,
}

pub fn validate(path: &Path, config: &CtxfstConfig, args: &ValidateArgs) -> Result<Outcome, CliError> {
    let documents = parse_all(path, &config.parsing)?;
    let mut totals = Totals::default();
    for document in &documents {
        totals.add(&document.output.diagnostics);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.json {
        let report: Vec<serde_json::Value> = documents
            .iter()
            .map(|document| {
                serde_json::json!({
                    "source": document.source,
                    "records": document.output.records.len(),
                    "diagnostics": document.output.diagnostics,
                })
            })
            .collect();
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        for document in documents.iter().filter(|d| !d.output.diagnostics.is_empty()) {
            writeln!(out)?;
            writeln!(out, "{}", document.source)?;
            write_diagnostics(
                &mut out,
                &document.source,
                &document.text,
                &document.output.diagnostics,
                args.excerpt,
            )?;
        }
        writeln!(out)?;
        writeln!(out, "{}", "=".repeat(50))?;
        writeln!(out, "{}", totals.summary())?;
    }

    Ok(Outcome::from_failed(totals.failed(args.deny_warnings)))
}

pub struct ExportArgs {
    pub output: Option<PathBuf>,
}

pub fn export(path: &Path, config: &CtxfstConfig, args: &ExportArgs) -> Result<Outcome, CliError> {
    let documents = parse_all(path, &config.parsing)?;

    let writer: Box<dyn Write> = match &args.output {
        Some(output) => Box::new(io::BufWriter::new(fs::File::create(output).map_err(
            |source| CliError::Write {
                path: output.clone(),
                source,
            },
        )?)),
        None => Box::new(io::BufWriter::new(io::stdout())),
    };
    let mut sink: Box<dyn RecordSink> = match config.export.format {
        ExportFormat::Json => Box::new(JsonArraySink::new(writer, config.export.pretty)),
        ExportFormat::Jsonl => Box::new(JsonLinesSink::new(writer)),
    };

    let mut totals = Totals::default();
    let stderr = io::stderr();
    for document in &documents {
        totals.add(&document.output.diagnostics);
        if document.output.has_structural_errors() {
            write_diagnostics(
                &mut stderr.lock(),
                &document.source,
                &document.text,
                &document.output.diagnostics,
                false,
            )?;
        }
        sink.write_document(Some(&document.source), &document.output.records)?;
        tracing::info!(source = %document.source, records = document.output.records.len(), "exported");
    }
    let written = sink.finish()?;

    eprintln!(
        "Exported {} chunk(s) from {} file(s)",
        written,
        documents.len()
    );
    Ok(Outcome::from_failed(totals.failed(false)))
}

pub struct DiagnoseArgs {
    pub level: QualityLevel,
    pub json: bool,
}

pub fn diagnose(path: &Path, config: &CtxfstConfig, args: &DiagnoseArgs) -> Result<Outcome, CliError> {
    let documents = parse_all(path, &config.parsing)?;
    let reports: Vec<QualityReport> = documents
        .par_iter()
        .map(|document| analyze(&document.output.records, Some(&document.source), &config.diagnose))
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.json {
        let values: Vec<serde_json::Value> = reports
            .iter()
            .map(|report| report.to_json_value(args.level))
            .collect();
        serde_json::to_writer_pretty(&mut out, &values)?;
        writeln!(out)?;
    } else {
        for report in &reports {
            writeln!(out, "{}", report.render_text(args.level))?;
            let fixes = report.fixes();
            if args.level == QualityLevel::Fix && !fixes.is_empty() {
                writeln!(out)?;
                writeln!(out, "Proposed preamble changes:")?;
                writeln!(out, "{}", serde_json::to_string_pretty(&fixes)?)?;
            }
            writeln!(out)?;
        }
    }

    Ok(Outcome::from_failed(reports.iter().any(QualityReport::has_errors)))
}

pub struct ContextualizeArgs {
    pub output: Option<PathBuf>,
    pub dry_run: bool,
}

/// `notes/cv.md` becomes `notes/cv.contextualized.md`
pub fn contextualized_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.contextualized.{}", stem, ext.to_string_lossy()),
        None => format!("{}.contextualized", stem),
    };
    path.with_file_name(name)
}

/// Load a single document, refusing it when it has structural errors
fn load_for_rewrite(path: &Path, options: &ParseOptions) -> Result<Parsed, CliError> {
    let loader = DocumentLoader::from_path(path)?;
    let output = loader.parse(options);
    let document = loader.into_document();

    if output.has_structural_errors() {
        write_diagnostics(
            &mut io::stderr().lock(),
            &document.source,
            &document.text,
            &output.diagnostics,
            true,
        )?;
        return Err(CliError::Structural(path.to_path_buf()));
    }
    Ok(Parsed {
        source: document.source,
        text: document.text,
        output,
    })
}

pub fn contextualize_document(
    path: &Path,
    config: &CtxfstConfig,
    args: &ContextualizeArgs,
) -> Result<Outcome, CliError> {
    let Parsed { source, text, output } = load_for_rewrite(path, &config.parsing)?;
    let mut records = output.records;
    let overwrite = config.context.overwrite;

    println!("Processing: {}", source);
    println!("Found {} chunk(s) to process", records.len());

    let report = if args.dry_run {
        println!("(DRY RUN - no context command will be run)");
        contextualize(&mut records, &text, &DryRunGenerator, overwrite)?
    } else {
        let generator = CachedGenerator::new(CommandGenerator::from_argv(&config.context.command)?);
        let report = contextualize(&mut records, &text, &generator, overwrite)?;
        println!("{}", generator.stats());
        report
    };

    let destination = args
        .output
        .clone()
        .unwrap_or_else(|| contextualized_path(path));
    write_file(&destination, &splice_preamble(&text, &records)?)?;

    println!(
        "Generated {} context(s), kept {} existing",
        report.generated, report.skipped
    );
    println!("Output written to: {}", destination.display());
    Ok(Outcome::Success)
}

pub struct NormalizeArgs {
    pub output: Option<PathBuf>,
}

pub fn normalize(path: &Path, config: &CtxfstConfig, args: &NormalizeArgs) -> Result<Outcome, CliError> {
    let parsed = load_for_rewrite(path, &config.parsing)?;
    let rendered = render_document(&parsed.output.records)?;

    match &args.output {
        Some(destination) => write_file(destination, &rendered)?,
        None => print!("{}", rendered),
    }
    Ok(Outcome::from_failed(parsed.output.has_errors()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contextualized_path() {
        assert_eq!(
            contextualized_path(Path::new("notes/cv.md")),
            PathBuf::from("notes/cv.contextualized.md")
        );
        assert_eq!(
            contextualized_path(Path::new("README")),
            PathBuf::from("README.contextualized")
        );
    }
}
