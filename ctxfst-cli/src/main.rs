//! Command-line interface for CtxFST documents
//! This binary validates, exports, diagnoses and rewrites Markdown files cut into
//! `<Chunk id="...">` regions.
//!
//! Usage:
//!   ctxfst validate `<path>` [--mode strict] [--json]        - Report diagnostics
//!   ctxfst export `<path>` [--format jsonl] [-o `<file>`]     - Write records as JSON
//!   ctxfst diagnose `<path>` [--level suggest|fix]           - Retrieval quality checks
//!   ctxfst contextualize `<file>` [--dry-run] [-o `<file>`]   - Fill in chunk contexts
//!   ctxfst normalize `<file>`                                 - Print the canonical form
//!
//! Exit status is 0 on success, 1 when a document has error diagnostics (or warnings with
//! `--deny-warnings`), and 2 when the command could not run at all.

mod commands;
mod report;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use commands::{
    CliError, ContextualizeArgs, DiagnoseArgs, ExportArgs, NormalizeArgs, Outcome, ValidateArgs,
};
use ctxfst_config::{CtxfstConfig, Loader, PROJECT_FILE};
use ctxfst_parser::ctxfst::quality::QualityLevel;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn path_arg(help: &'static str) -> Arg {
    Arg::new("path")
        .help(help)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .index(1)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .help("Write to this file instead of the default destination")
        .value_parser(value_parser!(PathBuf))
}

/// Flags that change how documents are parsed, shared by every subcommand
fn parsing_args() -> [Arg; 3] {
    [
        Arg::new("mode")
            .long("mode")
            .help("Consistency mode between preamble and body")
            .value_parser(["strict", "permissive"]),
        Arg::new("orphans")
            .long("orphans")
            .help("Severity for declarations without a body chunk")
            .value_parser(["error", "warning", "info", "ignore"]),
        Arg::new("no-fences")
            .long("no-fences")
            .help("Scan chunk tags inside fenced code blocks too")
            .action(ArgAction::SetTrue),
    ]
}

fn build_cli() -> Command {
    Command::new("ctxfst")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for validating and processing CtxFST chunked Markdown")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Configuration file layered over the defaults and ./ctxfst.toml")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("Log more to stderr (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count),
        )
        .subcommand(
            Command::new("validate")
                .about("Check documents and report diagnostics")
                .arg(path_arg("File or directory to validate"))
                .args(parsing_args())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print diagnostics as JSON")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("excerpt")
                        .long("excerpt")
                        .help("Show the source lines around each diagnostic")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("deny-warnings")
                        .long("deny-warnings")
                        .help("Exit with status 1 on warnings too")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export chunk records as JSON for a vector store")
                .arg(path_arg("File or directory to export"))
                .args(parsing_args())
                .arg(output_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["json", "jsonl"]),
                )
                .arg(
                    Arg::new("pretty")
                        .long("pretty")
                        .short('p')
                        .help("Pretty-print JSON output")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("diagnose")
                .about("Check chunks for problems that hurt retrieval quality")
                .arg(path_arg("File or directory to diagnose"))
                .args(parsing_args())
                .arg(
                    Arg::new("level")
                        .long("level")
                        .short('l')
                        .help("How much detail to print")
                        .value_parser(["diagnose", "suggest", "fix"])
                        .default_value("diagnose"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("contextualize")
                .about("Generate a context for every chunk and write the updated document")
                .arg(path_arg("Document to contextualize"))
                .args(parsing_args())
                .arg(output_arg())
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Use placeholder contexts instead of running the context command")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("overwrite")
                        .long("overwrite")
                        .help("Replace contexts that are already set")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("command")
                        .long("command")
                        .help("Context command, program first (e.g. \"summarize --short\")"),
                ),
        )
        .subcommand(
            Command::new("normalize")
                .about("Print a document in canonical form")
                .arg(path_arg("Document to normalize"))
                .args(parsing_args())
                .arg(output_arg()),
        )
}

fn flag(matches: &ArgMatches, id: &str) -> bool {
    matches
        .try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

fn value<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a str> {
    matches
        .try_get_one::<String>(id)
        .ok()
        .flatten()
        .map(String::as_str)
}

/// Defaults, then ./ctxfst.toml, then --config, then command-line flags
fn load_config(global: &ArgMatches, sub: &ArgMatches) -> Result<CtxfstConfig, CliError> {
    let mut loader = Loader::new().with_optional_file(PROJECT_FILE);
    if let Some(path) = global.get_one::<PathBuf>("config") {
        loader = loader.with_file(path);
    }

    if let Some(mode) = value(sub, "mode") {
        loader = loader.set_override("parsing.mode", mode)?;
    }
    if let Some(orphans) = value(sub, "orphans") {
        loader = loader.set_override("parsing.orphan_severity", orphans)?;
    }
    if flag(sub, "no-fences") {
        loader = loader.set_override("parsing.skip_code_fences", false)?;
    }
    if let Some(format) = value(sub, "format") {
        loader = loader.set_override("export.format", format)?;
    }
    if flag(sub, "pretty") {
        loader = loader.set_override("export.pretty", true)?;
    }
    if flag(sub, "overwrite") {
        loader = loader.set_override("context.overwrite", true)?;
    }
    if let Some(command) = value(sub, "command") {
        let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        loader = loader.set_override("context.command", argv)?;
    }

    Ok(loader.build()?)
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(matches: &ArgMatches) -> Result<Outcome, CliError> {
    let Some((name, sub)) = matches.subcommand() else {
        return Ok(Outcome::Success);
    };
    let config = load_config(matches, sub)?;
    tracing::debug!(?config, "loaded configuration");

    let path = sub
        .get_one::<PathBuf>("path")
        .cloned()
        .unwrap_or_default();
    let output = sub.try_get_one::<PathBuf>("output").ok().flatten().cloned();

    match name {
        "validate" => commands::validate(
            &path,
            &config,
            &ValidateArgs {
                json: flag(sub, "json"),
                excerpt: flag(sub, "excerpt"),
                deny_warnings: flag(sub, "deny-warnings"),
            },
        ),
        "export" => commands::export(&path, &config, &ExportArgs { output }),
        "diagnose" => {
            let level = value(sub, "level")
                .and_then(|level| level.parse::<QualityLevel>().ok())
                .unwrap_or_default();
            commands::diagnose(
                &path,
                &config,
                &DiagnoseArgs {
                    level,
                    json: flag(sub, "json"),
                },
            )
        }
        "contextualize" => commands::contextualize_document(
            &path,
            &config,
            &ContextualizeArgs {
                output,
                dry_run: flag(sub, "dry-run"),
            },
        ),
        "normalize" => commands::normalize(&path, &config, &NormalizeArgs { output }),
        _ => Ok(Outcome::Success),
    }
}

fn main() -> ExitCode {
    let matches = build_cli().get_matches();
    init_logging(matches.get_count("verbose"));

    match run(&matches) {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::Failure) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(2)
        }
    }
}
