//! Whole-document tests over the fixture files
//!
//! Each fixture under tests/fixtures/ exercises one situation end to end:
//! - resume, legacy: clean documents, with and without a preamble
//! - unclosed, nested: structural failures, no records
//! - cycle, duplicates, invalid-fields, strict-mismatch: semantic problems, records kept

use chrono::NaiveDate;
use ctxfst_parser::ctxfst::ast::{ChunkKind, DiagnosticKind, DiagnosticSeverity, Priority};
use ctxfst_parser::ctxfst::testing::{diagnostic_kinds, record_ids, Fixture};
use ctxfst_parser::ctxfst::validation::OrphanSeverity;
use ctxfst_parser::ParseOptions;
use rstest::rstest;
use DiagnosticKind::*;

#[rstest]
#[case::resume("resume", 3, &[])]
#[case::legacy("legacy", 2, &[])]
#[case::unclosed("unclosed", 0, &[UnclosedChunk, OrphanDeclaration])]
#[case::nested("nested", 0, &[NestedChunk])]
#[case::cycle("cycle", 3, &[DanglingDependency, DependencyCycle])]
#[case::duplicates("duplicates", 1, &[DuplicateDeclaration])]
#[case::invalid_fields(
    "invalid-fields",
    2,
    &[
        InvalidFieldValue,
        InvalidFieldValue,
        InvalidFieldValue,
        InvalidFieldValue,
        UnknownField,
        InvalidIdentifierFormat,
    ]
)]
#[case::strict_mismatch("strict-mismatch", 2, &[OrphanDeclaration])]
fn test_fixture_outcome(
    #[case] name: &str,
    #[case] records: usize,
    #[case] expected: &[DiagnosticKind],
) {
    let output = Fixture::named(name).parse();
    assert_eq!(output.records.len(), records, "records of {name}");
    assert_eq!(diagnostic_kinds(&output), expected, "diagnostics of {name}");
}

#[test]
fn test_resume_records() {
    let output = Fixture::named("resume").parse();
    assert!(output.is_clean());
    assert_eq!(
        record_ids(&output),
        vec!["about:summary", "skill:python", "project:rag-pipeline"]
    );

    let summary = &output.records[0];
    assert_eq!(summary.content, "Backend engineer with eight years of experience.");
    assert_eq!(summary.source.as_deref(), Some("resume.md"));
    let metadata = summary.metadata.as_ref().unwrap();
    assert_eq!(metadata.tags, vec!["Profile"]);
    assert_eq!(metadata.created_at, NaiveDate::from_ymd_opt(2024, 5, 1));
    assert_eq!(metadata.version, Some(2));
    assert_eq!(metadata.kind, Some(ChunkKind::Text));
    assert_eq!(metadata.priority, Some(Priority::High));

    let python = &output.records[1];
    assert_eq!(python.tags(), ["Python", "Backend"]);
    assert_eq!(
        python.metadata.as_ref().unwrap().dependencies,
        vec!["about:summary"]
    );
}

#[test]
fn test_fenced_markers_are_content() {
    let output = Fixture::named("resume").parse();
    let python = &output.records[1];
    assert!(python.content.starts_with("## Python\n"));
    assert!(python
        .content
        .contains("# <Chunk id=\"not:real\"> stays inside the fence"));
    assert!(python.content.ends_with("```"));
}

#[test]
fn test_resume_is_clean_in_strict_mode() {
    let output = Fixture::named("resume").parse_with(&ParseOptions::strict());
    assert!(output.is_clean());
}

#[test]
fn test_legacy_records_have_no_metadata() {
    let output = Fixture::named("legacy").parse();
    assert_eq!(record_ids(&output), vec!["note:first", "note:second"]);
    assert!(output.records.iter().all(|r| !r.is_declared()));
    assert_eq!(output.records[1].content, "Second note.");
}

#[test]
fn test_unclosed_names_the_chunk() {
    let output = Fixture::named("unclosed").parse();
    assert!(output.has_structural_errors());

    let unclosed: Vec<_> = output.diagnostics.of_kind(UnclosedChunk).collect();
    assert_eq!(unclosed.len(), 1);
    assert_eq!(unclosed[0].id.as_deref(), Some("about:x"));
    assert_eq!(unclosed[0].line, Some(7));
    assert_eq!(unclosed[0].column, Some(1));
}

#[test]
fn test_nested_message() {
    let output = Fixture::named("nested").parse();
    let nested = &output.diagnostics.as_slice()[0];
    assert_eq!(nested.id.as_deref(), Some("topic:outer"));
    assert_eq!(nested.related_ids, vec!["topic:inner"]);
    assert_eq!(
        nested.to_string(),
        "error[nested-chunk]: chunk `topic:inner` is opened inside chunk `topic:outer`; chunks cannot nest at 3:1"
    );
}

#[test]
fn test_cycle_and_dangling_dependency() {
    let output = Fixture::named("cycle").parse();
    assert!(!output.has_errors());

    let cycle = output.diagnostics.of_kind(DependencyCycle).next().unwrap();
    assert_eq!(cycle.related_ids, vec!["skill:a", "skill:b", "skill:a"]);

    let dangling = output.diagnostics.of_kind(DanglingDependency).next().unwrap();
    assert_eq!(dangling.id.as_deref(), Some("skill:c"));
    assert_eq!(dangling.value.as_deref(), Some("skill:missing"));

    let dependencies: Vec<&[String]> = output
        .records
        .iter()
        .map(|r| r.metadata.as_ref().unwrap().dependencies.as_slice())
        .collect();
    assert_eq!(dependencies[0], ["skill:b"]);
    assert!(dependencies[2].is_empty());
}

#[test]
fn test_first_duplicate_declaration_wins() {
    let output = Fixture::named("duplicates").parse();
    let duplicate = output.diagnostics.of_kind(DuplicateDeclaration).next().unwrap();
    assert_eq!(duplicate.id.as_deref(), Some("skill:python"));
    assert_eq!(output.records[0].context(), Some("First declaration"));
}

#[test]
fn test_invalid_fields_are_emptied() {
    let output = Fixture::named("invalid-fields").parse();

    let fields: Vec<_> = output
        .diagnostics
        .of_kind(InvalidFieldValue)
        .map(|d| d.field.as_deref().unwrap())
        .collect();
    assert_eq!(fields, vec!["created_at", "version", "type", "priority"]);

    let unknown = output.diagnostics.of_kind(UnknownField).next().unwrap();
    assert_eq!(unknown.field.as_deref(), Some("owner"));
    assert_eq!(unknown.severity, DiagnosticSeverity::Information);

    let clip = output.records[0].metadata.as_ref().unwrap();
    assert_eq!(clip.context.as_deref(), Some("A clip with broken metadata"));
    assert_eq!(clip.version, None);
    assert_eq!(clip.priority, None);
    assert_eq!(clip.created_at, None);
    assert_eq!(clip.kind, None);
}

#[test]
fn test_invalid_identifier_keeps_content() {
    let output = Fixture::named("invalid-fields").parse();
    let invalid = output
        .diagnostics
        .of_kind(InvalidIdentifierFormat)
        .next()
        .unwrap();
    assert_eq!(invalid.id.as_deref(), Some("skill:Go"));

    let go = &output.records[1];
    assert_eq!(go.id, "skill:Go");
    assert_eq!(go.content, "Go services.");
    assert!(!go.is_declared());
}

#[test]
fn test_strict_mode_reports_both_directions() {
    let output = Fixture::named("strict-mismatch").parse_with(&ParseOptions::strict());
    assert_eq!(
        diagnostic_kinds(&output),
        vec![UndeclaredChunk, OrphanDeclaration]
    );
    assert!(output.has_errors());
    assert!(!output.has_structural_errors());
    assert_eq!(output.records.len(), 2);

    let undeclared = output.diagnostics.of_kind(UndeclaredChunk).next().unwrap();
    assert_eq!(undeclared.id.as_deref(), Some("skill:undeclared"));
}

#[rstest]
#[case::error(OrphanSeverity::Error, Some(DiagnosticSeverity::Error))]
#[case::warning(OrphanSeverity::Warning, Some(DiagnosticSeverity::Warning))]
#[case::info(OrphanSeverity::Info, Some(DiagnosticSeverity::Information))]
#[case::ignore(OrphanSeverity::Ignore, None)]
fn test_orphan_severity(
    #[case] orphan_severity: OrphanSeverity,
    #[case] expected: Option<DiagnosticSeverity>,
) {
    let options = ParseOptions {
        orphan_severity,
        ..ParseOptions::default()
    };
    let output = Fixture::named("strict-mismatch").parse_with(&options);
    let found = output
        .diagnostics
        .of_kind(OrphanDeclaration)
        .next()
        .map(|d| d.severity);
    assert_eq!(found, expected);
}

#[test]
fn test_strict_mode_never_ignores_orphans() {
    let options = ParseOptions {
        orphan_severity: OrphanSeverity::Ignore,
        ..ParseOptions::strict()
    };
    let output = Fixture::named("strict-mismatch").parse_with(&options);
    assert_eq!(output.diagnostics.of_kind(OrphanDeclaration).count(), 1);
}

fn dependency_chain(length: usize, closed: bool) -> String {
    let mut text = String::from("---\nchunks:\n");
    for i in 0..length {
        let next = if i + 1 < length {
            i + 1
        } else if closed {
            0
        } else {
            text.push_str(&format!("  - id: c:n{i}\n"));
            continue;
        };
        text.push_str(&format!("  - id: c:n{i}\n    dependencies: [c:n{next}]\n"));
    }
    text.push_str("---\n<Chunk id=\"c:n0\">head</Chunk>\n");
    text
}

#[test]
fn test_long_dependency_chains() {
    let options = ParseOptions {
        orphan_severity: OrphanSeverity::Ignore,
        ..ParseOptions::default()
    };

    let output = ctxfst_parser::parse_document(&dependency_chain(12_000, false), &options);
    assert!(output.is_clean(), "{:?}", diagnostic_kinds(&output));
    assert_eq!(record_ids(&output), vec!["c:n0"]);

    let output = ctxfst_parser::parse_document(&dependency_chain(12_000, true), &options);
    assert_eq!(diagnostic_kinds(&output), vec![DependencyCycle]);
    let cycle = output.diagnostics.of_kind(DependencyCycle).next().unwrap();
    assert_eq!(cycle.related_ids.len(), 12_001);
}
