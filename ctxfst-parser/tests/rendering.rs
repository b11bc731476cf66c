//! Rendering, splicing and export of parsed documents

use ctxfst_parser::ctxfst::context::{contextualize, DryRunGenerator};
use ctxfst_parser::ctxfst::export::{render_document, splice_preamble, ExportedDocument};
use ctxfst_parser::ctxfst::preamble;
use ctxfst_parser::ctxfst::ast::Diagnostics;
use ctxfst_parser::ctxfst::testing::Fixture;
use ctxfst_parser::{parse_document, ParseOptions};

#[test]
fn test_render_without_preamble() {
    let output = Fixture::named("legacy").parse();
    let rendered = render_document(&output.records).unwrap();

    insta::assert_snapshot!(rendered, @r###"
    <Chunk id="note:first">
    First note.
    </Chunk>

    <Chunk id="note:second">
    Second note.
    </Chunk>
    "###);
}

#[test]
fn test_render_with_preamble() {
    let text = "---\nchunks:\n  - id: skill:go\n    tags: [Go]\n    context: Go services\n    priority: high\n---\n<Chunk id=\"skill:go\">Go code</Chunk>\nSome prose.\n<Chunk id=\"about:me\">\nHi\n</Chunk>\n";
    let output = parse_document(text, &ParseOptions::default());
    let rendered = render_document(&output.records).unwrap();

    insta::assert_snapshot!(rendered, @r###"
    ---
    chunks:
    - id: skill:go
      tags:
      - Go
      context: Go services
      priority: high
    ---

    <Chunk id="skill:go">
    Go code
    </Chunk>

    <Chunk id="about:me">
    Hi
    </Chunk>
    "###);
}

#[test]
fn test_rendering_is_idempotent_on_fixtures() {
    for name in ["resume", "legacy", "cycle", "duplicates"] {
        let output = Fixture::named(name).parse();
        let mut records = output.records;
        for record in &mut records {
            record.source = None;
        }

        let rendered = render_document(&records).unwrap();
        let reparsed = parse_document(&rendered, &ParseOptions::default());
        assert_eq!(reparsed.records, records, "{name}");
        assert_eq!(render_document(&reparsed.records).unwrap(), rendered, "{name}");
    }
}

#[test]
fn test_contextualize_and_splice_keeps_body() {
    let fixture = Fixture::named("legacy");
    let text = fixture.source();
    let mut records = fixture.parse().records;

    let report = contextualize(&mut records, &text, &DryRunGenerator, false).unwrap();
    assert_eq!(report.generated, 2);

    let spliced = splice_preamble(&text, &records).unwrap();
    assert!(spliced.starts_with("---\nchunks:\n"));
    assert!(spliced.ends_with(&text));

    let reparsed = parse_document(&spliced, &ParseOptions::default());
    assert!(reparsed.is_clean());
    assert_eq!(
        reparsed.records[0].context(),
        Some("[DRY RUN] Context would be generated for: note:first")
    );
    assert_eq!(reparsed.records[0].content, "First note.");
}

#[test]
fn test_splice_replaces_existing_preamble() {
    let fixture = Fixture::named("resume");
    let text = fixture.source();
    let mut records = fixture.parse().records;
    contextualize(&mut records, &text, &DryRunGenerator, true).unwrap();

    let spliced = splice_preamble(&text, &records).unwrap();
    let body_start = preamble::extract(&text, &mut Diagnostics::new()).body_start;
    assert!(spliced.ends_with(&text[body_start..]));
    assert_eq!(spliced.matches("chunks:").count(), 1);

    let reparsed = parse_document(&spliced, &ParseOptions::default());
    assert!(reparsed.is_clean());
    assert!(reparsed
        .records
        .iter()
        .all(|r| r.context().unwrap().starts_with("[DRY RUN]")));
}

#[test]
fn test_exported_document_shape() {
    let output = Fixture::named("invalid-fields").parse();
    let exported = ExportedDocument::new(Some("invalid-fields.md".to_string()), output);
    let json: serde_json::Value = serde_json::from_str(&exported.to_json(false).unwrap()).unwrap();

    assert_eq!(json["source"], "invalid-fields.md");
    assert_eq!(json["records"][0]["id"], "media:clip");
    assert_eq!(json["records"][0]["source"], "invalid-fields.md");
    assert_eq!(json["records"][0]["version"], serde_json::Value::Null);
    assert!(json["records"][1].get("tags").is_none());
    assert_eq!(json["diagnostics"][0]["kind"], "invalid-field-value");
    assert_eq!(json["diagnostics"][0]["field"], "created_at");
}
