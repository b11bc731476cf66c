//! Record sinks
//!
//! A sink receives the records of one document at a time and writes them in a format a
//! downstream store can ingest. [`JsonArraySink`] produces the single JSON array vector
//! stores import in one go; [`JsonLinesSink`] streams one record per line.

use crate::ctxfst::ast::ResolvedChunkRecord;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write records: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait RecordSink {
    /// Accept the records of one document
    fn write_document(
        &mut self,
        source: Option<&str>,
        records: &[ResolvedChunkRecord],
    ) -> Result<(), SinkError>;

    /// Flush everything, returning the number of records written
    fn finish(&mut self) -> Result<usize, SinkError>;
}

/// Collects every record and writes one JSON array on [`finish`](RecordSink::finish)
pub struct JsonArraySink<W: Write> {
    writer: W,
    pretty: bool,
    records: Vec<ResolvedChunkRecord>,
}

impl<W: Write> JsonArraySink<W> {
    pub fn new(writer: W, pretty: bool) -> Self {
        Self {
            writer,
            pretty,
            records: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonArraySink<W> {
    fn write_document(
        &mut self,
        source: Option<&str>,
        records: &[ResolvedChunkRecord],
    ) -> Result<(), SinkError> {
        tracing::debug!(source = source.unwrap_or("<input>"), records = records.len(), "buffering records");
        self.records.extend_from_slice(records);
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, SinkError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, &self.records)?;
        } else {
            serde_json::to_writer(&mut self.writer, &self.records)?;
        }
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(self.records.len())
    }
}

/// Writes each record as one line of JSON as soon as it arrives
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn write_document(
        &mut self,
        source: Option<&str>,
        records: &[ResolvedChunkRecord],
    ) -> Result<(), SinkError> {
        tracing::debug!(source = source.unwrap_or("<input>"), records = records.len(), "writing records");
        for record in records {
            serde_json::to_writer(&mut self.writer, record)?;
            writeln!(self.writer)?;
        }
        self.written += records.len();
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, SinkError> {
        self.writer.flush()?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(source: &str) -> Vec<ResolvedChunkRecord> {
        vec![
            ResolvedChunkRecord::new("a:b", "one").with_source(Some(source.into())),
            ResolvedChunkRecord::new("c:d", "two").with_source(Some(source.into())),
        ]
    }

    #[test]
    fn test_json_array_sink_merges_documents() {
        let mut sink = JsonArraySink::new(Vec::new(), false);
        sink.write_document(Some("x.md"), &records("x.md")).unwrap();
        sink.write_document(Some("y.md"), &records("y.md")[..1]).unwrap();
        assert_eq!(sink.finish().unwrap(), 3);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(json[2]["source"], "y.md");
    }

    #[test]
    fn test_json_array_sink_empty() {
        let mut sink = JsonArraySink::new(Vec::new(), true);
        assert_eq!(sink.finish().unwrap(), 0);
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "[]\n");
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.write_document(None, &records("x.md")).unwrap();
        assert_eq!(sink.finish().unwrap(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"id":"a:b","content":"one","source":"x.md"}"#
        );
    }
}
