//! Destinations for per-entity output records.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use prospect_types::{OutputRecord, WriteError};
use serde_json::{Map, Value};

/// Receives each entity record as soon as it is complete.
///
/// Records are written incrementally so a run that stops early still leaves
/// the finished entities behind.
pub trait OutputSink {
    fn write(&mut self, record: &OutputRecord) -> Result<(), WriteError>;
}

/// Keeps records in memory. Useful for tests and previews.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<OutputRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<OutputRecord> {
        self.records
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, record: &OutputRecord) -> Result<(), WriteError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Writes one JSON object per line: `{"entity": ..., <field>: <value>, ...}`.
///
/// Each line is serialized in full, then written and flushed before `write`
/// returns. A line that fails to write is never retried by later writes.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl JsonLinesSink<File> {
    /// Opens `path` for appending, creating it when missing.
    pub fn append(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }

    /// Creates or truncates `path`.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for JsonLinesSink<W> {
    fn write(&mut self, record: &OutputRecord) -> Result<(), WriteError> {
        let fail = |message: String| WriteError::new(&record.entity, message);

        let mut row = Map::with_capacity(record.fields.len() + 1);
        row.insert("entity".into(), Value::String(record.entity.clone()));
        for (field, value) in &record.fields {
            row.insert(field.clone(), value.clone());
        }

        let mut line = serde_json::to_vec(&Value::Object(row)).map_err(|error| fail(error.to_string()))?;
        line.push(b'\n');
        self.writer.write_all(&line).map_err(|error| fail(error.to_string()))?;
        self.writer.flush().map_err(|error| fail(error.to_string()))
    }
}
