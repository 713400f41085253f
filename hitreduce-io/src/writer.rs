//! JSON-lines event writer.

use crate::event::EventRecord;
use crate::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one [`EventRecord`] per line.
pub struct EventWriter<W: Write> {
    writer: W,
    events_written: usize,
}

impl EventWriter<BufWriter<File>> {
    /// Creates or truncates an output file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> EventWriter<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            events_written: 0,
        }
    }

    /// Number of events written.
    pub fn events_written(&self) -> usize {
        self.events_written
    }

    /// Writes a full event.
    pub fn write_event(&mut self, record: &EventRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.events_written += 1;
        Ok(())
    }

    /// Writes the event restricted to the hits at `kept`.
    pub fn write_reduced(&mut self, record: &EventRecord, kept: &[usize]) -> Result<()> {
        self.write_event(&record.reduced(kept)?)
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
