//! JSON-lines event reader.

use crate::event::EventRecord;
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads one [`EventRecord`] per line.
///
/// Blank lines are skipped. Errors carry the 1-based line number.
pub struct EventReader<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl EventReader<BufReader<File>> {
    /// Opens an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        log::info!("reading events from {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// Number of lines consumed so far.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Reads up to `n` events.
    ///
    /// Returns fewer only at end of input.
    pub fn read_batch(&mut self, n: usize) -> Result<Vec<EventRecord>> {
        self.by_ref().take(n).collect()
    }

    fn read_record(&mut self) -> Option<Result<EventRecord>> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(e) => return Some(Err(e.into())),
            }
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return Some(self.parse(text));
        }
    }

    fn parse(&self, text: &str) -> Result<EventRecord> {
        let line = self.line;
        let record: EventRecord =
            serde_json::from_str(text).map_err(|source| Error::Record { line, source })?;
        record
            .hits
            .as_event()
            .map_err(|source| Error::Event { line, source })?;
        Ok(record)
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EVENTS: &str = r#"{"event_id": 1, "detector_id": [3, 31], "element_id": [80, 12], "drift_distance": [0.2, 0.0], "tdc_time": [950.0, 948.0]}

{"event_id": 2, "detector_id": [], "element_id": [], "drift_distance": [], "tdc_time": []}
"#;

    #[test]
    fn test_reads_records_and_skips_blank_lines() {
        let reader = EventReader::new(Cursor::new(EVENTS));
        let records: Vec<_> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_id, 1);
        assert_eq!(records[0].hits.detector_id, vec![3, 31]);
        assert!(records[1].is_empty());
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let text = format!("{EVENTS}\nnot json\n");
        let mut reader = EventReader::new(Cursor::new(text));
        assert_eq!(reader.read_batch(2).unwrap().len(), 2);
        match reader.next() {
            Some(Err(Error::Record { line, .. })) => assert_eq!(line, 5),
            other => panic!("expected a record error, got {other:?}"),
        }
    }

    #[test]
    fn test_column_length_mismatch() {
        let text = r#"{"event_id": 9, "detector_id": [3, 4], "element_id": [1], "drift_distance": [0.0, 0.0], "tdc_time": [1.0, 2.0]}"#;
        let mut reader = EventReader::new(Cursor::new(text));
        assert!(matches!(
            reader.next(),
            Some(Err(Error::Event {
                line: 1,
                source: hitreduce_core::Error::LengthMismatch { .. }
            }))
        ));
        assert!(reader.next().is_none());
    }
}
