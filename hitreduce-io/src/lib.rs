//! hitreduce-io: Event file reading and writing for hitreduce.
//!
//! Events are stored as JSON lines, one [`EventRecord`] per line, so a run
//! can be driven end to end without the upstream data format.
//!

mod error;
mod event;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use event::EventRecord;
pub use reader::EventReader;
pub use writer::EventWriter;
