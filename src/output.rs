//! Output sinks.
//!
//! Directives and the pass-through path write through [`OutputSink`] so output can go to
//! a writer, into a buffer for tests, or nowhere at all.

use std::io::Write;

use crate::PreprocessError;

pub trait OutputSink {
    fn emit(&mut self, text: &str) -> Result<(), PreprocessError>;

    fn emit_char(&mut self, c: char) -> Result<(), PreprocessError> {
        let mut buf = [0u8; 4];
        self.emit(c.encode_utf8(&mut buf))
    }

    fn flush(&mut self) -> Result<(), PreprocessError> {
        Ok(())
    }
}

/// Discards everything. Used when output is suppressed.
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _text: &str) -> Result<(), PreprocessError> {
        Ok(())
    }
}

/// OutputBuffer: collects output into a String for testing or programmatic capture.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    buffer: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, text: &str) -> Result<(), PreprocessError> {
        self.buffer.push_str(text);
        Ok(())
    }
}

/// Writes to any `io::Write`.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn emit(&mut self, text: &str) -> Result<(), PreprocessError> {
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PreprocessError> {
        self.writer.flush()?;
        Ok(())
    }
}
