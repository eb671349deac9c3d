//! Character source with push-back.
//!
//! The dispatcher and the reader both consume input one character at a time and hand
//! characters back when a prefix attempt or an atom overshoots. `CharStream` pulls the
//! underlying reader a line at a time and keeps a transcript of the pulled text for
//! diagnostics to point into. The transcript starts at the last [`CharStream::mark`], so
//! a long run only holds the text of the construct being read.

use std::collections::VecDeque;
use std::io::BufRead;

use crate::ast::Span;
use crate::diagnostics::{to_error_source, SourceArc};
use crate::PreprocessError;

pub struct CharStream<'a> {
    name: String,
    source: Box<dyn BufRead + 'a>,
    pending: VecDeque<char>,
    pushback: Vec<char>,
    transcript: String,
    // Input offset of the first transcript byte.
    window_start: usize,
    mark: usize,
    offset: usize,
    exhausted: bool,
}

impl<'a> CharStream<'a> {
    pub fn new(name: impl Into<String>, source: impl BufRead + 'a) -> Self {
        Self {
            name: name.into(),
            source: Box::new(source),
            pending: VecDeque::new(),
            pushback: Vec::new(),
            transcript: String::new(),
            window_start: 0,
            mark: 0,
            offset: 0,
            exhausted: false,
        }
    }

    /// A stream over in-memory text.
    pub fn from_text(name: impl Into<String>, text: &'a str) -> Self {
        Self::new(name, text.as_bytes())
    }

    /// Reads the next character, or `None` at end of input.
    pub fn next_char(&mut self) -> Result<Option<char>, PreprocessError> {
        if let Some(c) = self.pushback.pop() {
            self.offset += c.len_utf8();
            return Ok(Some(c));
        }
        if self.pending.is_empty() && !self.fill()? {
            return Ok(None);
        }
        let c = self.pending.pop_front();
        if let Some(c) = c {
            self.offset += c.len_utf8();
        }
        Ok(c)
    }

    /// Returns the next character without consuming it.
    pub fn peek_char(&mut self) -> Result<Option<char>, PreprocessError> {
        let c = self.next_char()?;
        if let Some(c) = c {
            self.unread(c);
        }
        Ok(c)
    }

    /// Pushes a previously read character back; the next read returns it.
    ///
    /// Characters must be pushed back in the reverse of the order they were read.
    pub fn unread(&mut self, c: char) {
        tracing::trace!(?c, "push back");
        self.offset = self.offset.saturating_sub(c.len_utf8());
        self.pushback.push(c);
    }

    /// Byte offset of the next character from the start of input.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Lets go of the text before the current offset.
    ///
    /// The text is dropped from the transcript when the next line is pulled, so spans
    /// built with [`CharStream::span_from`] may start at the mark or later.
    pub fn mark(&mut self) {
        self.mark = self.offset;
    }

    /// Converts input offsets `start..end` into a span of the transcript.
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(
            start.saturating_sub(self.window_start),
            end.saturating_sub(self.window_start),
        )
    }

    /// The span from input offset `start` to the current offset.
    pub fn span_from(&self, start: usize) -> Span {
        self.span(start, self.offset)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The text read from the underlying source since the mark that was in effect when
    /// the current line was pulled.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// The transcript as a diagnostic source.
    pub fn named_source(&self) -> SourceArc {
        to_error_source(&self.name, self.transcript.clone())
    }

    // Pulls one more line from the source. Returns false at end of input.
    fn fill(&mut self) -> Result<bool, PreprocessError> {
        if self.exhausted {
            return Ok(false);
        }
        let mut line = String::new();
        let read = self.source.read_line(&mut line).map_err(|e| {
            crate::err_msg!(Io, "failed to read from '{}': {}", self.name, e).with_cause(e)
        })?;
        if read == 0 {
            self.exhausted = true;
            return Ok(false);
        }
        // Pending and pushback are empty here, so the mark is on a character boundary.
        let released = self.mark.saturating_sub(self.window_start).min(self.transcript.len());
        if released > 0 {
            self.transcript.drain(..released);
            self.window_start += released;
        }
        self.transcript.push_str(&line);
        self.pending.extend(line.chars());
        Ok(true)
    }
}
