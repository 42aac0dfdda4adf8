//! Accumulation buffer for inbound chunks with literal substring search.
//!
//! Matching consumes: everything up to the end of a match is discarded,
//! and whatever follows stays in the buffer for the next wait.

use memchr::memmem;

/// Buffer of not-yet-consumed session output.
#[derive(Debug, Default)]
pub struct PatternBuffer {
    buffer: Vec<u8>,
}

impl PatternBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Append a chunk.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Byte offset just past the first occurrence of `pattern`, if any.
    pub fn find_end(&self, pattern: &str) -> Option<usize> {
        memmem::find(&self.buffer, pattern.as_bytes()).map(|start| start + pattern.len())
    }

    /// Index of the first candidate (in list order) present anywhere in the
    /// buffer, with the end offset of its first occurrence.
    pub fn find_first_of(&self, patterns: &[&str]) -> Option<(usize, usize)> {
        patterns
            .iter()
            .enumerate()
            .find_map(|(index, pattern)| self.find_end(pattern).map(|end| (index, end)))
    }

    /// Discard the first `end` bytes.
    pub fn consume(&mut self, end: usize) {
        self.buffer.drain(..end.min(self.buffer.len()));
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
