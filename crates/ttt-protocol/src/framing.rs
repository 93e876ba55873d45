//! Per-connection reassembly of newline-delimited frames.
//!
//! TCP reads arrive arbitrarily fragmented: a single read may carry half a
//! message, or several messages plus the head of the next one. Each
//! connection owns one [`LineBuffer`]; reads append to it and complete
//! lines are drained off the front, the tail stays for the next read.

/// Growable byte accumulator emitting complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        LineBuffer::default()
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Drain the next complete line, if one has arrived.
    ///
    /// The terminating `\n` (and an optional preceding `\r`) is stripped.
    /// Call repeatedly until `None`: one read may complete several lines.
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=newline_pos).collect();
        let mut line = String::from_utf8_lossy(&line).into_owned();
        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Bytes currently held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
