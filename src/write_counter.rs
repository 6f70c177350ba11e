//! A writer wrapper counting the bytes written through it.
//!
//! Size-limited replies such as `READDIRPLUS` use it to check the encoded
//! size of a reply against the client's byte budget.

use std::io::Write;

/// Decorates a writer and keeps track of how many bytes were successfully
/// written through it.
pub struct WriteCounter<W> {
    inner: W,
    count: usize,
}

impl<W: Write> WriteCounter<W> {
    pub fn new(inner: W) -> Self {
        WriteCounter { inner, count: 0 }
    }

    /// Consumes the counter and returns the wrapped writer
    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn bytes_written(&self) -> usize {
        self.count
    }
}

impl<W: Write> Write for WriteCounter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.count += size;
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
