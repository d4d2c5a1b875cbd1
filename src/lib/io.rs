//! Byte source and sink collaborators for the reader and writer stages.
//!
//! The pipeline reads through [`ByteSource`] and writes through
//! [`ByteSink`]; both may block on I/O. Source exhaustion is a designed
//! termination signal (`Ok(None)`), never an error. File-backed
//! implementations buffer underneath so the byte-at-a-time stage loops do
//! not translate into syscall-per-byte.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{EncpipeError, Result};

/// Supplier of the pipeline's input bytes. Called only by the reader stage.
pub trait ByteSource: Send {
    /// Fetch the next byte, or `None` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails; exhaustion is not an
    /// error.
    fn next_byte(&mut self) -> Result<Option<u8>>;
}

/// Consumer of the pipeline's output bytes. Called only by the writer stage.
pub trait ByteSink: Send {
    /// Hand one byte to the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Flush anything the sink has buffered.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> Result<()>;
}

fn io_error(stage: &str, source: std::io::Error) -> EncpipeError {
    EncpipeError::Io { stage: stage.to_string(), source }
}

/// Buffered file-backed [`ByteSource`].
#[derive(Debug)]
pub struct FileSource {
    reader: BufReader<File>,
}

impl FileSource {
    /// Open a file for reading.
    ///
    /// # Errors
    ///
    /// Returns a setup error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EncpipeError::Setup {
            component: "source".to_string(),
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { reader: BufReader::new(file) })
    }
}

impl ByteSource for FileSource {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            return match self.reader.read(&mut buf) {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(buf[0])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => Err(io_error("reader", e)),
            };
        }
    }
}

/// Buffered file-backed [`ByteSink`].
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Create (or truncate) a file for writing.
    ///
    /// # Errors
    ///
    /// Returns a setup error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| EncpipeError::Setup {
            component: "sink".to_string(),
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { writer: BufWriter::new(file) })
    }
}

impl ByteSink for FileSink {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.writer.write_all(&[byte]).map_err(|e| io_error("writer", e))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| io_error("writer", e))
    }
}

/// In-memory [`ByteSource`] over a fixed byte vector.
pub struct MemorySource {
    bytes: Vec<u8>,
    pos: usize,
}

impl MemorySource {
    /// Create a source yielding the given bytes, then exhaustion.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), pos: 0 }
    }
}

impl ByteSource for MemorySource {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.bytes.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }
}

/// In-memory [`ByteSink`] whose buffer remains observable after the writer
/// stage has consumed the sink itself.
pub struct SharedMemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl SharedMemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self { buf: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Handle to the sink's buffer, valid after the pipeline finishes.
    #[must_use]
    pub fn buffer(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.buf)
    }
}

impl Default for SharedMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSink for SharedMemorySink {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.buf.lock().push(byte);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
