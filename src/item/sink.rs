use std::{
    cell::RefCell,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use log::{debug, error};

use crate::{
    core::{
        item::{ItemReader, ItemWriter, ItemWriterResult},
        pipe::Connect,
        step::{Step, StepBuilder, StepExecution},
    },
    error::PipeError,
};

/// Default number of characters pulled per write.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// The rightmost stage of a pipeline: characters in, bytes out.
///
/// A sink is an [`ItemWriter`] of characters encoded as UTF-8 through a
/// `BufWriter`. Piping a character stage into a sink yields a [`Step`]
/// that is run explicitly; [`drain`] does both at once.
///
/// Closing the sink flushes and releases its writer. A sink built with
/// [`SinkBuilder::from_writer`] keeps the released writer for
/// [`Sink::into_inner`]; one built with [`SinkBuilder::from_path`] drops its
/// file on close.
pub struct Sink<W: Write> {
    stream: RefCell<Option<BufWriter<W>>>,
    retained: RefCell<Option<W>>,
    keep_writer: bool,
    chunk_size: usize,
}

impl<W: Write> Sink<W> {
    /// Flushes and returns the underlying writer.
    ///
    /// Fails if the writer was already released on close.
    pub fn into_inner(self) -> Result<W, PipeError> {
        if let Some(stream) = self.stream.into_inner() {
            return stream
                .into_inner()
                .map_err(|e| PipeError::Io(e.into_error()));
        }

        self.retained
            .into_inner()
            .ok_or_else(|| PipeError::Io(io::Error::other("sink writer was released on close")))
    }

    /// Returns `true` once the sink has been closed.
    pub fn is_closed(&self) -> bool {
        self.stream.borrow().is_none()
    }
}

fn closed_error() -> PipeError {
    PipeError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "write to a closed sink",
    ))
}

impl<W: Write> ItemWriter<char> for Sink<W> {
    fn write(&self, items: &[char]) -> ItemWriterResult {
        let mut stream = self.stream.borrow_mut();
        let stream = stream.as_mut().ok_or_else(closed_error)?;
        let mut encoded = [0u8; 4];

        for c in items {
            stream
                .write_all(c.encode_utf8(&mut encoded).as_bytes())
                .map_err(|e| {
                    error!("Sink write failed: {}", e);
                    PipeError::Io(e)
                })?;
        }
        Ok(())
    }

    fn flush(&self) -> ItemWriterResult {
        match self.stream.borrow_mut().as_mut() {
            Some(stream) => stream.flush().map_err(PipeError::Io),
            None => Ok(()),
        }
    }

    /// Flushes remaining output and releases the writer.
    fn close(&self) -> ItemWriterResult {
        let Some(stream) = self.stream.borrow_mut().take() else {
            return Ok(());
        };

        debug!("Closing sink");
        let inner = stream.into_inner().map_err(|e| {
            error!("Sink flush failed: {}", e.error());
            PipeError::Io(e.into_error())
        })?;

        if self.keep_writer {
            *self.retained.borrow_mut() = Some(inner);
        }
        Ok(())
    }
}

impl<U, W> Connect<U> for Sink<W>
where
    U: ItemReader<char>,
    W: Write,
{
    type Stage = Step<char, U, Sink<W>>;

    fn connect(self, upstream: U) -> Result<Self::Stage, PipeError> {
        let chunk_size = self.chunk_size;
        StepBuilder::new().chunk(chunk_size).build(upstream, self)
    }
}

/// Connects `upstream` to `sink` and runs the whole pipeline.
///
/// Returns the run report together with the sink. The sink is closed by
/// then: a file is released, an in-memory writer is kept for
/// [`Sink::into_inner`].
pub fn drain<U, W>(upstream: U, sink: Sink<W>) -> Result<(StepExecution, Sink<W>), PipeError>
where
    U: ItemReader<char>,
    W: Write,
{
    let step = sink.connect(upstream)?;
    let execution = step.execute()?;
    Ok((execution, step.into_writer()))
}

/// Builder for [`Sink`].
///
/// # Default Configuration
///
/// - Chunk size: [`DEFAULT_CHUNK_SIZE`] characters
pub struct SinkBuilder {
    chunk_size: usize,
}

impl Default for SinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkBuilder {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets how many characters are pulled from upstream per write.
    pub fn chunk(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> Sink<W> {
        self.build(wtr, true)
    }

    /// Creates (or truncates) `path` for writing.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<Sink<File>, PipeError> {
        let file_path = path.as_ref();
        let file = File::create(file_path).map_err(|e| {
            error!("Failed to create {}: {}", file_path.display(), e);
            e
        })?;

        Ok(self.build(file, false))
    }

    fn build<W: Write>(self, wtr: W, keep_writer: bool) -> Sink<W> {
        Sink {
            stream: RefCell::new(Some(BufWriter::new(wtr))),
            retained: RefCell::new(None),
            keep_writer,
            chunk_size: self.chunk_size,
        }
    }
}
