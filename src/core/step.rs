use std::{
    cell::Cell,
    marker::PhantomData,
    time::{Duration, Instant},
};

use log::{debug, error, info};
use uuid::Uuid;

use crate::error::PipeError;

use super::{
    build_name,
    item::{ItemReader, ItemWriter},
};

/// Result of running a step.
pub type StepResult = Result<StepExecution, PipeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Built but not run yet.
    Starting,
    /// Currently draining its reader.
    Started,
    /// The reader was exhausted and every element was written.
    Success,
    /// A stage failed; the error was returned from `execute`.
    Error,
}

/// Report of a successful run.
#[derive(Debug)]
pub struct StepExecution {
    /// Unique identifier for this run
    pub id: Uuid,
    /// Human-readable name of the step
    pub name: String,
    pub status: StepStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Number of elements pulled from the reader
    pub read_count: usize,
    /// Number of elements handed to the writer
    pub write_count: usize,
}

/// The active end of a pipeline.
///
/// A step owns the last stage of a chain and the writer it drains into.
/// Building a step does not run anything: [`Step::execute`] pulls every
/// element from the reader, in chunks of `chunk_size`, and hands each chunk
/// to the writer. The whole upstream chain runs exactly once, synchronously,
/// inside that call.
pub struct Step<T, R, W> {
    name: String,
    reader: R,
    writer: W,
    chunk_size: usize,
    status: Cell<StepStatus>,
    read_count: Cell<usize>,
    write_count: Cell<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, R: ItemReader<T>, W: ItemWriter<T>> Step<T, R, W> {
    /// Runs the step to completion.
    ///
    /// The writer is opened first and closed on every exit path. The first
    /// error raised by the reader, any upstream stage or the writer aborts
    /// the run and is returned as is.
    pub fn execute(&self) -> StepResult {
        if self.status.get() != StepStatus::Starting {
            return Err(PipeError::Configuration(format!(
                "step {} has already been executed",
                self.name
            )));
        }

        let start_time = Instant::now();
        let id = Uuid::new_v4();
        debug!("Start of step: {}, id: {}", self.name, id);
        self.status.set(StepStatus::Started);

        let result = self.writer.open().and_then(|()| self.run_chunks());
        let close_result = self.writer.close();

        match result.and(close_result) {
            Ok(()) => {
                self.status.set(StepStatus::Success);
                info!(
                    "End of step: {}, read: {}, written: {}",
                    self.name,
                    self.read_count.get(),
                    self.write_count.get()
                );
                Ok(StepExecution {
                    id,
                    name: self.name.clone(),
                    status: StepStatus::Success,
                    start_time,
                    end_time: Instant::now(),
                    duration: start_time.elapsed(),
                    read_count: self.read_count.get(),
                    write_count: self.write_count.get(),
                })
            }
            Err(err) => {
                self.status.set(StepStatus::Error);
                error!("Step {} failed: {}", self.name, err);
                Err(err)
            }
        }
    }

    fn run_chunks(&self) -> Result<(), PipeError> {
        let mut chunk: Vec<T> = Vec::with_capacity(self.chunk_size);

        loop {
            let finished = self.read_chunk(&mut chunk)?;

            if !chunk.is_empty() {
                self.writer.write(&chunk)?;
                self.writer.flush()?;
                self.write_count.set(self.write_count.get() + chunk.len());
            }

            if finished {
                debug!("End reading chunk: FINISHED");
                return Ok(());
            }
        }
    }

    /// Fills `chunk`, returning `true` once the reader is exhausted.
    fn read_chunk(&self, chunk: &mut Vec<T>) -> Result<bool, PipeError> {
        chunk.clear();

        while chunk.len() < self.chunk_size {
            match self.reader.read()? {
                Some(item) => {
                    chunk.push(item);
                    self.read_count.set(self.read_count.get() + 1);
                }
                None => return Ok(true),
            }
        }

        Ok(false)
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_status(&self) -> StepStatus {
        self.status.get()
    }

    pub fn get_read_count(&self) -> usize {
        self.read_count.get()
    }

    pub fn get_write_count(&self) -> usize {
        self.write_count.get()
    }

    /// Gives back the writer, e.g. to inspect an in-memory destination.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

/// Builder for [`Step`].
///
/// # Default Configuration
///
/// - Name: random 8-character alphanumeric string
/// - Chunk size: 1
pub struct StepBuilder {
    name: Option<String>,
    chunk_size: usize,
}

impl Default for StepBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StepBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            chunk_size: 1,
        }
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets how many elements are pulled before each write.
    pub fn chunk(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Builds a step draining `reader` into `writer`.
    ///
    /// Fails with [`PipeError::Configuration`] if the chunk size is zero.
    pub fn build<T, R, W>(self, reader: R, writer: W) -> Result<Step<T, R, W>, PipeError>
    where
        R: ItemReader<T>,
        W: ItemWriter<T>,
    {
        if self.chunk_size == 0 {
            return Err(PipeError::Configuration(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        Ok(Step {
            name: self.name.unwrap_or_else(build_name),
            reader,
            writer,
            chunk_size: self.chunk_size,
            status: Cell::new(StepStatus::Starting),
            read_count: Cell::new(0),
            write_count: Cell::new(0),
            _marker: PhantomData,
        })
    }
}
