//! Chaining of pipeline stages.
//!
//! A stage is any [`ItemReader`]. Stages are connected with [`Pipe::pipe`]:
//! the left-hand side becomes the upstream of the stage described by the
//! right-hand side, which then pulls from it on demand.
//!
//! ```
//! use tabpipe::core::item::ItemReader;
//! use tabpipe::core::pipe::{process, Pipe};
//! use tabpipe::item::delimited::DelimitedReaderBuilder;
//! use tabpipe::item::source::SourceBuilder;
//! use tabpipe::item::transform::StripColumnProcessor;
//!
//! let records = SourceBuilder::new()
//!     .from_reader("id,name\n1,Alice\n".as_bytes())
//!     .pipe(DelimitedReaderBuilder::new())
//!     .unwrap()
//!     .pipe(process(StripColumnProcessor::new("id")))
//!     .unwrap();
//!
//! let record = records.read().unwrap().unwrap();
//! assert_eq!(record.columns(), ["name"]);
//! assert!(records.read().unwrap().is_none());
//! ```

use std::marker::PhantomData;

use crate::error::PipeError;

use super::item::{ItemProcessor, ItemReader, ItemReaderResult};

/// Describes a stage that can be attached below an upstream of type `U`.
///
/// Builders implement this trait so that connecting is also the point where
/// their configuration is validated.
pub trait Connect<U> {
    /// The connected stage.
    type Stage;

    /// Attaches `upstream` as the input of this stage.
    fn connect(self, upstream: U) -> Result<Self::Stage, PipeError>;
}

/// Fluent chaining, available on every [`ItemReader`].
pub trait Pipe<T>: ItemReader<T> + Sized {
    /// Makes `self` the upstream of `downstream`.
    fn pipe<C: Connect<Self>>(self, downstream: C) -> Result<C::Stage, PipeError> {
        downstream.connect(self)
    }
}

impl<T, R: ItemReader<T>> Pipe<T> for R {}

/// An unconnected processor stage, see [`process`].
pub struct Process<P, I, O> {
    processor: P,
    _marker: PhantomData<fn(I) -> O>,
}

/// Turns an [`ItemProcessor`] into a stage that can be piped.
pub fn process<P, I, O>(processor: P) -> Process<P, I, O>
where
    P: ItemProcessor<I, O>,
{
    Process {
        processor,
        _marker: PhantomData,
    }
}

impl<U, P, I, O> Connect<U> for Process<P, I, O>
where
    U: ItemReader<I>,
    P: ItemProcessor<I, O>,
{
    type Stage = ProcessorItemReader<U, P, I, O>;

    fn connect(self, upstream: U) -> Result<Self::Stage, PipeError> {
        Ok(ProcessorItemReader {
            upstream,
            processor: self.processor,
            _marker: PhantomData,
        })
    }
}

/// A processor connected to its upstream.
///
/// Each `read` pulls upstream items until the processor keeps one, so a
/// filtering processor may consume several items per produced element.
pub struct ProcessorItemReader<U, P, I, O> {
    upstream: U,
    processor: P,
    _marker: PhantomData<fn(I) -> O>,
}

impl<U, P, I, O> ItemReader<O> for ProcessorItemReader<U, P, I, O>
where
    U: ItemReader<I>,
    P: ItemProcessor<I, O>,
{
    fn read(&self) -> ItemReaderResult<O> {
        while let Some(item) = self.upstream.read()? {
            if let Some(output) = self.processor.process(item)? {
                return Ok(Some(output));
            }
        }
        Ok(None)
    }
}

impl<U, P, I, O> ProcessorItemReader<U, P, I, O> {
    /// Returns the upstream stage.
    pub fn upstream(&self) -> &U {
        &self.upstream
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use crate::{
        core::item::{ItemProcessor, ItemProcessorResult, ItemReader, ItemReaderResult},
        error::PipeError,
    };

    use super::{process, Pipe};

    struct Numbers {
        items: RefCell<std::vec::IntoIter<i32>>,
    }

    impl Numbers {
        fn new(items: Vec<i32>) -> Self {
            Self {
                items: RefCell::new(items.into_iter()),
            }
        }
    }

    impl ItemReader<i32> for Numbers {
        fn read(&self) -> ItemReaderResult<i32> {
            Ok(self.items.borrow_mut().next())
        }
    }

    struct EvenOnly;

    impl ItemProcessor<i32, i32> for EvenOnly {
        fn process(&self, item: i32) -> ItemProcessorResult<i32> {
            Ok((item % 2 == 0).then_some(item))
        }
    }

    struct Describe;

    impl ItemProcessor<i32, String> for Describe {
        fn process(&self, item: i32) -> ItemProcessorResult<String> {
            if item < 0 {
                return Err(PipeError::Configuration(format!("negative: {}", item)));
            }
            Ok(Some(format!("#{}", item)))
        }
    }

    fn drain<T>(reader: &impl ItemReader<T>) -> Result<Vec<T>, PipeError> {
        let mut items = Vec::new();
        while let Some(item) = reader.read()? {
            items.push(item);
        }
        Ok(items)
    }

    #[test]
    fn processors_are_chained_lazily() -> Result<(), PipeError> {
        let stage = Numbers::new(vec![1, 2, 3, 4, 6])
            .pipe(process(EvenOnly))?
            .pipe(process(Describe))?;

        assert_eq!(drain(&stage)?, vec!["#2", "#4", "#6"]);
        assert!(stage.read()?.is_none());
        Ok(())
    }

    #[test]
    fn exhausted_upstream_ends_a_filtering_stage() -> Result<(), PipeError> {
        let stage = Numbers::new(vec![1, 3, 5]).pipe(process(EvenOnly))?;
        assert!(stage.read()?.is_none());
        Ok(())
    }

    #[test]
    fn processor_errors_stop_the_stage() -> Result<(), PipeError> {
        let stage = Numbers::new(vec![1, -2, 3]).pipe(process(Describe))?;

        assert_eq!(stage.read()?, Some("#1".to_string()));
        assert!(matches!(stage.read(), Err(PipeError::Configuration(_))));
        Ok(())
    }
}
