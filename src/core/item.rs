use crate::error::PipeError;

/// Result of pulling one element from a stage.
///
/// - `Ok(Some(item))`: the next element
/// - `Ok(None)`: the sequence is exhausted
/// - `Err(error)`: the stage failed, the pipeline must stop
pub type ItemReaderResult<T> = Result<Option<T>, PipeError>;

/// Result of processing one element. `Ok(None)` drops the element.
pub type ItemProcessorResult<O> = Result<Option<O>, PipeError>;

/// Result of handing elements to a writer.
pub type ItemWriterResult = Result<(), PipeError>;

/// A lazy, pull-based producer of elements.
///
/// Every stage of a pipeline is an `ItemReader`: the source produces
/// characters, the delimited reader turns them into records, and so on.
/// A reader is consumed once; restarting means building a fresh instance.
pub trait ItemReader<T> {
    /// Produces the next element, pulling from upstream as needed.
    fn read(&self) -> ItemReaderResult<T>;
}

/// Business logic applied to each element flowing between two stages.
pub trait ItemProcessor<I, O> {
    /// Transforms `item`, or returns `Ok(None)` to filter it out.
    fn process(&self, item: I) -> ItemProcessorResult<O>;
}

/// The terminal consumer of a pipeline.
pub trait ItemWriter<T> {
    /// Writes a chunk of elements.
    fn write(&self, items: &[T]) -> ItemWriterResult;

    /// Pushes any buffered output to the underlying destination.
    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    /// Called once before the first chunk is written.
    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    /// Called once after the last chunk, including on failed runs.
    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}

impl<T, R: ItemReader<T> + ?Sized> ItemReader<T> for &R {
    fn read(&self) -> ItemReaderResult<T> {
        (**self).read()
    }
}

impl<T, R: ItemReader<T> + ?Sized> ItemReader<T> for Box<R> {
    fn read(&self) -> ItemReaderResult<T> {
        (**self).read()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::{ItemReader, ItemReaderResult};

    struct Countdown {
        remaining: RefCell<u32>,
    }

    impl ItemReader<u32> for Countdown {
        fn read(&self) -> ItemReaderResult<u32> {
            let mut remaining = self.remaining.borrow_mut();
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
            Ok(Some(*remaining))
        }
    }

    #[test]
    fn readers_can_be_pulled_through_references_and_boxes() {
        let countdown = Countdown {
            remaining: RefCell::new(2),
        };
        let by_ref: &dyn ItemReader<u32> = &countdown;
        assert_eq!(by_ref.read().unwrap(), Some(1));

        let boxed: Box<dyn ItemReader<u32>> = Box::new(countdown);
        assert_eq!(boxed.read().unwrap(), Some(0));
        assert_eq!(boxed.read().unwrap(), None);
        assert_eq!(boxed.read().unwrap(), None);
    }
}
