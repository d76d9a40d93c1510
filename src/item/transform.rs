//! Record transformations to place between a reader and a writer.
//!
//! Each transformation is an [`ItemProcessor`] and becomes a pipeline stage
//! through [`process`](crate::core::pipe::process).
//!
//! ```
//! use tabpipe::core::item::ItemReader;
//! use tabpipe::core::pipe::{process, Pipe};
//! use tabpipe::item::delimited::DelimitedReaderBuilder;
//! use tabpipe::item::transform::{FieldEqualsFilter, StripColumnProcessor};
//!
//! let data = "date,event,extra notes\n2024-01-02,shopping,milk\n2024-01-03,cinema,\n";
//!
//! let stage = DelimitedReaderBuilder::new()
//!     .from_reader(data.as_bytes())
//!     .unwrap()
//!     .pipe(process(FieldEqualsFilter::new("event", "shopping")))
//!     .unwrap()
//!     .pipe(process(StripColumnProcessor::new("extra notes")))
//!     .unwrap();
//!
//! let record = stage.read().unwrap().unwrap();
//! assert_eq!(record.columns(), ["date", "event"]);
//! assert!(stage.read().unwrap().is_none());
//! ```

use std::cell::OnceCell;

use crate::{
    core::item::{ItemProcessor, ItemProcessorResult},
    error::PipeError,
    item::record::Record,
};

/// Position of one named column, looked up on first use.
///
/// Column order is fixed for the lifetime of a stream, so the position found
/// on the first record is reused. A record whose column at that position has
/// another name is looked up by name instead.
struct ColumnPosition {
    column: String,
    cached: OnceCell<usize>,
}

impl ColumnPosition {
    fn new(column: String) -> Self {
        Self {
            column,
            cached: OnceCell::new(),
        }
    }

    fn resolve(&self, record: &Record) -> Result<usize, PipeError> {
        if let Some(&index) = self.cached.get() {
            if record.column_at(index) == Some(self.column.as_str()) {
                return Ok(index);
            }
        }

        let index = record
            .position(&self.column)
            .ok_or_else(|| PipeError::UnknownColumn(self.column.clone()))?;
        self.cached.get_or_init(|| index);
        Ok(index)
    }
}

/// Keeps the records accepted by a predicate.
pub struct FilterProcessor<F> {
    predicate: F,
}

impl<F: Fn(&Record) -> bool> FilterProcessor<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F: Fn(&Record) -> bool> ItemProcessor<Record, Record> for FilterProcessor<F> {
    fn process(&self, item: Record) -> ItemProcessorResult<Record> {
        Ok((self.predicate)(&item).then_some(item))
    }
}

/// Keeps the records whose `column` holds exactly `expected`.
///
/// Fails with [`PipeError::UnknownColumn`] if a record lacks the column.
pub struct FieldEqualsFilter {
    position: ColumnPosition,
    expected: String,
}

impl FieldEqualsFilter {
    pub fn new<C: Into<String>, V: Into<String>>(column: C, expected: V) -> Self {
        Self {
            position: ColumnPosition::new(column.into()),
            expected: expected.into(),
        }
    }
}

impl ItemProcessor<Record, Record> for FieldEqualsFilter {
    fn process(&self, item: Record) -> ItemProcessorResult<Record> {
        let index = self.position.resolve(&item)?;
        let keep = item.get_at(index) == Some(self.expected.as_str());
        Ok(keep.then_some(item))
    }
}

/// Removes one column from every record.
///
/// Fails with [`PipeError::UnknownColumn`] if a record lacks the column.
pub struct StripColumnProcessor {
    position: ColumnPosition,
}

impl StripColumnProcessor {
    pub fn new<C: Into<String>>(column: C) -> Self {
        Self {
            position: ColumnPosition::new(column.into()),
        }
    }
}

impl ItemProcessor<Record, Record> for StripColumnProcessor {
    fn process(&self, mut item: Record) -> ItemProcessorResult<Record> {
        let index = self.position.resolve(&item)?;
        item.remove_at(index);
        Ok(Some(item))
    }
}
