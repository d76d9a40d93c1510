use std::{
    cell::{Cell, OnceCell, RefCell},
    collections::VecDeque,
};

use log::debug;

use crate::{
    core::{
        item::{ItemReader, ItemReaderResult},
        pipe::Connect,
    },
    error::PipeError,
    item::record::Record,
};

use super::{check_delimiter, escape, DEFAULT_DELIMITER, ROW_TERMINATOR};

/// Serializes records pulled from upstream into delimited text.
///
/// The writer is itself a stage producing characters: the header line built
/// from the first record's columns, then one line per record. At most one
/// line is buffered at a time.
///
/// Every record must have the columns of the first one; values are written
/// in header order whatever the record's own column order.
///
/// # Examples
///
/// ```
/// use tabpipe::core::item::ItemReader;
/// use tabpipe::core::pipe::Pipe;
/// use tabpipe::item::delimited::{DelimitedReaderBuilder, DelimitedWriterBuilder};
///
/// let writer = DelimitedReaderBuilder::new()
///     .from_reader("a,b\n1,\"x,y\"\n".as_bytes())
///     .unwrap()
///     .pipe(DelimitedWriterBuilder::new().delimiter(';'))
///     .unwrap();
///
/// let mut text = String::new();
/// while let Some(c) = writer.read().unwrap() {
///     text.push(c);
/// }
/// assert_eq!(text, "a;b\n1;x,y\n");
/// ```
pub struct DelimitedWriter<U> {
    upstream: U,
    delimiter: char,
    header: OnceCell<Vec<String>>,
    /// Characters of the current line not yet handed downstream
    pending: RefCell<VecDeque<char>>,
    row_count: Cell<usize>,
}

impl<U: ItemReader<Record>> DelimitedWriter<U> {
    /// The header, once the first record has been seen.
    pub fn headers(&self) -> Option<&[String]> {
        self.header.get().map(Vec::as_slice)
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    fn push_line<'a>(&self, line: &mut VecDeque<char>, values: impl Iterator<Item = &'a str>) {
        for (index, value) in values.enumerate() {
            if index > 0 {
                line.push_back(self.delimiter);
            }
            line.extend(escape(value, self.delimiter).chars());
        }
        line.push_back(ROW_TERMINATOR);
    }

    fn buffer_record(&self, record: &Record) -> Result<(), PipeError> {
        let mut pending = self.pending.borrow_mut();

        let header = match self.header.get() {
            Some(header) => header,
            None => {
                debug!("Writing header: {:?}", record.columns());
                self.push_line(&mut pending, record.columns().iter().map(String::as_str));
                self.header.get_or_init(|| record.columns().to_vec())
            }
        };

        let row = self.row_count.get() + 1;
        self.row_count.set(row);

        if record.len() != header.len() {
            return Err(PipeError::MalformedRow {
                row,
                expected: header.len(),
                found: record.len(),
            });
        }

        let values = if record.columns() == header.as_slice() {
            record.values().iter().map(String::as_str).collect::<Vec<_>>()
        } else {
            header
                .iter()
                .map(|column| record.value(column))
                .collect::<Result<Vec<_>, _>>()?
        };

        self.push_line(&mut pending, values.into_iter());
        Ok(())
    }
}

impl<U: ItemReader<Record>> ItemReader<char> for DelimitedWriter<U> {
    fn read(&self) -> ItemReaderResult<char> {
        loop {
            if let Some(c) = self.pending.borrow_mut().pop_front() {
                return Ok(Some(c));
            }

            match self.upstream.read()? {
                Some(record) => self.buffer_record(&record)?,
                None => return Ok(None),
            }
        }
    }
}

/// A builder for configuring delimited writing.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
pub struct DelimitedWriterBuilder {
    delimiter: char,
}

impl Default for DelimitedWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DelimitedWriterBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }

    /// Sets the field delimiter. It is checked when the writer is built.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Creates a writer pulling records from `upstream`.
    ///
    /// Fails with [`PipeError::Configuration`] if the delimiter is the quote
    /// character or the row terminator.
    pub fn from_upstream<U: ItemReader<Record>>(
        self,
        upstream: U,
    ) -> Result<DelimitedWriter<U>, PipeError> {
        let delimiter = check_delimiter(self.delimiter)?;

        Ok(DelimitedWriter {
            upstream,
            delimiter,
            header: OnceCell::new(),
            pending: RefCell::new(VecDeque::new()),
            row_count: Cell::new(0),
        })
    }
}

impl<U: ItemReader<Record>> Connect<U> for DelimitedWriterBuilder {
    type Stage = DelimitedWriter<U>;

    fn connect(self, upstream: U) -> Result<Self::Stage, PipeError> {
        self.from_upstream(upstream)
    }
}
