use std::{
    cell::{Cell, OnceCell},
    fs::File,
    io::Read,
    path::Path,
};

use log::debug;

use crate::{
    core::{
        item::{ItemReader, ItemReaderResult},
        pipe::Connect,
    },
    error::PipeError,
    item::{
        record::{check_unique, Record},
        source::{Source, SourceBuilder},
    },
};

use super::{check_delimiter, DEFAULT_DELIMITER, QUOTE, ROW_TERMINATOR};

/// How a value ended.
#[derive(Debug, PartialEq)]
enum FieldEnd {
    /// More values follow in the same row.
    Delimiter,
    RowTerminator,
    EndOfInput,
}

/// A delimited reader that implements the `ItemReader` trait.
///
/// This reader pulls characters from its upstream and produces one
/// [`Record`] per logical row. The first row is consumed as the header and
/// gives every record its column names.
///
/// # Implementation Details
///
/// - Parsing is strictly character by character with one character of
///   lookahead held by the reader itself
/// - Only the value being parsed is buffered, never the whole input
/// - Every data row must have as many values as the header
/// - A last row without a trailing `\n` is still produced
/// - Any error is final: every later read returns `Ok(None)`
///
/// # Examples
///
/// ```
/// use tabpipe::core::item::ItemReader;
/// use tabpipe::item::delimited::DelimitedReaderBuilder;
///
/// let data = "\
/// name;note
/// Alice;\"multi
/// line\"
/// Bob;\"a \"\"quoted\"\" word\"";
///
/// let reader = DelimitedReaderBuilder::new()
///     .delimiter(';')
///     .from_reader(data.as_bytes())
///     .unwrap();
///
/// let alice = reader.read().unwrap().unwrap();
/// assert_eq!(alice.get("note"), Some("multi\nline"));
///
/// let bob = reader.read().unwrap().unwrap();
/// assert_eq!(bob.get("note"), Some("a \"quoted\" word"));
///
/// assert!(reader.read().unwrap().is_none());
/// assert_eq!(reader.headers().unwrap(), ["name", "note"]);
/// ```
pub struct DelimitedReader<U> {
    upstream: U,
    delimiter: char,
    /// Character read ahead and given back
    pending: Cell<Option<char>>,
    /// Current physical line, 1-based
    line: Cell<usize>,
    header: OnceCell<Vec<String>>,
    /// Number of data rows produced so far
    row_count: Cell<usize>,
    /// Set once a read has failed
    failed: Cell<bool>,
}

impl<U: ItemReader<char>> DelimitedReader<U> {
    /// Returns the column names, reading the header row if needed.
    ///
    /// An empty input has an empty header, and so does a reader whose
    /// header row failed to parse.
    pub fn headers(&self) -> Result<&[String], PipeError> {
        if let Some(header) = self.header.get() {
            return Ok(header.as_slice());
        }
        if self.failed.get() {
            return Ok(&[]);
        }

        let columns = self.latch(self.read_header())?;
        Ok(self.header.get_or_init(|| columns).as_slice())
    }

    fn read_header(&self) -> Result<Vec<String>, PipeError> {
        let columns = self.read_row()?.unwrap_or_default();
        check_unique(&columns)?;
        debug!("Header detected: {:?}", columns);
        Ok(columns)
    }

    fn read_record(&self, columns: &[String]) -> ItemReaderResult<Record> {
        let Some(values) = self.read_row()? else {
            return Ok(None);
        };

        let row = self.row_count.get() + 1;
        self.row_count.set(row);

        if values.len() != columns.len() {
            return Err(PipeError::MalformedRow {
                row,
                expected: columns.len(),
                found: values.len(),
            });
        }

        Ok(Some(Record::from_trusted_parts(columns.to_vec(), values)))
    }

    /// Stops the reader for good if `result` is an error.
    fn latch<T>(&self, result: Result<T, PipeError>) -> Result<T, PipeError> {
        if let Err(err) = &result {
            debug!("Reader stopped at line {}: {}", self.line.get(), err);
            self.failed.set(true);
        }
        result
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    fn next_char(&self) -> Result<Option<char>, PipeError> {
        if let Some(c) = self.pending.take() {
            return Ok(Some(c));
        }

        let next = self.upstream.read()?;
        if next == Some(ROW_TERMINATOR) {
            self.line.set(self.line.get() + 1);
        }
        Ok(next)
    }

    fn push_back(&self, c: char) {
        debug_assert!(self.pending.get().is_none());
        self.pending.set(Some(c));
    }

    /// Reads one row, or `None` if the input ends before the row starts.
    fn read_row(&self) -> Result<Option<Vec<String>>, PipeError> {
        match self.next_char()? {
            Some(c) => self.push_back(c),
            None => return Ok(None),
        }

        let mut values = Vec::with_capacity(self.header.get().map_or(0, Vec::len));
        loop {
            let (value, end) = self.read_field()?;
            values.push(value);
            if end != FieldEnd::Delimiter {
                return Ok(Some(values));
            }
        }
    }

    fn read_field(&self) -> Result<(String, FieldEnd), PipeError> {
        let value = String::new();
        match self.next_char()? {
            None => Ok((value, FieldEnd::EndOfInput)),
            Some(QUOTE) => self.read_quoted(value),
            Some(c) => {
                self.push_back(c);
                self.read_unquoted(value)
            }
        }
    }

    fn read_unquoted(&self, mut value: String) -> Result<(String, FieldEnd), PipeError> {
        loop {
            match self.next_char()? {
                None => return Ok((value, FieldEnd::EndOfInput)),
                Some(ROW_TERMINATOR) => return Ok((value, FieldEnd::RowTerminator)),
                Some(QUOTE) => {
                    return Err(malformed(
                        self.line.get(),
                        "embedded quotes require the whole value to be quoted",
                    ));
                }
                Some(c) if c == self.delimiter => return Ok((value, FieldEnd::Delimiter)),
                Some(c) => value.push(c),
            }
        }
    }

    /// Reads the rest of a value whose opening quote was consumed.
    fn read_quoted(&self, mut value: String) -> Result<(String, FieldEnd), PipeError> {
        let opened_at = self.line.get();

        loop {
            match self.next_char()? {
                None => return Err(malformed(opened_at, "unterminated quoted value")),
                Some(QUOTE) => match self.next_char()? {
                    Some(QUOTE) => value.push(QUOTE),
                    None => return Ok((value, FieldEnd::EndOfInput)),
                    Some(ROW_TERMINATOR) => return Ok((value, FieldEnd::RowTerminator)),
                    Some(c) if c == self.delimiter => return Ok((value, FieldEnd::Delimiter)),
                    Some(_) => {
                        return Err(malformed(
                            self.line.get(),
                            "only delimiter or quote may follow a closing quote",
                        ));
                    }
                },
                Some(c) => value.push(c),
            }
        }
    }
}

fn malformed(line: usize, reason: &'static str) -> PipeError {
    PipeError::MalformedQuoting { line, reason }
}

impl<U: ItemReader<char>> ItemReader<Record> for DelimitedReader<U> {
    /// Reads the next record.
    ///
    /// # Returns
    /// - `Ok(Some(record))` for each data row
    /// - `Ok(None)` once the input is exhausted
    /// - `Err(PipeError::MalformedQuoting)` on broken quoting
    /// - `Err(PipeError::MalformedRow)` when a row does not match the header
    ///
    /// After an error the reader is finished and returns `Ok(None)`.
    fn read(&self) -> ItemReaderResult<Record> {
        if self.failed.get() {
            return Ok(None);
        }

        let columns = self.headers()?;
        self.latch(self.read_record(columns))
    }
}

/// A builder for configuring delimited reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
///
/// # Examples
///
/// ```
/// use tabpipe::item::delimited::DelimitedReaderBuilder;
/// use tabpipe::error::PipeError;
///
/// let result = DelimitedReaderBuilder::new()
///     .delimiter('"')
///     .from_reader("a\n1".as_bytes());
///
/// assert!(matches!(result, Err(PipeError::Configuration(_))));
/// ```
pub struct DelimitedReaderBuilder {
    delimiter: char,
}

impl Default for DelimitedReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DelimitedReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }

    /// Sets the field delimiter. It is checked when the reader is built.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Creates a reader pulling characters from `upstream`.
    ///
    /// Fails with [`PipeError::Configuration`] before touching `upstream` if
    /// the delimiter is the quote character or the row terminator.
    pub fn from_upstream<U: ItemReader<char>>(
        self,
        upstream: U,
    ) -> Result<DelimitedReader<U>, PipeError> {
        let delimiter = check_delimiter(self.delimiter)?;

        Ok(DelimitedReader {
            upstream,
            delimiter,
            pending: Cell::new(None),
            line: Cell::new(1),
            header: OnceCell::new(),
            row_count: Cell::new(0),
            failed: Cell::new(false),
        })
    }

    /// Creates a reader over any byte source, decoded as UTF-8.
    pub fn from_reader<R: Read>(self, rdr: R) -> Result<DelimitedReader<Source<R>>, PipeError> {
        self.from_upstream(SourceBuilder::new().from_reader(rdr))
    }

    /// Creates a reader over the file at `path`.
    pub fn from_path<P: AsRef<Path>>(
        self,
        path: P,
    ) -> Result<DelimitedReader<Source<File>>, PipeError> {
        check_delimiter(self.delimiter)?;
        let source = SourceBuilder::new().from_path(path)?;
        self.from_upstream(source)
    }
}

impl<U: ItemReader<char>> Connect<U> for DelimitedReaderBuilder {
    type Stage = DelimitedReader<U>;

    fn connect(self, upstream: U) -> Result<Self::Stage, PipeError> {
        self.from_upstream(upstream)
    }
}
