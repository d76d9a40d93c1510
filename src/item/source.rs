use std::{
    cell::RefCell,
    fs::File,
    io::{self, BufRead, BufReader, ErrorKind, Read},
    path::Path,
};

use log::{debug, error};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::PipeError,
};

/// The leftmost stage of a pipeline: bytes in, characters out.
///
/// The bytes are decoded as UTF-8 one character at a time, so nothing beyond
/// the internal `BufReader` buffer is held in memory. The underlying reader
/// is dropped, and a file closed, as soon as it is exhausted or fails.
///
/// # Examples
///
/// ```
/// use tabpipe::core::item::ItemReader;
/// use tabpipe::item::source::SourceBuilder;
///
/// let source = SourceBuilder::new().from_reader("né".as_bytes());
///
/// assert_eq!(source.read().unwrap(), Some('n'));
/// assert_eq!(source.read().unwrap(), Some('é'));
/// assert_eq!(source.read().unwrap(), None);
/// ```
pub struct Source<R> {
    reader: RefCell<Option<BufReader<R>>>,
}

impl<R: Read> Source<R> {
    fn new(rdr: R, capacity: usize) -> Self {
        Self {
            reader: RefCell::new(Some(BufReader::with_capacity(capacity, rdr))),
        }
    }

    /// Returns `true` once the underlying reader has been released.
    pub fn is_closed(&self) -> bool {
        self.reader.borrow().is_none()
    }
}

impl<R: Read> ItemReader<char> for Source<R> {
    fn read(&self) -> ItemReaderResult<char> {
        let mut slot = self.reader.borrow_mut();
        let Some(reader) = slot.as_mut() else {
            return Ok(None);
        };

        match next_char(reader) {
            Ok(Some(c)) => Ok(Some(c)),
            Ok(None) => {
                debug!("Source exhausted, releasing reader");
                *slot = None;
                Ok(None)
            }
            Err(err) => {
                error!("Source failed: {}", err);
                *slot = None;
                Err(PipeError::Io(err))
            }
        }
    }
}

fn next_byte<B: BufRead>(reader: &mut B) -> io::Result<Option<u8>> {
    let byte = match reader.fill_buf()?.first() {
        Some(byte) => *byte,
        None => return Ok(None),
    };
    reader.consume(1);
    Ok(Some(byte))
}

fn invalid_utf8() -> io::Error {
    io::Error::new(ErrorKind::InvalidData, "stream did not contain valid UTF-8")
}

/// Decodes the next UTF-8 encoded character.
fn next_char<B: BufRead>(reader: &mut B) -> io::Result<Option<char>> {
    let Some(first) = next_byte(reader)? else {
        return Ok(None);
    };

    let width = match first {
        0x00..=0x7F => return Ok(Some(char::from(first))),
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return Err(invalid_utf8()),
    };

    let mut bytes = [first, 0, 0, 0];
    for byte in bytes.iter_mut().take(width).skip(1) {
        *byte = next_byte(reader)?.ok_or_else(invalid_utf8)?;
    }

    std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|decoded| decoded.chars().next())
        .map(Some)
        .ok_or_else(invalid_utf8)
}

/// Builder for [`Source`].
///
/// # Default Configuration
///
/// - Capacity: 8 KiB read buffer
pub struct SourceBuilder {
    capacity: usize,
}

impl Default for SourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceBuilder {
    pub fn new() -> Self {
        Self { capacity: 8 * 1024 }
    }

    /// Sets the size of the read buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn from_reader<R: Read>(self, rdr: R) -> Source<R> {
        Source::new(rdr, self.capacity)
    }

    /// Opens `path` for reading.
    ///
    /// Opening errors are returned unchanged as [`PipeError::Io`].
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<Source<File>, PipeError> {
        let file_path = path.as_ref();
        let file = File::open(file_path).map_err(|e| {
            error!("Failed to open {}: {}", file_path.display(), e);
            e
        })?;

        Ok(self.from_reader(file))
    }
}
