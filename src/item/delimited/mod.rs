//! Delimited text support (CSV, TSV and any single-character delimiter).
//!
//! This module turns a character stream into
//! [`Record`](crate::item::record::Record)s and back.
//!
//! # Module Architecture
//!
//! 1. **DelimitedReader**: pulls characters from its upstream and produces one
//!    `Record` per logical row. The first row is the header. Values follow
//!    RFC 4180 style quoting: a value starting with `"` is quoted, `""`
//!    inside it stands for one literal quote, and delimiters or newlines
//!    inside quotes are data.
//!
//! 2. **DelimitedWriter**: pulls records from its upstream and produces the
//!    characters of the table, header line first, quoting values the way the
//!    reader expects them.
//!
//! Both are configured with a builder and connected with
//! [`Pipe::pipe`](crate::core::pipe::Pipe::pipe).
//!
//! # Format
//!
//! - Delimiter: any single character except `"` and `\n`, default `,`
//! - Quote: always `"`
//! - Row terminator: always `\n`
//!
//! # Examples
//!
//! ## Converting CSV to TSV
//!
//! ```
//! use tabpipe::core::pipe::Pipe;
//! use tabpipe::item::delimited::{DelimitedReaderBuilder, DelimitedWriterBuilder};
//! use tabpipe::item::sink::{drain, SinkBuilder};
//! use tabpipe::item::source::SourceBuilder;
//!
//! let csv = "name,quote\nAda,\"said \"\"hi\"\", left\"\n";
//!
//! let pipeline = SourceBuilder::new()
//!     .from_reader(csv.as_bytes())
//!     .pipe(DelimitedReaderBuilder::new())
//!     .unwrap()
//!     .pipe(DelimitedWriterBuilder::new().delimiter('\t'))
//!     .unwrap();
//!
//! let (execution, sink) = drain(pipeline, SinkBuilder::new().from_writer(Vec::new())).unwrap();
//! let tsv = String::from_utf8(sink.into_inner().unwrap()).unwrap();
//!
//! assert_eq!(tsv, "name\tquote\nAda\t\"said \"\"hi\"\", left\"\n");
//! assert_eq!(execution.read_count, tsv.chars().count());
//! ```

use std::borrow::Cow;

use crate::error::PipeError;

/// A module providing facilities for reading delimited records.
pub mod delimited_reader;

/// A module providing facilities for writing delimited records.
pub mod delimited_writer;

pub use delimited_reader::{DelimitedReader, DelimitedReaderBuilder};
pub use delimited_writer::{DelimitedWriter, DelimitedWriterBuilder};

/// The quote character.
pub const QUOTE: char = '"';

/// The row terminator.
pub const ROW_TERMINATOR: char = '\n';

pub const DEFAULT_DELIMITER: char = ',';

/// Rejects delimiters that would make the format ambiguous.
pub(crate) fn check_delimiter(delimiter: char) -> Result<char, PipeError> {
    match delimiter {
        QUOTE => Err(PipeError::Configuration(
            "delimiter must differ from the quote character".to_string(),
        )),
        ROW_TERMINATOR => Err(PipeError::Configuration(
            "delimiter must differ from the row terminator".to_string(),
        )),
        _ => Ok(delimiter),
    }
}

/// Escapes one value for output.
///
/// Quotes are doubled, and the value is wrapped in quotes when it contains
/// the delimiter, a quote or a row terminator. Other values are returned
/// as is.
///
/// ```
/// use tabpipe::item::delimited::escape;
///
/// assert_eq!(escape("plain", ','), "plain");
/// assert_eq!(escape("a,b", ','), "\"a,b\"");
/// assert_eq!(escape("a,b", '\t'), "a,b");
/// assert_eq!(escape("say \"hi\"", ','), "\"say \"\"hi\"\"\"");
/// ```
pub fn escape(value: &str, delimiter: char) -> Cow<'_, str> {
    let needs_quotes = value
        .chars()
        .any(|c| c == delimiter || c == QUOTE || c == ROW_TERMINATOR);

    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push(QUOTE);
    for c in value.chars() {
        if c == QUOTE {
            escaped.push(QUOTE);
        }
        escaped.push(c);
    }
    escaped.push(QUOTE);
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use crate::error::PipeError;

    use super::{check_delimiter, escape};

    #[test]
    fn values_with_special_characters_are_quoted() {
        assert_eq!(escape("", ','), "");
        assert_eq!(escape("line\nbreak", ';'), "\"line\nbreak\"");
        assert_eq!(escape("a;b", ';'), "\"a;b\"");
        assert_eq!(escape("\"", ','), "\"\"\"\"");
        assert_eq!(escape("tab\there", ','), "tab\there");
    }

    #[test]
    fn quote_and_newline_cannot_be_delimiters() {
        assert!(matches!(check_delimiter('"'), Err(PipeError::Configuration(_))));
        assert!(matches!(check_delimiter('\n'), Err(PipeError::Configuration(_))));
        assert_eq!(check_delimiter('|').unwrap(), '|');
    }
}
