#![allow(dead_code)]

pub mod mocks;

use tabpipe::{
    core::{item::ItemReader, pipe::Pipe},
    error::PipeError,
    item::{
        delimited::DelimitedReaderBuilder,
        record::Record,
        source::SourceBuilder,
    },
};

/// Parses `data` into its header and the values of every row.
pub fn parse(data: &str, delimiter: char) -> Result<(Vec<String>, Vec<Vec<String>>), PipeError> {
    let reader = SourceBuilder::new()
        .from_reader(data.as_bytes())
        .pipe(DelimitedReaderBuilder::new().delimiter(delimiter))?;

    let mut rows = Vec::new();
    while let Some(record) = ItemReader::<Record>::read(&reader)? {
        rows.push(record.values().to_vec());
    }

    Ok((reader.headers()?.to_vec(), rows))
}
