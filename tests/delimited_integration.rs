mod common;

use std::fs::{self, read_to_string};

use anyhow::Result;
use tabpipe::{
    core::{
        item::ItemReader,
        pipe::{process, Pipe},
        step::StepStatus,
    },
    item::{
        delimited::{DelimitedReaderBuilder, DelimitedWriterBuilder},
        record::Record,
        sink::{drain, SinkBuilder},
        source::SourceBuilder,
        transform::{FieldEqualsFilter, FilterProcessor, StripColumnProcessor},
    },
};
use tempfile::tempdir;

use common::parse;

const EVENTS: &str = "date,event,extra notes
2024-03-01,shopping,\"bread, milk\"
2024-03-02,cinema,\"row 7, \"\"the good seats\"\"\"
2024-03-03,shopping,
2024-03-04,dentist,\"bring
the forms\"
2024-03-05,shopping,shoes
";

/// Runs `data` through a reader and a writer, returning the written text.
fn convert(data: &str, from: char, to: char) -> Result<String> {
    let pipeline = SourceBuilder::new()
        .from_reader(data.as_bytes())
        .pipe(DelimitedReaderBuilder::new().delimiter(from))?
        .pipe(DelimitedWriterBuilder::new().delimiter(to))?;

    let (_, sink) = drain(pipeline, SinkBuilder::new().from_writer(Vec::new()))?;
    Ok(String::from_utf8(sink.into_inner()?)?)
}

#[test]
fn round_trip_reproduces_the_file_byte_for_byte() -> Result<()> {
    let dir = tempdir()?;
    let input_path = dir.path().join("events.csv");
    let output_path = dir.path().join("copy.csv");
    fs::write(&input_path, EVENTS)?;

    let pipeline = SourceBuilder::new()
        .from_path(&input_path)?
        .pipe(DelimitedReaderBuilder::new())?
        .pipe(DelimitedWriterBuilder::new())?;

    let step = pipeline.pipe(SinkBuilder::new().chunk(16).from_path(&output_path)?)?;
    let execution = step.execute()?;
    drop(step);

    assert_eq!(execution.status, StepStatus::Success);
    assert_eq!(execution.read_count, EVENTS.chars().count());
    assert_eq!(fs::read(&output_path)?, fs::read(&input_path)?);
    Ok(())
}

#[test]
fn round_trip_with_other_delimiters() -> Result<()> {
    let semicolons = "a;b;c\n1;\"x;y\";\n\"\"\"\";é;ü\n";
    assert_eq!(convert(semicolons, ';', ';')?, semicolons);

    let pipes = "left|right\n\"a|b\"|\"multi\nline\"\n";
    assert_eq!(convert(pipes, '|', '|')?, pipes);
    Ok(())
}

#[test]
fn comma_to_tab_keeps_values_and_row_count() -> Result<()> {
    let tsv = convert(EVENTS, ',', '\t')?;

    let (csv_header, csv_rows) = parse(EVENTS, ',')?;
    let (tsv_header, tsv_rows) = parse(&tsv, '\t')?;

    assert_eq!(tsv_header, csv_header);
    assert_eq!(tsv_rows, csv_rows);
    assert_eq!(tsv_rows.len(), 5);
    assert!(tsv.starts_with("date\tevent\textra notes\n"));
    assert!(tsv.contains("2024-03-01\tshopping\tbread, milk\n"));
    Ok(())
}

#[test]
fn tabs_inside_values_are_quoted_in_tab_output() -> Result<()> {
    let tsv = convert("a,b\n\"x\ty\",z\n", ',', '\t')?;

    assert_eq!(tsv, "a\tb\n\"x\ty\"\tz\n");
    assert_eq!(parse(&tsv, '\t')?.1, vec![vec!["x\ty", "z"]]);
    Ok(())
}

#[test]
fn value_with_delimiter_quote_and_newline_round_trips() -> Result<()> {
    let tricky = "one, \"two\"\nthree";
    let record = Record::new(
        vec!["id".to_string(), "text".to_string()],
        vec!["1".to_string(), tricky.to_string()],
    )?;

    let records = std::cell::RefCell::new(vec![record].into_iter());
    let upstream = RecordsReader(records);
    let writer = DelimitedWriterBuilder::new().from_upstream(upstream)?;
    let (_, sink) = drain(writer, SinkBuilder::new().from_writer(Vec::new()))?;
    let text = String::from_utf8(sink.into_inner()?)?;

    assert_eq!(text, "id,text\n1,\"one, \"\"two\"\"\nthree\"\n");
    assert_eq!(parse(&text, ',')?.1, vec![vec!["1", tricky]]);
    Ok(())
}

struct RecordsReader(std::cell::RefCell<std::vec::IntoIter<Record>>);

impl ItemReader<Record> for RecordsReader {
    fn read(&self) -> tabpipe::core::item::ItemReaderResult<Record> {
        Ok(self.0.borrow_mut().next())
    }
}

#[test]
fn last_row_without_newline_is_not_lost() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("no_newline.csv");
    fs::write(&path, "a,b\n1,2\n3,\"4\"")?;

    let reader = DelimitedReaderBuilder::new().from_path(&path)?;
    let mut rows = Vec::new();
    while let Some(record) = ItemReader::<Record>::read(&reader)? {
        rows.push(record.values().to_vec());
    }

    assert_eq!(rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    assert_eq!(convert("a,b\n1,2\n3,\"4\"", ',', ',')?, "a,b\n1,2\n3,4\n");
    Ok(())
}

#[test]
fn filter_and_strip_pipeline_between_files() -> Result<()> {
    let dir = tempdir()?;
    let input_path = dir.path().join("events.csv");
    let output_path = dir.path().join("shopping.tsv");
    fs::write(&input_path, EVENTS)?;

    let pipeline = SourceBuilder::new()
        .from_path(&input_path)?
        .pipe(DelimitedReaderBuilder::new().delimiter(','))?
        .pipe(process(FieldEqualsFilter::new("event", "shopping")))?
        .pipe(process(StripColumnProcessor::new("extra notes")))?;

    assert_eq!(
        pipeline.upstream().upstream().headers()?,
        ["date", "event", "extra notes"]
    );

    let pipeline = pipeline.pipe(DelimitedWriterBuilder::new().delimiter('\t'))?;
    let (execution, sink) = drain(pipeline, SinkBuilder::new().from_path(&output_path)?)?;
    assert!(sink.is_closed());

    let output = read_to_string(&output_path)?;
    assert_eq!(
        output,
        "date\tevent\n2024-03-01\tshopping\n2024-03-03\tshopping\n2024-03-05\tshopping\n"
    );
    assert_eq!(execution.write_count, output.chars().count());
    Ok(())
}

#[test]
fn predicate_filter_in_a_pipeline() -> Result<()> {
    let pipeline = SourceBuilder::new()
        .from_reader(EVENTS.as_bytes())
        .pipe(DelimitedReaderBuilder::new())?
        .pipe(process(FilterProcessor::new(|record: &Record| {
            record.get("extra notes").is_some_and(|notes| notes.contains('\n'))
        })))?
        .pipe(DelimitedWriterBuilder::new())?;

    let (_, sink) = drain(pipeline, SinkBuilder::new().from_writer(Vec::new()))?;

    assert_eq!(
        String::from_utf8(sink.into_inner()?)?,
        "date,event,extra notes\n2024-03-04,dentist,\"bring\nthe forms\"\n"
    );
    Ok(())
}

#[test]
fn reader_agrees_with_the_csv_crate() -> Result<()> {
    let data = "name,quote,empty\n\
                Ada,\"said \"\"hi\"\"\",\n\
                \"Grace, H.\",\"multi\nline\",\"\"\n\
                Linus,plain,x";

    let (header, rows) = parse(data, ',')?;

    let mut oracle = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());
    let expected_header: Vec<String> = oracle.headers()?.iter().map(String::from).collect();
    let mut expected_rows = Vec::new();
    for record in oracle.records() {
        expected_rows.push(record?.iter().map(String::from).collect::<Vec<_>>());
    }

    assert_eq!(header, expected_header);
    assert_eq!(rows, expected_rows);
    Ok(())
}

#[test]
fn writer_output_is_readable_by_the_csv_crate() -> Result<()> {
    let written = convert(EVENTS, ',', ';')?;

    let mut oracle = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(written.as_bytes());
    let notes: Vec<String> = oracle
        .records()
        .map(|record| record.map(|r| r[2].to_string()))
        .collect::<Result<_, _>>()?;

    assert_eq!(
        notes,
        vec![
            "bread, milk",
            "row 7, \"the good seats\"",
            "",
            "bring\nthe forms",
            "shoes"
        ]
    );
    Ok(())
}

#[cfg(feature = "logger")]
#[test]
fn logger_stage_forwards_records() -> Result<()> {
    use tabpipe::item::logger::LoggerProcessor;

    let _ = env_logger::builder().is_test(true).try_init();

    let pipeline = SourceBuilder::new()
        .from_reader("a,b\n1,2\n".as_bytes())
        .pipe(DelimitedReaderBuilder::new())?
        .pipe(process(LoggerProcessor::default()))?
        .pipe(DelimitedWriterBuilder::new())?;

    let (_, sink) = drain(pipeline, SinkBuilder::new().from_writer(Vec::new()))?;
    assert_eq!(sink.into_inner()?, b"a,b\n1,2\n");
    Ok(())
}
