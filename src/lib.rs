#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # tabpipe

 Lazy, pull-based pipelines for delimited text tables (CSV, TSV, or any
 single-character delimiter).

 A pipeline is a chain of stages. Every stage pulls from the one before it,
 one element at a time, so a table of any size flows through with at most
 one value or one line buffered per stage.

 ## Core Concepts

- **ItemReader:** a stage that produces its next element on demand. Every stage of a pipeline is one.
- **ItemProcessor:** business logic applied to each element; returning `None` filters the element out.
- **ItemWriter:** the terminal consumer, fed in chunks.
- **Pipe:** `upstream.pipe(stage)` connects two stages.
- **Step:** the explicit run of a pipeline: drains the last stage into a writer and reports counts.

 A typical pipeline is:

 `Source` (bytes → chars) → `DelimitedReader` (chars → records) → transforms →
 `DelimitedWriter` (records → chars) → `Sink` (chars → bytes)

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| logger        | Enables a logging `ItemProcessor`, useful for debugging purposes |
| full          | Enables all available features                                |

 ## Getting Started

```rust
use tabpipe::{
    core::pipe::{process, Pipe},
    error::PipeError,
    item::{
        delimited::{DelimitedReaderBuilder, DelimitedWriterBuilder},
        sink::{drain, SinkBuilder},
        source::SourceBuilder,
        transform::{FieldEqualsFilter, StripColumnProcessor},
    },
};

fn main() -> Result<(), PipeError> {
    let csv = "date,event,extra notes
2024-03-01,shopping,\"bread, milk\"
2024-03-02,cinema,
2024-03-03,shopping,\"said \"\"never again\"\"\"
";

    let pipeline = SourceBuilder::new()
        .from_reader(csv.as_bytes())
        .pipe(DelimitedReaderBuilder::new().delimiter(','))?
        .pipe(process(FieldEqualsFilter::new("event", "shopping")))?
        .pipe(process(StripColumnProcessor::new("extra notes")))?
        .pipe(DelimitedWriterBuilder::new().delimiter('\t'))?;

    let (_execution, sink) = drain(pipeline, SinkBuilder::new().from_writer(Vec::new()))?;
    let tsv = String::from_utf8(sink.into_inner()?).unwrap();

    assert_eq!(tsv, "date\tevent\n2024-03-01\tshopping\n2024-03-03\tshopping\n");

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.

 */

/// Core module for pipeline stages and their execution
pub mod core;

/// Error types for pipeline operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of stages: source, sink, delimited reader and writer, transforms
pub mod item;
