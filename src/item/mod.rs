/// This module provides the record type flowing between stages.
pub mod record;

/// This module provides the character source at the head of a pipeline.
pub mod source;

/// This module provides the character sink at the end of a pipeline.
pub mod sink;

/// This module provides the delimited (CSV, TSV, ...) reader and writer stages.
pub mod delimited;

/// This module provides filtering and projection stages for records.
pub mod transform;

#[cfg(feature = "logger")]
/// This module provides a logging stage, useful for debugging purposes.
pub mod logger;
