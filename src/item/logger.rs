use log::info;

use crate::{
    core::item::{ItemProcessor, ItemProcessorResult},
    item::record::Record,
};

/// Logs every record at `info` level and forwards it unchanged.
#[derive(Default)]
pub struct LoggerProcessor {}

impl ItemProcessor<Record, Record> for LoggerProcessor {
    fn process(&self, item: Record) -> ItemProcessorResult<Record> {
        info!("Record: {}", item);
        Ok(Some(item))
    }
}
