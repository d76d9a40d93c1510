use std::fmt;

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::error::PipeError;

/// One row of a table: ordered column names with one string value each.
///
/// Values are kept aligned with the column list, so the value of
/// `columns()[i]` is `values()[i]`. Column names are unique within a record.
///
/// # Examples
///
/// ```
/// use tabpipe::item::record::Record;
///
/// let mut record = Record::new(
///     vec!["date".to_string(), "event".to_string()],
///     vec!["2024-01-01".to_string(), "shopping".to_string()],
/// )
/// .unwrap();
///
/// assert_eq!(record.get("event"), Some("shopping"));
/// assert!(record.value("price").is_err());
///
/// record.remove_column("date").unwrap();
/// assert_eq!(record.columns(), ["event"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<String>,
}

impl Record {
    /// Builds a record from a column list and the matching values.
    ///
    /// Fails with [`PipeError::MalformedRow`] when the lengths differ and with
    /// [`PipeError::DuplicateColumn`] when a column name repeats.
    pub fn new(columns: Vec<String>, values: Vec<String>) -> Result<Self, PipeError> {
        if columns.len() != values.len() {
            return Err(PipeError::MalformedRow {
                row: 0,
                expected: columns.len(),
                found: values.len(),
            });
        }
        check_unique(&columns)?;
        Ok(Self { columns, values })
    }

    /// Builds a record whose columns are already known to be unique.
    pub(crate) fn from_trusted_parts(columns: Vec<String>, values: Vec<String>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of `column` in the column list.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Value of `column`, if the record has it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.position(column).map(|index| self.values[index].as_str())
    }

    /// Value of `column`, failing with [`PipeError::UnknownColumn`].
    pub fn value(&self, column: &str) -> Result<&str, PipeError> {
        self.get(column)
            .ok_or_else(|| PipeError::UnknownColumn(column.to_string()))
    }

    pub fn get_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Name of the column at `index`.
    pub fn column_at(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    /// Replaces the value of an existing column.
    pub fn set<S: Into<String>>(&mut self, column: &str, value: S) -> Result<(), PipeError> {
        let index = self
            .position(column)
            .ok_or_else(|| PipeError::UnknownColumn(column.to_string()))?;
        self.values[index] = value.into();
        Ok(())
    }

    /// Removes `column` from both the column list and the values.
    ///
    /// Returns the removed value.
    pub fn remove_column(&mut self, column: &str) -> Result<String, PipeError> {
        let index = self
            .position(column)
            .ok_or_else(|| PipeError::UnknownColumn(column.to_string()))?;
        Ok(self.remove_at(index).1)
    }

    /// Removes the column at `index`, returning its name and value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize) -> (String, String) {
        (self.columns.remove(index), self.values.remove(index))
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.columns, self.values)
    }
}

/// Fails with [`PipeError::DuplicateColumn`] on the first repeated name.
pub(crate) fn check_unique(columns: &[String]) -> Result<(), PipeError> {
    for (index, column) in columns.iter().enumerate() {
        if columns[..index].contains(column) {
            return Err(PipeError::DuplicateColumn(column.clone()));
        }
    }
    Ok(())
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (column, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:?}", column, value)?;
        }
        Ok(())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
