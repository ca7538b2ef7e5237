// Destination stores. A store receives already-resolved rows and decides how
// they reach the tables: bound parameters against SQLite, or an SQL script.

pub mod script;
pub mod sqlite;

use crate::error::StoreError;
use crate::parser::timestamp::TIMESTAMP_FORMAT;
use chrono::NaiveDateTime;
use std::fmt;

pub use script::ScriptStore;
pub use sqlite::{SqliteStore, StoreConfig};

/// One column value of a row handed to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Timestamp(NaiveDateTime),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Operations the loader needs from a destination.
///
/// Each file is loaded between `begin` and `commit`; `rollback` is called
/// instead of `commit` when the file fails.
pub trait Store {
    fn begin(&mut self) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;

    fn rollback(&mut self) -> Result<(), StoreError>;

    /// Delete every row of `table`, returning how many were removed.
    fn clear_table(&mut self, table: &str) -> Result<usize, StoreError>;

    /// Insert one row, values in column order.
    fn insert_row(&mut self, table: &str, row: &[SqlValue]) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_display_formats_timestamps() {
        let ts = NaiveDate::from_ymd_opt(2017, 6, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(SqlValue::Timestamp(ts).to_string(), "2017-06-15 09:30:00");
        assert_eq!(SqlValue::Text("it's".into()).to_string(), "it's");
    }
}
