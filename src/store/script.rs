// Script store: renders the load as plain SQL instead of executing it.
// Values are inlined as quoted literals, so they go through quote escaping.

use super::{SqlValue, Store};
use crate::error::StoreError;
use crate::parser::fields::escape;
use std::io::{BufWriter, Write};

pub struct ScriptStore<W: Write> {
    out: BufWriter<W>,
    statements: usize,
}

impl<W: Write> ScriptStore<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
            statements: 0,
        }
    }

    /// Number of statements written so far.
    pub fn statements(&self) -> usize {
        self.statements
    }

    /// Flush buffered output and hand back the writer.
    pub fn finish(self) -> Result<W, StoreError> {
        self.out
            .into_inner()
            .map_err(|e| StoreError::Write(e.into_error()))
    }

    fn write_statement(&mut self, sql: &str) -> Result<(), StoreError> {
        writeln!(self.out, "{};", sql)?;
        self.statements += 1;
        Ok(())
    }
}

impl<W: Write> Store for ScriptStore<W> {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.write_statement("BEGIN")
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.write_statement("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.write_statement("ROLLBACK")
    }

    // Row counts are unknown without a database; report zero.
    fn clear_table(&mut self, table: &str) -> Result<usize, StoreError> {
        self.write_statement(&format!("DELETE FROM {}", table))?;
        Ok(0)
    }

    fn insert_row(&mut self, table: &str, row: &[SqlValue]) -> Result<usize, StoreError> {
        let values: Vec<String> = row.iter().map(format_sql_value).collect();
        self.write_statement(&format!(
            "INSERT INTO {} VALUES ({})",
            table,
            values.join(", ")
        ))?;
        Ok(1)
    }
}

// Inline literal for one value.
fn format_sql_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(s) => format!("'{}'", escape(s)),
        SqlValue::Timestamp(_) => format!("TIMESTAMP '{}'", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut ScriptStore<Vec<u8>>),
    {
        let mut store = ScriptStore::new(Vec::new());
        f(&mut store);
        String::from_utf8(store.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_insert_escapes_quotes() {
        let sql = render(|s| {
            s.insert_row(
                "movies",
                &[
                    SqlValue::Text("1".into()),
                    SqlValue::Text("Schindler's List".into()),
                    SqlValue::Text("".into()),
                ],
            )
            .unwrap();
        });
        assert_eq!(
            sql,
            "INSERT INTO movies VALUES ('1', 'Schindler''s List', '');\n"
        );
    }

    #[test]
    fn test_timestamp_literal() {
        let ts = NaiveDate::from_ymd_opt(2017, 6, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let sql = render(|s| {
            s.insert_row(
                "user_ratedmovies",
                &[SqlValue::Text("75".into()), SqlValue::Timestamp(ts)],
            )
            .unwrap();
        });
        assert_eq!(
            sql,
            "INSERT INTO user_ratedmovies VALUES ('75', TIMESTAMP '2017-06-15 09:30:00');\n"
        );
    }

    #[test]
    fn test_file_framing() {
        let mut store = ScriptStore::new(Vec::new());
        store.begin().unwrap();
        assert_eq!(store.clear_table("tags").unwrap(), 0);
        store.commit().unwrap();
        assert_eq!(store.statements(), 3);
        let sql = String::from_utf8(store.finish().unwrap()).unwrap();
        assert_eq!(sql, "BEGIN;\nDELETE FROM tags;\nCOMMIT;\n");
    }
}
