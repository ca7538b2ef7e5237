// SQLite-backed store. Every value is bound as a parameter, so no escaping
// is needed on this path.

use super::{SqlValue, Store};
use crate::error::StoreError;
use rusqlite::types::{ToSql, ToSqlOutput};
use rusqlite::{params_from_iter, Connection};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the SQLite store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database: PathBuf,
    pub busy_timeout: Duration,
}

pub struct SqliteStore {
    conn: Connection,
    // Last INSERT built, keyed by table and arity.
    insert_sql: Option<(String, usize, String)>,
}

impl SqliteStore {
    /// Open the database named in `config`. The tables must already exist.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let connection_error = |source| StoreError::Connection {
            database: config.database.display().to_string(),
            source,
        };
        let conn = Connection::open(&config.database).map_err(connection_error)?;
        conn.busy_timeout(config.busy_timeout)
            .map_err(connection_error)?;
        debug!(database = %config.database.display(), "sqlite connection opened");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection (used for in-memory databases).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            insert_sql: None,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Close(e))
    }

    fn batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql).map_err(|source| StoreError::Query {
            sql: sql.to_string(),
            source,
        })
    }

    fn insert_statement(&mut self, table: &str, arity: usize) -> String {
        if let Some((cached_table, cached_arity, sql)) = &self.insert_sql {
            if cached_table == table && *cached_arity == arity {
                return sql.clone();
            }
        }
        let placeholders: Vec<String> = (1..=arity).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} VALUES ({})",
            table,
            placeholders.join(", ")
        );
        self.insert_sql = Some((table.to_string(), arity, sql.clone()));
        sql
    }
}

impl Store for SqliteStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if self.conn.is_autocommit() {
            // Nothing open; SQLite already rolled back on error.
            return Ok(());
        }
        self.batch("ROLLBACK")
    }

    fn clear_table(&mut self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("DELETE FROM {}", table);
        self.conn
            .execute(&sql, [])
            .map_err(|source| StoreError::Query { sql, source })
    }

    fn insert_row(&mut self, table: &str, row: &[SqlValue]) -> Result<usize, StoreError> {
        let sql = self.insert_statement(table, row.len());
        let mut stmt = match self.conn.prepare_cached(&sql) {
            Ok(stmt) => stmt,
            Err(source) => return Err(StoreError::Query { sql, source }),
        };
        stmt.execute(params_from_iter(row.iter()))
            .map_err(|source| StoreError::Query {
                sql: sql.clone(),
                source,
            })
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlValue::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            SqlValue::Timestamp(_) => Ok(ToSqlOutput::from(self.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn memory_store() -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE movies (id TEXT, title TEXT, year TEXT);
             CREATE TABLE user_ratedmovies (user_id TEXT, movie_id TEXT, rating TEXT, ts TEXT);",
        )
        .unwrap();
        SqliteStore::from_connection(conn)
    }

    fn text(values: &[&str]) -> Vec<SqlValue> {
        values.iter().map(|v| SqlValue::Text(v.to_string())).collect()
    }

    #[test]
    fn test_insert_binds_quotes_verbatim() {
        let mut store = memory_store();
        store
            .insert_row("movies", &text(&["1", "Schindler's List", "1993"]))
            .unwrap();
        let title: String = store
            .connection()
            .query_row("SELECT title FROM movies", [], |r| r.get(0))
            .unwrap();
        assert_eq!(title, "Schindler's List");
    }

    #[test]
    fn test_clear_table_reports_deleted_rows() {
        let mut store = memory_store();
        store.insert_row("movies", &text(&["1", "a", "2001"])).unwrap();
        store.insert_row("movies", &text(&["2", "b", "2002"])).unwrap();
        assert_eq!(store.clear_table("movies").unwrap(), 2);
        assert_eq!(store.clear_table("movies").unwrap(), 0);
    }

    #[test]
    fn test_timestamp_is_stored_as_text() {
        let mut store = memory_store();
        let ts = NaiveDate::from_ymd_opt(2006, 10, 29)
            .unwrap()
            .and_hms_opt(23, 17, 16)
            .unwrap();
        let mut row = text(&["75", "3", "1"]);
        row.push(SqlValue::Timestamp(ts));
        store.insert_row("user_ratedmovies", &row).unwrap();
        let stored: String = store
            .connection()
            .query_row("SELECT ts FROM user_ratedmovies", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "2006-10-29 23:17:16");
    }

    #[test]
    fn test_rollback_restores_rows() {
        let mut store = memory_store();
        store.insert_row("movies", &text(&["1", "a", "2001"])).unwrap();
        store.begin().unwrap();
        store.clear_table("movies").unwrap();
        store.rollback().unwrap();
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM movies", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_missing_table_is_query_error() {
        let mut store = memory_store();
        let err = store.clear_table("nope").unwrap_err();
        assert!(matches!(err, StoreError::Query { .. }));
        let err = store.insert_row("nope", &text(&["1"])).unwrap_err();
        assert!(matches!(err, StoreError::Query { .. }));
    }

    #[test]
    fn test_arity_mismatch_is_query_error() {
        let mut store = memory_store();
        let err = store.insert_row("movies", &text(&["1", "a"])).unwrap_err();
        assert!(matches!(err, StoreError::Query { .. }));
    }

    #[test]
    fn test_open_bad_path_is_connection_error() {
        let config = StoreConfig {
            database: PathBuf::from("/nonexistent-dir/populate/db.sqlite"),
            busy_timeout: Duration::from_millis(10),
        };
        let err = SqliteStore::open(&config).err().unwrap();
        assert!(matches!(err, StoreError::Connection { .. }));
    }
}
