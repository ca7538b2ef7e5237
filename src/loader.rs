// Table loader: refreshes one table from one input file.
// The header is read before anything is deleted, then the table is cleared
// and every remaining line becomes one row. The whole file runs inside one
// store transaction.

use crate::error::{LoadError, RecordError};
use crate::parser::fields::{resolve, split, trim_line_end};
use crate::parser::timestamp::{Reconciler, TimestampMode};
use crate::parser::{FileKind, InputFile, USER_KEY_FIELDS};
use crate::progress::ProgressManager;
use crate::store::{SqlValue, Store};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{debug, info, warn};

/// What to do with a line that cannot be turned into a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadLinePolicy {
    /// Log the line, count it and keep loading.
    #[default]
    Skip,
    /// Fail the whole file.
    Abort,
}

/// Row counts for one loaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct FileStats {
    pub rows_deleted: usize,
    pub rows_inserted: usize,
    pub lines_skipped: usize,
}

/// Loads one file at a time into a [`Store`].
pub struct TableLoader<'a, S: Store> {
    store: &'a mut S,
    reconciler: Reconciler,
    policy: BadLinePolicy,
    progress: &'a ProgressManager,
}

impl<'a, S: Store> TableLoader<'a, S> {
    pub fn new(
        store: &'a mut S,
        reconciler: Reconciler,
        policy: BadLinePolicy,
        progress: &'a ProgressManager,
    ) -> Self {
        Self {
            store,
            reconciler,
            policy,
            progress,
        }
    }

    /// Replace the contents of `file.table` with the rows of `file`.
    pub fn load(&mut self, file: &InputFile) -> Result<FileStats, LoadError> {
        let io_error = |source| LoadError::Io {
            path: file.path.clone(),
            source,
        };
        let handle = File::open(&file.path).map_err(io_error)?;
        let mut reader = BufReader::new(handle);

        // Header: only its field count matters.
        let mut header = String::new();
        let header_len = reader.read_line(&mut header).map_err(io_error)?;
        if header_len == 0 {
            return Err(LoadError::EmptyFile {
                path: file.path.clone(),
            });
        }
        let header_fields = split(trim_line_end(&header)).len();

        let bar = self.progress.new_file_bar(&file.path, &file.table);
        if let Some(b) = &bar {
            b.inc(header_len as u64);
        }

        self.store.begin()?;
        // A failed COMMIT leaves the transaction open, so it rolls back too.
        let loaded = self
            .stream_rows(file, header_fields, &mut reader, bar.as_ref())
            .and_then(|stats| {
                self.store.commit()?;
                Ok(stats)
            });
        match loaded {
            Ok(stats) => {
                if let Some(b) = bar {
                    b.finish_with_message("done");
                }
                Ok(stats)
            }
            Err(e) => {
                if let Err(rollback_err) = self.store.rollback() {
                    warn!(table = %file.table, error = %rollback_err, "rollback failed");
                }
                if let Some(b) = bar {
                    b.abandon_with_message("failed");
                }
                Err(e)
            }
        }
    }

    fn stream_rows(
        &mut self,
        file: &InputFile,
        header_fields: usize,
        reader: &mut BufReader<File>,
        bar: Option<&ProgressBar>,
    ) -> Result<FileStats, LoadError> {
        let mut stats = FileStats::default();

        info!(table = %file.table, "deleting previous rows");
        stats.rows_deleted = self.store.clear_table(&file.table)?;

        let arity = match file.kind {
            FileKind::Generic => file.arity(header_fields),
            FileKind::User(_) => USER_KEY_FIELDS + 1,
        };
        info!(
            table = %file.table,
            path = %file.path.display(),
            arity,
            "inserting rows"
        );

        // Line 1 is the header.
        let mut line_no = 1usize;
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line).map_err(|source| LoadError::Io {
                path: file.path.clone(),
                source,
            })?;
            if read == 0 {
                break;
            }
            line_no += 1;
            if let Some(b) = bar {
                b.inc(read as u64);
            }

            let fields = split(trim_line_end(&line));
            let row = match file.kind {
                FileKind::Generic => Ok(generic_row(&fields, arity)),
                FileKind::User(mode) => user_row(&fields, mode, &self.reconciler),
            };
            let row = match row {
                Ok(row) => row,
                Err(source) => match self.policy {
                    BadLinePolicy::Skip => {
                        warn!(
                            table = %file.table,
                            line = line_no,
                            error = %source,
                            "skipping line"
                        );
                        stats.lines_skipped += 1;
                        continue;
                    }
                    BadLinePolicy::Abort => {
                        return Err(LoadError::Record {
                            line: line_no,
                            source,
                        })
                    }
                },
            };

            stats.rows_inserted += self.store.insert_row(&file.table, &row)?;
        }

        debug!(
            table = %file.table,
            lines = line_no - 1,
            inserted = stats.rows_inserted,
            skipped = stats.lines_skipped,
            "file streamed"
        );
        Ok(stats)
    }
}

// First `arity` positions, padded with the missing-field value.
fn generic_row(fields: &[&str], arity: usize) -> Vec<SqlValue> {
    (0..arity)
        .map(|i| SqlValue::Text(resolve(fields.get(i).copied()).into_owned()))
        .collect()
}

// Key fields are bound untouched; the timestamp is reconciled per mode.
fn user_row(
    fields: &[&str],
    mode: TimestampMode,
    reconciler: &Reconciler,
) -> Result<Vec<SqlValue>, RecordError> {
    if fields.len() < USER_KEY_FIELDS {
        return Err(RecordError::IndexOutOfRange {
            index: fields.len(),
            len: fields.len(),
        });
    }
    let mut row: Vec<SqlValue> = fields[..USER_KEY_FIELDS]
        .iter()
        .map(|f| SqlValue::Text(f.to_string()))
        .collect();
    row.push(SqlValue::Timestamp(reconciler.reconcile(fields, mode)?));
    Ok(row)
}
