// Load runner: drives the loader over every input file in order.
// Each file has its own failure boundary; a failed file is recorded and the
// run moves on unless fail-fast is requested.

use crate::loader::{BadLinePolicy, FileStats, TableLoader};
use crate::parser::timestamp::Reconciler;
use crate::parser::{FileKind, InputFile};
use crate::progress::ProgressManager;
use crate::store::Store;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Knobs for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub reconciler: Reconciler,
    pub bad_lines: BadLinePolicy,
    pub fail_fast: bool,
}

/// Result of loading one file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FileStatus {
    Loaded(FileStats),
    Failed { error: String },
    /// Not attempted because an earlier file failed in fail-fast mode.
    Skipped,
}

/// What happened to one input file. `table` and `kind` are absent when the
/// file could not be classified.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FileKind>,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Outcomes for every input file, in input order.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunReport {
    pub files: Vec<FileOutcome>,
}

impl RunReport {
    pub fn loaded(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Loaded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped))
    }

    pub fn rows_inserted(&self) -> usize {
        self.stats().map(|s| s.rows_inserted).sum()
    }

    pub fn lines_skipped(&self) -> usize {
        self.stats().map(|s| s.lines_skipped).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.status)).count()
    }

    fn stats(&self) -> impl Iterator<Item = &FileStats> {
        self.files.iter().filter_map(|f| match &f.status {
            FileStatus::Loaded(stats) => Some(stats),
            _ => None,
        })
    }
}

/// Runs the loader over a list of files, one failure boundary per file.
pub struct LoadRunner<'a, S: Store> {
    store: &'a mut S,
    options: RunOptions,
    progress: &'a ProgressManager,
}

impl<'a, S: Store> LoadRunner<'a, S> {
    pub fn new(store: &'a mut S, options: RunOptions, progress: &'a ProgressManager) -> Self {
        Self {
            store,
            options,
            progress,
        }
    }

    /// Load `files` in order and report what happened to each.
    pub fn run<P: Into<PathBuf> + Clone>(&mut self, files: &[P]) -> RunReport {
        let mut report = RunReport::default();
        // Table -> file that last refreshed it in this run.
        let mut refreshed: HashMap<String, PathBuf> = HashMap::new();
        let mut stop = false;

        for path in files {
            let path: PathBuf = path.clone().into();
            if stop {
                report.files.push(FileOutcome {
                    path,
                    table: None,
                    kind: None,
                    status: FileStatus::Skipped,
                });
                continue;
            }

            let outcome = self.load_one(path, &mut refreshed);
            if let FileStatus::Failed { error } = &outcome.status {
                error!(path = %outcome.path.display(), error = %error, "file failed");
                stop = self.options.fail_fast;
            }
            report.files.push(outcome);
        }
        report
    }

    fn load_one(
        &mut self,
        path: PathBuf,
        refreshed: &mut HashMap<String, PathBuf>,
    ) -> FileOutcome {
        let file = match InputFile::classify(&path) {
            Ok(file) => file,
            Err(e) => {
                return FileOutcome {
                    path,
                    table: None,
                    kind: None,
                    status: FileStatus::Failed {
                        error: e.to_string(),
                    },
                }
            }
        };

        if let Some(previous) = refreshed.get(&file.table) {
            warn!(
                table = %file.table,
                previous = %previous.display(),
                "table already loaded in this run; its rows will be replaced"
            );
        }
        if let FileKind::User(mode) = file.kind {
            info!(path = %file.path.display(), table = %file.table, ?mode, "user data file");
        }

        let mut loader = TableLoader::new(
            &mut *self.store,
            self.options.reconciler,
            self.options.bad_lines,
            self.progress,
        );
        let status = match loader.load(&file) {
            Ok(stats) => {
                refreshed.insert(file.table.clone(), file.path.clone());
                info!(
                    table = %file.table,
                    inserted = stats.rows_inserted,
                    deleted = stats.rows_deleted,
                    skipped = stats.lines_skipped,
                    "table loaded"
                );
                FileStatus::Loaded(stats)
            }
            Err(e) => FileStatus::Failed {
                error: e.to_string(),
            },
        };

        FileOutcome {
            path: file.path,
            table: Some(file.table),
            kind: Some(file.kind),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::SqlValue;
    use tempfile::TempDir;

    // Records calls and fails inserts into one table.
    #[derive(Default)]
    struct RecordingStore {
        calls: Vec<String>,
        fail_table: Option<&'static str>,
    }

    impl Store for RecordingStore {
        fn begin(&mut self) -> Result<(), StoreError> {
            self.calls.push("BEGIN".into());
            Ok(())
        }

        fn commit(&mut self) -> Result<(), StoreError> {
            self.calls.push("COMMIT".into());
            Ok(())
        }

        fn rollback(&mut self) -> Result<(), StoreError> {
            self.calls.push("ROLLBACK".into());
            Ok(())
        }

        fn clear_table(&mut self, table: &str) -> Result<usize, StoreError> {
            self.calls.push(format!("DELETE {}", table));
            Ok(0)
        }

        fn insert_row(&mut self, table: &str, row: &[SqlValue]) -> Result<usize, StoreError> {
            if self.fail_table == Some(table) {
                return Err(StoreError::Write(std::io::Error::other("disk full")));
            }
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            self.calls
                .push(format!("INSERT {} ({})", table, values.join("|")));
            Ok(1)
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(store: &mut RecordingStore, files: &[PathBuf], fail_fast: bool) -> RunReport {
        let progress = ProgressManager::disabled();
        let options = RunOptions {
            fail_fast,
            ..RunOptions::default()
        };
        LoadRunner::new(store, options, &progress).run(files)
    }

    #[test]
    fn test_files_load_in_order() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write(&dir, "movies.dat", "id\ttitle\tyear\n1\tSpaceship\t2001\n"),
            write(&dir, "tags.dat", "id\tvalue\n7\tearth\n"),
        ];
        let mut store = RecordingStore::default();
        let report = run(&mut store, &files, false);

        assert!(report.is_success());
        assert_eq!(report.rows_inserted(), 2);
        assert_eq!(
            store.calls,
            vec![
                "BEGIN",
                "DELETE movies",
                "INSERT movies (1|Spaceship|2001)",
                "COMMIT",
                "BEGIN",
                "DELETE tags",
                "INSERT tags (7|earth)",
                "COMMIT",
            ]
        );
    }

    #[test]
    fn test_failure_is_isolated_per_file() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write(&dir, "movies.dat", "id\ttitle\n1\tSpaceship\n"),
            write(&dir, "tags.dat", "id\tvalue\n7\tearth\n"),
        ];
        let mut store = RecordingStore {
            fail_table: Some("movies"),
            ..RecordingStore::default()
        };
        let report = run(&mut store, &files, false);

        assert_eq!(report.failed(), 1);
        assert_eq!(report.loaded(), 1);
        assert!(!report.is_success());
        assert!(store.calls.contains(&"ROLLBACK".to_string()));
        assert_eq!(report.files[1].table.as_deref(), Some("tags"));
        assert!(matches!(report.files[1].status, FileStatus::Loaded(_)));
    }

    #[test]
    fn test_fail_fast_skips_remaining_files() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            dir.path().join("missing.dat"),
            write(&dir, "tags.dat", "id\tvalue\n7\tearth\n"),
        ];
        let mut store = RecordingStore::default();
        let report = run(&mut store, &files, true);

        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(store.calls.is_empty());
    }

    #[test]
    fn test_invalid_table_name_is_reported() {
        let dir = TempDir::new().unwrap();
        let files = vec![write(&dir, "bad name.dat", "a\n1\n")];
        let mut store = RecordingStore::default();
        let report = run(&mut store, &files, false);

        assert_eq!(report.failed(), 1);
        assert!(report.files[0].table.is_none());
        assert!(store.calls.is_empty());
    }

    #[test]
    fn test_user_and_timestamp_variant_share_table() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write(
                &dir,
                "user_ratedmovies.dat",
                "u\tm\tr\td\tmo\ty\th\tmi\ts\n75\t3\t1\t29\t10\t2006\t23\t17\t16\n",
            ),
            write(
                &dir,
                "user_ratedmovies-timestamps.dat",
                "u\tm\tr\tt\n75\t3\t1\t1162160236000\n",
            ),
        ];
        let mut store = RecordingStore::default();
        let report = run(&mut store, &files, false);

        assert!(report.is_success());
        let deletes: Vec<&String> = store
            .calls
            .iter()
            .filter(|c| c.starts_with("DELETE"))
            .collect();
        assert_eq!(deletes, vec!["DELETE user_ratedmovies", "DELETE user_ratedmovies"]);
        let inserts: Vec<&String> = store
            .calls
            .iter()
            .filter(|c| c.starts_with("INSERT"))
            .collect();
        assert_eq!(inserts[0], inserts[1]);
    }

    #[test]
    fn test_report_serializes_status() {
        let report = RunReport {
            files: vec![FileOutcome {
                path: PathBuf::from("movies.dat"),
                table: Some("movies".into()),
                kind: Some(FileKind::Generic),
                status: FileStatus::Loaded(FileStats {
                    rows_deleted: 0,
                    rows_inserted: 3,
                    lines_skipped: 1,
                }),
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        let file = &json["files"][0];
        assert_eq!(file["status"], "loaded");
        assert_eq!(file["rows_inserted"], 3);
        assert_eq!(file["kind"]["kind"], "generic");
    }

    #[test]
    fn test_unclassified_file_omits_table_and_kind() {
        let outcome = FileOutcome {
            path: PathBuf::from("bad name.dat"),
            table: None,
            kind: None,
            status: FileStatus::Failed {
                error: "invalid table name".into(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        let fields = json.as_object().unwrap();
        assert!(!fields.contains_key("table"));
        assert!(!fields.contains_key("kind"));
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "invalid table name");
    }
}
