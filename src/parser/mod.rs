// Parser module: input file classification, field splitting and timestamps.

pub mod fields;
pub mod timestamp;

use crate::error::LoadError;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use timestamp::TimestampMode;

/// Substring that marks a file as user/rating data.
pub const USER_MARKER: &str = "user";

/// Substring that marks the epoch-millisecond sibling of a user file.
pub const TIMESTAMPS_MARKER: &str = "-timestamps";

/// Tables whose arity is fixed regardless of the header.
/// movie_locations rows carry more fields than the table has columns.
pub const ARITY_OVERRIDES: &[(&str, usize)] = &[("movie_locations", 5)];

/// Number of raw fields bound as-is at the start of a user row.
pub const USER_KEY_FIELDS: usize = 3;

static TABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid table name regex"));

/// How a file's rows map onto its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "timestamp_mode")]
pub enum FileKind {
    /// Arity from the header, every position normalized and inserted.
    Generic,
    /// Three key fields plus one reconciled timestamp.
    User(TimestampMode),
}

/// One input file and the table it populates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub table: String,
    pub kind: FileKind,
}

impl InputFile {
    /// Classify a path by its file name.
    ///
    /// Any name containing `user` is a user file; a user file containing
    /// `-timestamps` is the epoch variant and shares the table of its
    /// primary sibling.
    pub fn classify(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let stem = Path::new(&file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let (table, kind) = if file_name.contains(USER_MARKER) {
            if stem.contains(TIMESTAMPS_MARKER) {
                (
                    stem.replacen(TIMESTAMPS_MARKER, "", 1),
                    FileKind::User(TimestampMode::EpochMillis),
                )
            } else {
                (stem.to_string(), FileKind::User(TimestampMode::SplitFields))
            }
        } else {
            (stem.to_string(), FileKind::Generic)
        };

        if !TABLE_NAME_RE.is_match(&table) {
            return Err(LoadError::InvalidTableName { name: table });
        }
        Ok(Self { path, table, kind })
    }

    /// Arity for a generic file given the field count of its header.
    pub fn arity(&self, header_fields: usize) -> usize {
        ARITY_OVERRIDES
            .iter()
            .find(|(table, _)| *table == self.table)
            .map(|(_, arity)| *arity)
            .unwrap_or(header_fields)
    }
}
