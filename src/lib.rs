//! populate: bulk-load tab-delimited dataset files into relational tables.
//!
//! Each input file replaces the full contents of one table. Generic files
//! take their arity from the header line; user files carry three key
//! columns plus a timestamp that is either spread over six fields or given
//! as epoch milliseconds.
//!
//! # Example
//!
//! ```ignore
//! use populate::{LoadRunner, ProgressManager, RunOptions, SqliteStore, StoreConfig};
//!
//! let mut store = SqliteStore::open(&config)?;
//! let progress = ProgressManager::disabled();
//! let report = LoadRunner::new(&mut store, RunOptions::default(), &progress)
//!     .run(&["movies.dat", "user_ratedmovies.dat"]);
//! store.close()?;
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod logger;
pub mod parser;
pub mod progress;
pub mod runner;
pub mod store;

pub use config::Config;
pub use loader::{BadLinePolicy, FileStats, TableLoader};
pub use parser::{FileKind, InputFile};
pub use progress::ProgressManager;
pub use runner::{FileOutcome, FileStatus, LoadRunner, RunOptions, RunReport};
pub use store::{ScriptStore, SqlValue, SqliteStore, Store, StoreConfig};
