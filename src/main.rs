// populate: load tab-delimited dataset files into existing tables.
// Every file fully replaces the contents of its table; files are loaded in
// the order given and a summary is printed at the end.

use clap::{CommandFactory, Parser};
use populate::error::StoreError;
use populate::{
    logger, BadLinePolicy, Config, LoadRunner, ProgressManager, RunOptions, RunReport,
    ScriptStore, SqliteStore,
};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};

// Command-line flags and positional arguments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Enable debug logging (disables progress bars).
    #[arg(long)]
    debug: bool,

    /// SQLite database to load into (overrides POPULATE_DATABASE).
    #[arg(long)]
    database: Option<PathBuf>,

    /// Write the SQL script to this file ("-" for stdout) instead of loading.
    #[arg(long, value_name = "PATH")]
    emit_sql: Option<String>,

    /// Fail a file on its first malformed line instead of skipping the line.
    #[arg(long)]
    strict: bool,

    /// Stop at the first file that fails.
    #[arg(long)]
    fail_fast: bool,

    /// Write the per-file report as JSON.
    #[arg(long, value_name = "PATH")]
    report_json: Option<PathBuf>,

    /// Data files to load, in order.
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.files.is_empty() {
        // Print help and exit non-zero when nothing to load.
        let _ = Args::command().print_help();
        eprintln!();
        return ExitCode::FAILURE;
    }

    logger::init(args.debug);

    match Config::from_env() {
        Ok(config) => execute(args, config),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// Success only when every file loaded.
fn execute(args: Args, config: Config) -> ExitCode {
    match run(args, config) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args, mut config: Config) -> Result<RunReport, Box<dyn std::error::Error>> {
    if let Some(db) = args.database.clone() {
        config.database = Some(db);
    }

    let options = RunOptions {
        reconciler: config.reconciler(),
        bad_lines: if args.strict {
            BadLinePolicy::Abort
        } else {
            BadLinePolicy::Skip
        },
        fail_fast: args.fail_fast,
    };
    debug!(
        files = args.files.len(),
        epoch_offset = %options.reconciler.offset(),
        bad_lines = ?options.bad_lines,
        fail_fast = options.fail_fast,
        "starting load"
    );

    // Progress bars are disabled in debug mode to avoid mangled output.
    let progress = ProgressManager::new(!args.debug);

    let report = match args.emit_sql.as_deref() {
        Some(target) => {
            let out: Box<dyn Write> = if target == "-" {
                Box::new(io::stdout())
            } else {
                Box::new(File::create(target).map_err(StoreError::Write)?)
            };
            let mut store = ScriptStore::new(out);
            let report = LoadRunner::new(&mut store, options, &progress).run(&args.files);
            info!(statements = store.statements(), output = target, "SQL script written");
            store.finish()?;
            report
        }
        None => {
            let store_config = config.store()?;
            info!(database = %store_config.database.display(), "connecting");
            let mut store = SqliteStore::open(&store_config)?;
            info!("connected");
            let report = LoadRunner::new(&mut store, options, &progress).run(&args.files);
            // Close even when files failed; a close error is logged, not fatal.
            if let Err(e) = store.close() {
                error!("{}", e);
            }
            report
        }
    };

    if let Some(path) = args.report_json.as_ref() {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
    }

    print_summary(&report)?;
    Ok(report)
}

fn print_summary(report: &RunReport) -> io::Result<()> {
    let sep = "=".repeat(60);
    let mut stderr = io::stderr();
    writeln!(stderr, "\n{}\nSUMMARY\n{}", sep, sep)?;
    writeln!(stderr, "Files loaded:   {}", report.loaded())?;
    writeln!(stderr, "Files failed:   {}", report.failed())?;
    writeln!(stderr, "Files skipped:  {}", report.skipped())?;
    writeln!(stderr, "Rows inserted:  {}", report.rows_inserted())?;
    writeln!(stderr, "Lines skipped:  {}", report.lines_skipped())?;
    writeln!(stderr, "{}", sep)?;
    Ok(())
}
