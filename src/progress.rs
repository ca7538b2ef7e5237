// Progress bar management using indicatif.
// All bars live under one MultiProgress so each file renders on its own line.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProgressManager {
    multi: Option<Arc<MultiProgress>>,
}

impl ProgressManager {
    // Create a new manager. If enabled=false, no bars are created.
    pub fn new(enabled: bool) -> Self {
        let multi = if enabled {
            Some(Arc::new(MultiProgress::new()))
        } else {
            None
        };
        Self { multi }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    // Create a bar tracking bytes read from `path`, labelled with the table.
    pub fn new_file_bar(&self, path: &Path, label: &str) -> Option<ProgressBar> {
        let mp = self.multi.as_ref()?;
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let bar = mp.add(ProgressBar::new(size));
        bar.set_style(file_style());
        bar.set_prefix(label.to_string());
        Some(bar)
    }
}

fn file_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:24} {bytes:>10}/{total_bytes:<10} [{bar:50}] {percent:>3}% {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█ ")
}
