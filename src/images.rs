//! Image download through an out-of-process R script. Kept behind a narrow
//! url-plus-destination interface; the pipeline only cares about
//! success/failure and never fails a run over a missing image.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::{self, is_stale};

pub struct ImageTool {
    rscript_path: PathBuf,
    script_path: PathBuf,
    delay: Duration,
}

impl ImageTool {
    pub fn new(rscript_path: impl Into<PathBuf>, script_path: impl Into<PathBuf>) -> Self {
        Self {
            rscript_path: rscript_path.into(),
            script_path: script_path.into(),
            delay: Duration::from_secs(crate::api::REQUEST_DELAY_SECS),
        }
    }

    /// Download `url` to `dest` unless a fresh copy already exists. Returns
    /// whether a usable file is present afterwards.
    pub async fn download(&self, url: &str, dest: &Path) -> bool {
        if fresh_on_disk(dest) {
            return true;
        }
        if let Some(parent) = dest.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return false;
            }
        }

        println!("Downloading image {url}");
        let status = Command::new(&self.rscript_path)
            .arg(&self.script_path)
            .arg(url)
            .arg(dest)
            .status();

        tokio::time::sleep(self.delay).await;

        match status {
            Ok(status) if status.success() => true,
            Ok(status) => {
                eprintln!("Image tool exited with {status} for {url}");
                false
            }
            Err(err) => {
                eprintln!("Failed to launch image tool for {url}: {err}");
                false
            }
        }
    }
}

fn fresh_on_disk(dest: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(dest) else {
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    let modified: DateTime<Utc> = modified.into();
    !is_stale(Utc::now() - modified, cache::images())
}
