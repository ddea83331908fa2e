//! Per-provider pipelines.
//!
//! Each provider implements the same two-phase capability: `collect` walks a
//! league season by season, filling the raw JSON cache over its transport,
//! and `flatten` projects the cached documents into delimited tables under
//! the clean output tree. The CLI picks the implementation explicitly; there
//! is no flag-based dispatch.

pub mod fotmob;
pub mod scoresway;
pub mod sofascore;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::LeagueEntry;
use crate::report::RunReport;
use crate::table::Table;

#[async_trait]
pub trait Provider {
    /// Short provider key, used as the top-level directory name ("fm", "sw", "ss").
    fn key(&self) -> &'static str;

    /// Fetch (or reuse) every raw document for one league.
    async fn collect(&self, league: &LeagueEntry, report: &mut RunReport) -> Result<()>;

    /// Project the cached documents into output tables for one league.
    fn flatten(&self, league: &LeagueEntry, report: &mut RunReport) -> Result<()>;
}

/// Write a table unless it came out empty; an empty source section simply
/// produces no file.
pub(crate) fn write_table(table: &Table, path: &Path, report: &mut RunReport) -> Result<()> {
    if table.is_empty() {
        return Ok(());
    }
    table.write_delimited(path)?;
    report.record_table();
    Ok(())
}
