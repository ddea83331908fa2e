//! Per-run outcome counters. The source behavior only printed failures and
//! always exited zero; the rewrite tracks skipped entities and lets the CLI
//! signal them through the exit code.

use crate::cache::CacheOutcome;

#[derive(Debug, Default)]
pub struct RunReport {
    /// Documents fetched over the network this run.
    pub fetched: usize,
    /// Documents served from the disk cache.
    pub reused: usize,
    /// Tables written to the clean output tree.
    pub tables_written: usize,
    /// Entities that produced no document (failed fetch or incomplete data).
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache-or-fetch outcome for the entity named by `what`.
    pub fn record(&mut self, what: &str, outcome: &CacheOutcome) {
        match outcome {
            CacheOutcome::Hit(_) => self.reused += 1,
            CacheOutcome::Fetched(_) => self.fetched += 1,
            CacheOutcome::Missing => self.skipped.push(what.to_string()),
        }
    }

    pub fn record_table(&mut self) {
        self.tables_written += 1;
    }

    pub fn skip(&mut self, what: impl Into<String>) {
        self.skipped.push(what.into());
    }

    pub fn has_failures(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Print the end-of-run summary.
    pub fn print_summary(&self) {
        println!("\nRun summary");
        println!("  fetched:        {}", self.fetched);
        println!("  cache hits:     {}", self.reused);
        println!("  tables written: {}", self.tables_written);
        println!("  skipped:        {}", self.skipped.len());
        for what in &self.skipped {
            println!("    - {what}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOutcome;
    use serde_json::json;

    #[test]
    fn counts_each_outcome_kind() {
        let mut report = RunReport::new();
        report.record("a", &CacheOutcome::Fetched(json!({})));
        report.record("b", &CacheOutcome::Hit(json!({})));
        report.record("c", &CacheOutcome::Missing);
        assert_eq!(report.fetched, 1);
        assert_eq!(report.reused, 1);
        assert_eq!(report.skipped, vec!["c"]);
        assert!(report.has_failures());
    }
}
