//! Injected run configuration: the competition-metadata table, the
//! desired-seasons allow-list, and the Scoresway URL table. Loaded once from a
//! `utils` directory and passed explicitly into the drivers.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One row of `comps.csv`: internal league id plus each provider's external
/// code and the display name.
#[derive(Debug, Clone, Deserialize)]
pub struct LeagueEntry {
    pub id: u32,
    pub tournament: String,
    pub fotmob: i64,
    pub sofascore: i64,
}

impl LeagueEntry {
    /// Filesystem-safe league name, e.g. "Primera Federación" -> "primera-federación".
    pub fn slug(&self) -> String {
        self.tournament.to_lowercase().replace(' ', "-")
    }
}

/// Per-league Scoresway endpoints, one column per (kind, season) pair:
/// `match2425`, `standings2425`, `squads2425`, ...
#[derive(Debug, Clone, Default)]
pub struct ScoreswayUrls {
    headers: Vec<String>,
    rows: Vec<(u32, Vec<String>)>,
}

impl ScoreswayUrls {
    /// Endpoint for a league and a `{kind}{season}` column, if configured.
    pub fn url(&self, league_id: u32, kind: &str, season: &str) -> Option<&str> {
        let column = format!("{kind}{season}");
        let idx = self.headers.iter().position(|h| *h == column)?;
        let (_, cells) = self.rows.iter().find(|(id, _)| *id == league_id)?;
        cells.get(idx).map(String::as_str).filter(|u| !u.is_empty())
    }

    /// Season keys that have a `match{season}` column, in header order.
    pub fn seasons(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter_map(|h| h.strip_prefix("match"))
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub leagues: Vec<LeagueEntry>,
    pub desired_seasons: HashSet<String>,
    pub scoresway: ScoreswayUrls,
}

impl Config {
    /// Load `comps.csv`, `des_seasons.json` and `sw_urls.csv` from `utils_dir`.
    pub fn load(utils_dir: &Path) -> Result<Self> {
        let leagues = load_leagues(&utils_dir.join("comps.csv"))?;
        let desired_seasons = load_desired_seasons(&utils_dir.join("des_seasons.json"))?;
        let scoresway = load_scoresway_urls(&utils_dir.join("sw_urls.csv"))?;
        Ok(Self {
            leagues,
            desired_seasons,
            scoresway,
        })
    }

    pub fn league(&self, id: u32) -> Option<&LeagueEntry> {
        self.leagues.iter().find(|l| l.id == id)
    }

    pub fn season_desired(&self, key: &str) -> bool {
        self.desired_seasons.contains(key)
    }
}

fn load_leagues(path: &Path) -> Result<Vec<LeagueEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut leagues = Vec::new();
    for record in reader.deserialize() {
        let entry: LeagueEntry = record.context("Malformed comps.csv row")?;
        leagues.push(entry);
    }
    Ok(leagues)
}

fn load_desired_seasons(path: &Path) -> Result<HashSet<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let seasons: Vec<String> =
        serde_json::from_str(&text).context("des_seasons.json is not a JSON string array")?;
    Ok(seasons.into_iter().collect())
}

fn load_scoresway_urls(path: &Path) -> Result<ScoreswayUrls> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("sw_urls.csv has no header row")?
        .iter()
        .skip(1) // first column is the league id
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed sw_urls.csv row")?;
        let id: u32 = record
            .get(0)
            .unwrap_or_default()
            .parse()
            .context("sw_urls.csv id column is not an integer")?;
        let cells = record.iter().skip(1).map(str::to_string).collect();
        rows.push((id, cells));
    }
    Ok(ScoreswayUrls { headers, rows })
}
