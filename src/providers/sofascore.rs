//! Sofascore pipeline. All reads go through a WebDriver-controlled browser;
//! the raw cache holds paged event lists, assembled standings, season
//! listings, entity profiles and one six-part document per ended match.
//! Flattening projects those into season info tables and per-season match
//! tables (info, lineups, team stats, shots, momentum).

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::sofascore::{
    entity_url, event_url, events_page_url, image_url, season_listing_url, seasons_url,
    standings_url, BrowserClient,
};
use crate::cache::{fast_moving, immutable, profile, CacheOutcome, JsonCache};
use crate::config::LeagueEntry;
use crate::images::ImageTool;
use crate::jsonv::{arr_at, at, bool_at, elem_at, float_at, int_at, str_at};
use crate::report::RunReport;
use crate::table::{Cell, Row, Table};

use super::{write_table, Provider};

/// The standings endpoint returns a single-element `standings` list per
/// partition.
const STANDINGS_FIRST: usize = 0;

const PROFILE_KINDS: [&str; 3] = ["player", "team", "venue"];

pub struct Sofascore {
    browser: BrowserClient,
    images: Option<ImageTool>,
    cache: JsonCache,
    clean_dir: PathBuf,
    desired_seasons: HashSet<String>,
}

impl Sofascore {
    pub fn new(
        browser: BrowserClient,
        images: Option<ImageTool>,
        cache: JsonCache,
        clean_dir: PathBuf,
        desired_seasons: HashSet<String>,
    ) -> Self {
        Self {
            browser,
            images,
            cache,
            clean_dir,
            desired_seasons,
        }
    }

    pub async fn close(self) -> Result<()> {
        self.browser.close().await
    }

    async fn available_seasons(
        &self,
        league: &LeagueEntry,
        report: &mut RunReport,
    ) -> Result<Option<Value>> {
        let rel = format!("{}/available_seasons.json", league.slug());
        let url = seasons_url(league.sofascore);
        let outcome = self
            .cache
            .get_or_fetch(
                &rel,
                immutable(),
                |v| !arr_at(v, &["seasons"]).is_empty(),
                || self.browser.fetch_json(&url),
            )
            .await?;
        report.record(&rel, &outcome);
        Ok(outcome.into_value())
    }

    /// Event pages for one season, fetched until the feed runs out. Running
    /// off the end is the normal termination, not a failure.
    async fn event_pages(
        &self,
        league: &LeagueEntry,
        season: &str,
        season_id: i64,
        report: &mut RunReport,
    ) -> Result<Vec<Value>> {
        let mut pages = Vec::new();
        for page in 0.. {
            let rel = format!("{}/{season}/info/matches/{page}.json", league.slug());
            let url = events_page_url(league.sofascore, season_id, page);
            let outcome = self
                .cache
                .get_or_fetch(
                    &rel,
                    fast_moving(),
                    |v| !arr_at(v, &["events"]).is_empty(),
                    || self.browser.fetch_json(&url),
                )
                .await?;
            if matches!(outcome, CacheOutcome::Missing) {
                break;
            }
            report.record(&rel, &outcome);
            if let Some(doc) = outcome.into_value() {
                pages.push(doc);
            }
        }
        Ok(pages)
    }

    /// One assembled standings document per season: the total, home and away
    /// partitions fetched separately, each replaced by `{}` when unavailable.
    async fn standings(
        &self,
        league: &LeagueEntry,
        season: &str,
        season_id: i64,
        report: &mut RunReport,
    ) -> Result<()> {
        let rel = format!("{}/{season}/info/standings.json", league.slug());
        let outcome = self
            .cache
            .get_or_fetch(
                &rel,
                fast_moving(),
                |v| v.get("total").is_some(),
                || async {
                    let mut assembled = Map::new();
                    for partition in ["total", "home", "away"] {
                        let url = standings_url(league.sofascore, season_id, partition);
                        let doc = match self.browser.fetch_json(&url).await {
                            Some(doc) if !arr_at(&doc, &["standings"]).is_empty() => doc,
                            _ => json!({}),
                        };
                        assembled.insert(partition.to_string(), doc);
                    }
                    Some(Value::Object(assembled))
                },
            )
            .await?;
        report.record(&rel, &outcome);
        Ok(())
    }

    async fn season_listing(
        &self,
        league: &LeagueEntry,
        season: &str,
        season_id: i64,
        kind: &str,
        report: &mut RunReport,
    ) -> Result<Option<Value>> {
        let rel = format!("{}/{season}/info/{kind}.json", league.slug());
        let url = season_listing_url(league.sofascore, season_id, kind);
        let key = format!("{kind}s");
        let outcome = self
            .cache
            .get_or_fetch(
                &rel,
                fast_moving(),
                |v| !arr_at(v, &[key.as_str()]).is_empty(),
                || self.browser.fetch_json(&url),
            )
            .await?;
        report.record(&rel, &outcome);
        Ok(outcome.into_value())
    }

    /// The six-part document for one ended match. Persisted only when every
    /// section came back complete, so a partially scraped match is refetched
    /// whole on the next run.
    async fn match_document(
        &self,
        league: &LeagueEntry,
        season: &str,
        match_id: i64,
        report: &mut RunReport,
    ) -> Result<Option<Value>> {
        let rel = format!("{}/{season}/matches/match/{match_id}.json", league.slug());
        let outcome = self
            .cache
            .get_or_fetch(&rel, immutable(), match_doc_complete, || async {
                let mut assembled = Map::new();
                for (name, section) in [
                    ("match", ""),
                    ("lineups", "lineups"),
                    ("statistics", "statistics"),
                    ("shotmap", "shotmap"),
                    ("graph", "graph"),
                    ("incidents", "incidents"),
                ] {
                    let doc = self.browser.fetch_json(&event_url(match_id, section)).await?;
                    assembled.insert(name.to_string(), doc);
                }
                Some(Value::Object(assembled))
            })
            .await?;
        report.record(&rel, &outcome);
        Ok(outcome.into_value())
    }

    /// Entity profile plus portrait for one player, team, venue or manager.
    async fn entity(
        &self,
        league: &LeagueEntry,
        season: &str,
        kind: &str,
        id: i64,
        report: &mut RunReport,
    ) -> Result<()> {
        let rel = format!("{}/{season}/info/{kind}/{id}.json", league.slug());
        let url = entity_url(kind, id);
        let outcome = self
            .cache
            .get_or_fetch(
                &rel,
                profile(),
                |v| at(v, &[kind]).is_some_and(Value::is_object),
                || self.browser.fetch_json(&url),
            )
            .await?;
        report.record(&rel, &outcome);

        if let Some(images) = &self.images {
            let dest = self
                .cache
                .root()
                .join(league.slug())
                .join(season)
                .join("images")
                .join(kind)
                .join(format!("{id}.png"));
            images.download(&image_url(kind, id), &dest).await;
        }
        Ok(())
    }

    fn raw_season_dir(&self, league: &LeagueEntry, season: &str) -> PathBuf {
        self.cache.root().join(league.slug()).join(season)
    }
}

#[async_trait]
impl Provider for Sofascore {
    fn key(&self) -> &'static str {
        "ss"
    }

    async fn collect(&self, league: &LeagueEntry, report: &mut RunReport) -> Result<()> {
        let Some(available) = self.available_seasons(league, report).await? else {
            return Ok(());
        };

        for (season, season_id) in season_ids(&available, &self.desired_seasons) {
            let pages = self.event_pages(league, &season, season_id, report).await?;
            self.standings(league, &season, season_id, report).await?;

            let mut listings = BTreeMap::new();
            for kind in PROFILE_KINDS {
                if let Some(doc) = self
                    .season_listing(league, &season, season_id, kind, report)
                    .await?
                {
                    listings.insert(kind, doc);
                }
            }

            // Managers are only discoverable through match documents, so the
            // dedup set spans the whole season.
            let mut seen_managers = HashSet::new();
            for match_id in ended_match_ids(&pages) {
                let Some(doc) = self.match_document(league, &season, match_id, report).await?
                else {
                    continue;
                };
                for side in ["homeTeam", "awayTeam"] {
                    let id = int_at(&doc, &["match", "event", side, "manager", "id"]);
                    if id != 0 && seen_managers.insert(id) {
                        self.entity(league, &season, "manager", id, report).await?;
                    }
                }
            }

            for kind in PROFILE_KINDS {
                let Some(listing) = listings.get(kind) else { continue };
                for id in listing_ids(listing, kind) {
                    self.entity(league, &season, kind, id, report).await?;
                }
            }
        }
        Ok(())
    }

    fn flatten(&self, league: &LeagueEntry, report: &mut RunReport) -> Result<()> {
        let slug = league.slug();
        let Some(available) = self.cache.load(&format!("{slug}/available_seasons.json")) else {
            report.skip(format!("sofascore {slug}: no available-seasons document"));
            return Ok(());
        };

        let out_league = self.clean_dir.join(&slug);
        let seasons = seasons_table(league.id, &available, &self.desired_seasons);
        write_table(&seasons, &out_league.join("available_seasons.csv"), report)?;

        for (season, _) in season_ids(&available, &self.desired_seasons) {
            let raw_season = self.raw_season_dir(league, &season);
            if !raw_season.exists() {
                continue;
            }
            let out_season = out_league.join(&season);
            let out_info = out_season.join("info");
            let prefix = |mut table: Table| {
                table.insert_front("season", season.as_str());
                table.insert_front("league", league.id as i64);
                table
            };

            let info_rel = |name: &str| format!("{slug}/{season}/info/{name}.json");
            if let Some(standings_doc) = self.cache.load(&info_rel("standings")) {
                let out_standings = out_info.join("standings");
                for partition in ["total", "home", "away"] {
                    let table = standings_partition(&standings_doc, partition);
                    write_table(
                        &prefix(table),
                        &out_standings.join(format!("{partition}.csv")),
                        report,
                    )?;
                }
            }

            for kind in PROFILE_KINDS {
                let Some(listing) = self.cache.load(&info_rel(kind)) else {
                    report.skip(format!("sofascore {season}: no {kind} listing"));
                    continue;
                };
                let load_profile =
                    |id: i64| self.cache.load(&format!("{slug}/{season}/info/{kind}/{id}.json"));
                let table = match kind {
                    "player" => players_table(&listing, load_profile),
                    "team" => teams_table(&listing, load_profile),
                    _ => venues_table(&listing, load_profile),
                };
                write_table(&prefix(table), &out_info.join(format!("{kind}.csv")), report)?;
            }

            let manager_docs = load_dir_docs(&raw_season.join("info").join("manager"));
            write_table(
                &prefix(managers_table(&manager_docs)),
                &out_info.join("manager.csv"),
                report,
            )?;

            let match_docs = load_dir_docs(&raw_season.join("matches").join("match"));
            let tables = match_tables(&match_docs);
            let out_match = out_season.join("match");
            write_table(&prefix(tables.info), &out_match.join("info.csv"), report)?;
            write_table(&prefix(tables.lineups), &out_match.join("lineups.csv"), report)?;
            write_table(&prefix(tables.stats), &out_match.join("stats.csv"), report)?;
            write_table(&prefix(tables.shots), &out_match.join("shots.csv"), report)?;
            write_table(&prefix(tables.momentum), &out_match.join("momentum.csv"), report)?;
        }
        Ok(())
    }
}

/// Season key ("2024/2025" -> "2425" style, slashes removed) to season id,
/// restricted to the desired set.
pub fn season_ids(available: &Value, desired: &HashSet<String>) -> BTreeMap<String, i64> {
    arr_at(available, &["seasons"])
        .iter()
        .filter_map(|s| {
            let key = str_at(s, &["year"]).replace('/', "");
            let id = int_at(s, &["id"]);
            (desired.contains(&key) && id != 0).then_some((key, id))
        })
        .collect()
}

/// Ids of matches the event pages report as ended.
pub fn ended_match_ids(pages: &[Value]) -> Vec<i64> {
    pages
        .iter()
        .flat_map(|page| arr_at(page, &["events"]))
        .filter(|event| str_at(event, &["status", "description"]) == "Ended")
        .map(|event| int_at(event, &["id"]))
        .filter(|id| *id != 0)
        .collect()
}

/// All six sections of an assembled match document must be present; a match
/// missing any of them is treated as never scraped.
pub fn match_doc_complete(doc: &Value) -> bool {
    at(doc, &["match", "event"]).is_some_and(Value::is_object)
        && bool_at(doc, &["lineups", "confirmed"])
        && !arr_at(doc, &["statistics", "statistics"]).is_empty()
        && !arr_at(doc, &["shotmap", "shotmap"]).is_empty()
        && !arr_at(doc, &["graph", "graphPoints"]).is_empty()
        && !arr_at(doc, &["incidents", "incidents"]).is_empty()
}

fn listing_ids(listing: &Value, kind: &str) -> Vec<i64> {
    let (key, id_field) = match kind {
        "player" => ("players", "playerId"),
        "team" => ("teams", "id"),
        _ => ("venues", "id"),
    };
    arr_at(listing, &[key])
        .iter()
        .map(|entry| int_at(entry, &[id_field]))
        .filter(|id| *id != 0)
        .collect()
}

/// Stable-ordered JSON documents from one cache directory.
fn load_dir_docs(dir: &Path) -> Vec<Value> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();
    paths
        .into_iter()
        .filter_map(|path| {
            let text = std::fs::read_to_string(&path).ok()?;
            serde_json::from_str(&text).ok()
        })
        .collect()
}

/// One row per desired season in the availability document.
pub fn seasons_table(league_id: u32, available: &Value, desired: &HashSet<String>) -> Table {
    let rows = arr_at(available, &["seasons"])
        .iter()
        .filter_map(|season| {
            let key = str_at(season, &["year"]).replace('/', "");
            if !desired.contains(&key) {
                return None;
            }
            let mut row = Row::new();
            row.push("league", league_id as i64);
            row.push("year", key);
            row.push("season_name", str_at(season, &["name"]));
            Some(row)
        })
        .collect();
    Table::from_rows(rows)
}

/// One standings partition ("total", "home" or "away") out of the assembled
/// standings document.
pub fn standings_partition(standings_doc: &Value, partition: &str) -> Table {
    let standings = elem_at(standings_doc, &[partition, "standings"], STANDINGS_FIRST);
    let rows = arr_at(standings, &["rows"])
        .iter()
        .map(|team| {
            let mut row = Row::new();
            row.push("position", int_at(team, &["position"]));
            row.push("team", str_at(team, &["team", "name"]));
            row.push("team_slug", str_at(team, &["team", "slug"]));
            row.push("promotion", str_at(team, &["promotion", "text"]));
            row.push("points", int_at(team, &["points"]));
            row.push("matches", int_at(team, &["matches"]));
            row.push("wins", int_at(team, &["wins"]));
            row.push("losses", int_at(team, &["losses"]));
            row.push("draws", int_at(team, &["draws"]));
            row.push("scores_for", int_at(team, &["scoresFor"]));
            row.push("scores_against", int_at(team, &["scoresAgainst"]));
            row
        })
        .collect();
    Table::from_rows(rows)
}

/// Season players: the listing row enriched from the cached profile. A
/// missing profile still yields a full row of defaults so every season file
/// shares one schema.
pub fn players_table(listing: &Value, load_profile: impl Fn(i64) -> Option<Value>) -> Table {
    let rows = arr_at(listing, &["players"])
        .iter()
        .filter_map(|entry| {
            let id = int_at(entry, &["playerId"]);
            if id == 0 {
                return None;
            }
            let doc = load_profile(id).unwrap_or(Value::Null);
            let positions = arr_at(&doc, &["player", "positionsDetailed"]);
            let position_at = |idx: usize| {
                positions
                    .get(idx)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };

            let mut row = Row::new();
            row.push("id", id);
            row.push("name", str_at(entry, &["playerName"]));
            row.push("slug", str_at(&doc, &["player", "slug"]));
            row.push("short_name", str_at(&doc, &["player", "shortName"]));
            row.push("team", str_at(&doc, &["player", "team", "name"]));
            row.push("country", str_at(&doc, &["player", "country", "name"]));
            row.push(
                "position",
                if positions.len() == 1 { position_at(0) } else { String::new() },
            );
            row.push("second_position", position_at(1));
            row.push("third_position", position_at(2));
            row.push("weight", int_at(&doc, &["player", "weight"]));
            row.push("height", int_at(&doc, &["player", "height"]));
            row.push("shirt_number", int_at(&doc, &["player", "shirtNumber"]));
            row.push("pref_foot", str_at(&doc, &["player", "preferredFoot"]));
            row.push("date_birth", int_at(&doc, &["player", "dateOfBirthTimestamp"]));
            row.push("contract_until", int_at(&doc, &["player", "contractUntilTimestamp"]));
            row.push("market_value", int_at(&doc, &["player", "proposedMarketValue"]));
            Some(row)
        })
        .collect();
    Table::from_rows(rows)
}

pub fn teams_table(listing: &Value, load_profile: impl Fn(i64) -> Option<Value>) -> Table {
    let rows = arr_at(listing, &["teams"])
        .iter()
        .filter_map(|entry| {
            let id = int_at(entry, &["id"]);
            if id == 0 {
                return None;
            }
            let doc = load_profile(id).unwrap_or(Value::Null);
            let mut row = Row::new();
            row.push("id", id);
            row.push("name", str_at(entry, &["name"]));
            row.push("slug", str_at(&doc, &["team", "slug"]));
            row.push("short_name", str_at(&doc, &["team", "shortName"]));
            row.push("full_name", str_at(&doc, &["team", "fullName"]));
            row.push("code", str_at(&doc, &["team", "nameCode"]));
            row.push("manager", str_at(&doc, &["team", "manager", "name"]));
            row.push("venue", str_at(&doc, &["team", "venue", "name"]));
            row.push("country", str_at(&doc, &["team", "country", "name"]));
            row.push("primary_colour", str_at(&doc, &["team", "teamColors", "primary"]));
            row.push("secondary_colour", str_at(&doc, &["team", "teamColors", "secondary"]));
            row.push("text_colour", str_at(&doc, &["team", "teamColors", "text"]));
            row.push("foundation", int_at(&doc, &["team", "foundationDateTimestamp"]));
            Some(row)
        })
        .collect();
    Table::from_rows(rows)
}

pub fn venues_table(listing: &Value, load_profile: impl Fn(i64) -> Option<Value>) -> Table {
    let rows = arr_at(listing, &["venues"])
        .iter()
        .filter_map(|entry| {
            let id = int_at(entry, &["id"]);
            if id == 0 {
                return None;
            }
            let doc = load_profile(id).unwrap_or(Value::Null);
            let mut row = Row::new();
            row.push("id", id);
            row.push("name", str_at(entry, &["name"]));
            row.push("slug", str_at(&doc, &["venue", "slug"]));
            row.push("capacity", int_at(&doc, &["venue", "capacity"]));
            row.push("city", str_at(&doc, &["venue", "city", "name"]));
            row.push("country", str_at(&doc, &["venue", "country", "name"]));
            row.push("latitude", float_at(&doc, &["venue", "venueCoordinates", "latitude"]));
            row.push("longitude", float_at(&doc, &["venue", "venueCoordinates", "longitude"]));
            row.push("matches", int_at(&doc, &["statistics", "matches"]));
            row.push("home_goals", int_at(&doc, &["statistics", "homeTeamGoalsScored"]));
            row.push("away_goals", int_at(&doc, &["statistics", "awayTeamGoalsScored"]));
            row.push("avg_red_cards_game", float_at(&doc, &["statistics", "avgRedCardsPerGame"]));
            row.push("avg_ck_game", float_at(&doc, &["statistics", "avgCornerKicksPerGame"]));
            row.push("home_wins_perc", float_at(&doc, &["statistics", "homeTeamWinsPercentage"]));
            row.push("away_wins_perc", float_at(&doc, &["statistics", "awayTeamWinsPercentage"]));
            row.push("draws_perc", float_at(&doc, &["statistics", "drawsPercentage"]));
            Some(row)
        })
        .collect();
    Table::from_rows(rows)
}

/// Season managers out of the cached profile directory; entries without a
/// `manager` object are ignored.
pub fn managers_table(docs: &[Value]) -> Table {
    let rows = docs
        .iter()
        .filter_map(|doc| {
            let manager = at(doc, &["manager"]).filter(|m| m.is_object())?;
            let mut row = Row::new();
            row.push("id", int_at(manager, &["id"]));
            row.push("name", str_at(manager, &["name"]));
            row.push("slug", str_at(manager, &["slug"]));
            row.push("short_name", str_at(manager, &["shortName"]));
            row.push("team", str_at(manager, &["team", "name"]));
            row.push("pref_formation", str_at(manager, &["preferredFormation"]));
            row.push("country", str_at(manager, &["country", "name"]));
            row.push("date_birth", int_at(manager, &["dateOfBirthTimestamp"]));
            row.push("matches", int_at(manager, &["performance", "total"]));
            row.push("wins", int_at(manager, &["performance", "wins"]));
            row.push("draws", int_at(manager, &["performance", "draws"]));
            row.push("losses", int_at(manager, &["performance", "losses"]));
            row.push("goals_for", int_at(manager, &["performance", "goalsScored"]));
            row.push("goals_against", int_at(manager, &["performance", "goalsConceded"]));
            row.push("points", int_at(manager, &["performance", "totalPoints"]));
            Some(row)
        })
        .collect();
    Table::from_rows(rows)
}

pub struct MatchTables {
    pub info: Table,
    pub lineups: Table,
    pub stats: Table,
    pub shots: Table,
    pub momentum: Table,
}

/// Statistic values arrive as integers, floats or display strings.
fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => Cell::Float(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Cell::Text(s.clone()),
        _ => Cell::Int(0),
    }
}

/// The five per-season match tables, stacked across every cached match
/// document.
pub fn match_tables(docs: &[Value]) -> MatchTables {
    let mut info_rows = Vec::new();
    let mut lineup_tables = Vec::new();
    let mut stats_rows = Vec::new();
    let mut shot_rows = Vec::new();
    let mut momentum_rows = Vec::new();

    for doc in docs {
        let event = at(doc, &["match", "event"]).cloned().unwrap_or(Value::Null);
        let match_id = int_at(&event, &["id"]);
        let home_team = str_at(&event, &["homeTeam", "name"]);
        let away_team = str_at(&event, &["awayTeam", "name"]);

        let mut info = Row::new();
        info.push("id", match_id);
        info.push("slug", str_at(&event, &["slug"]));
        info.push("round", int_at(&event, &["roundInfo", "round"]));
        info.push("venue", str_at(&event, &["venue", "name"]));
        info.push("attendance", int_at(&event, &["attendance"]));
        info.push("referee", str_at(&event, &["referee", "name"]));
        info.push("home_team", home_team.clone());
        info.push("away_team", away_team.clone());
        info.push("home_score", int_at(&event, &["homeScore", "display"]));
        info.push("away_score", int_at(&event, &["awayScore", "display"]));
        info.push("home_formation", str_at(doc, &["lineups", "home", "formation"]));
        info.push("away_formation", str_at(doc, &["lineups", "away", "formation"]));
        info_rows.push(info);

        for (side, team, opponent) in [
            ("home", &home_team, &away_team),
            ("away", &away_team, &home_team),
        ] {
            let lineup = at(doc, &["lineups", side]).cloned().unwrap_or(Value::Null);
            lineup_tables.push(side_lineup_table(&lineup, match_id, team, opponent));
        }

        for (team, opponent, value_field) in [
            (&home_team, &away_team, "homeValue"),
            (&away_team, &home_team, "awayValue"),
        ] {
            let mut row = Row::new();
            row.push("match_id", match_id);
            row.push("team", team.as_str());
            row.push("opponent", opponent.as_str());
            let period = elem_at(doc, &["statistics", "statistics"], 0);
            for group in arr_at(period, &["groups"]) {
                for item in arr_at(group, &["statisticsItems"]) {
                    let name = str_at(item, &["name"]);
                    if !name.is_empty() {
                        row.push(name, value_cell(&item[value_field]));
                    }
                }
            }
            stats_rows.push(row);
        }

        for shot in arr_at(doc, &["shotmap", "shotmap"]) {
            let is_home = bool_at(shot, &["isHome"]);
            let mut row = Row::new();
            row.push("match_id", match_id);
            row.push("team", if is_home { home_team.as_str() } else { away_team.as_str() });
            row.push("opponent", if is_home { away_team.as_str() } else { home_team.as_str() });
            row.push("player", str_at(shot, &["player", "name"]));
            row.push("type", str_at(shot, &["shotType"]));
            row.push("situation", str_at(shot, &["situation"]));
            row.push("body_part", str_at(shot, &["bodyPart"]));
            row.push("xg", float_at(shot, &["xg"]));
            row.push("xgot", float_at(shot, &["xgot"]));
            row.push("time", int_at(shot, &["time"]));
            row.push("goalkeeper", str_at(shot, &["goalkeeper", "name"]));
            row.push("player_x", float_at(shot, &["playerCoordinates", "x"]));
            row.push("player_y", float_at(shot, &["playerCoordinates", "y"]));
            row.push("block_x", float_at(shot, &["blockCoordinates", "x"]));
            row.push("block_y", float_at(shot, &["blockCoordinates", "y"]));
            row.push("goal_x", float_at(shot, &["goalMouthCoordinates", "x"]));
            row.push("goal_y", float_at(shot, &["goalMouthCoordinates", "y"]));
            row.push("goal_z", float_at(shot, &["goalMouthCoordinates", "z"]));
            shot_rows.push(row);
        }

        for point in arr_at(doc, &["graph", "graphPoints"]) {
            let value = float_at(point, &["value"]);
            let mut row = Row::new();
            row.push("match_id", match_id);
            row.push(
                "team",
                if value >= 0.0 { home_team.as_str() } else { away_team.as_str() },
            );
            row.push("minute", float_at(point, &["minute"]));
            row.push("value", value);
            momentum_rows.push(row);
        }
    }

    MatchTables {
        info: Table::from_rows(info_rows),
        lineups: Table::concat(lineup_tables),
        stats: Table::from_rows(stats_rows),
        shots: Table::from_rows(shot_rows),
        momentum: Table::from_rows(momentum_rows),
    }
}

/// One side's lineup rows; players with zero minutes are dropped. The
/// per-player statistics map is appended wholesale, minus its metadata keys.
fn side_lineup_table(lineup: &Value, match_id: i64, team: &str, opponent: &str) -> Table {
    let rows = arr_at(lineup, &["players"])
        .iter()
        .filter_map(|player| {
            if int_at(player, &["statistics", "minutesPlayed"]) == 0 {
                return None;
            }
            let mut row = Row::new();
            row.push("match_id", match_id);
            row.push("player_id", int_at(player, &["player", "id"]));
            row.push("team", team);
            row.push("opponent", opponent);
            row.push("player", str_at(player, &["player", "name"]));
            row.push("position", str_at(player, &["position"]));
            row.push("shirt_number", int_at(player, &["shirtNumber"]));
            if let Some(stats) = at(player, &["statistics"]).and_then(Value::as_object) {
                for (name, value) in stats {
                    if name != "ratingVersions" && name != "statisticsType" {
                        row.push(name.as_str(), value_cell(value));
                    }
                }
            }
            Some(row)
        })
        .collect();
    Table::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn desired(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn available() -> Value {
        json!({"seasons": [
            {"year": "24/25", "id": 101, "name": "2024/2025"},
            {"year": "23/24", "id": 90, "name": "2023/2024"},
        ]})
    }

    #[test]
    fn season_keys_drop_slashes_and_filter() {
        let ids = season_ids(&available(), &desired(&["2425"]));
        assert_eq!(ids.len(), 1);
        assert_eq!(ids.get("2425"), Some(&101));
    }

    #[test]
    fn seasons_table_keeps_desired_only() {
        let t = seasons_table(73, &available(), &desired(&["2425"]));
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0].get("year"), Some(&Cell::Text("2425".into())));
        assert_eq!(t.rows()[0].get("season_name"), Some(&Cell::Text("2024/2025".into())));
    }

    #[test]
    fn only_ended_events_are_collected() {
        let pages = vec![
            json!({"events": [
                {"id": 1, "status": {"description": "Ended"}},
                {"id": 2, "status": {"description": "Not started"}},
            ]}),
            json!({"events": [{"id": 3, "status": {"description": "Ended"}}]}),
        ];
        assert_eq!(ended_match_ids(&pages), [1, 3]);
    }

    fn complete_match_doc() -> Value {
        json!({
            "match": {"event": {
                "id": 11, "slug": "home-away",
                "roundInfo": {"round": 7},
                "venue": {"name": "Arena"}, "attendance": 1000,
                "referee": {"name": "R"},
                "homeTeam": {"name": "Home"}, "awayTeam": {"name": "Away"},
                "homeScore": {"display": 2}, "awayScore": {"display": 0}
            }},
            "lineups": {
                "confirmed": true,
                "home": {"formation": "433", "players": [
                    {"player": {"id": 5, "name": "Starter"}, "position": "F",
                     "shirtNumber": 9,
                     "statistics": {"minutesPlayed": 90, "rating": 7.4,
                                    "ratingVersions": {"original": 7.4}}},
                    {"player": {"id": 6, "name": "Bench"}, "position": "M",
                     "shirtNumber": 14, "statistics": {"minutesPlayed": 0}}
                ]},
                "away": {"formation": "442", "players": [
                    {"player": {"id": 7, "name": "Visitor"}, "position": "D",
                     "shirtNumber": 4, "statistics": {"minutesPlayed": 90}}
                ]}
            },
            "statistics": {"statistics": [{"groups": [{"statisticsItems": [
                {"name": "Ball possession", "homeValue": 61, "awayValue": 39}
            ]}]}]},
            "shotmap": {"shotmap": [
                {"isHome": true, "player": {"name": "Starter"}, "shotType": "goal",
                 "situation": "assisted", "bodyPart": "left-foot",
                 "xg": 0.34, "xgot": 0.6, "time": 23,
                 "goalkeeper": {"name": "GK"},
                 "playerCoordinates": {"x": 10.5, "y": 40.0},
                 "goalMouthCoordinates": {"x": 0.0, "y": 48.0, "z": 1.2}}
            ]},
            "graph": {"graphPoints": [
                {"minute": 1.0, "value": 10.0},
                {"minute": 2.0, "value": -25.0}
            ]},
            "incidents": {"incidents": [{"incidentType": "goal"}]}
        })
    }

    #[test]
    fn completeness_needs_all_six_sections() {
        let mut doc = complete_match_doc();
        assert!(match_doc_complete(&doc));
        doc.as_object_mut().unwrap().remove("shotmap");
        assert!(!match_doc_complete(&doc));
    }

    #[test]
    fn match_tables_join_all_sections() {
        let docs = vec![complete_match_doc()];
        let t = match_tables(&docs);

        assert_eq!(t.info.len(), 1);
        assert_eq!(t.info.rows()[0].get("home_formation"), Some(&Cell::Text("433".into())));
        assert_eq!(t.info.rows()[0].get("home_score"), Some(&Cell::Int(2)));

        // The unused substitute is dropped and rating metadata is filtered.
        assert_eq!(t.lineups.len(), 2);
        assert_eq!(t.lineups.rows()[0].get("player"), Some(&Cell::Text("Starter".into())));
        assert_eq!(t.lineups.rows()[0].get("rating"), Some(&Cell::Float(7.4)));
        assert!(t.lineups.rows()[0].get("ratingVersions").is_none());
        assert_eq!(t.lineups.rows()[1].get("opponent"), Some(&Cell::Text("Home".into())));

        // Two stat rows per match, one per side.
        assert_eq!(t.stats.len(), 2);
        assert_eq!(t.stats.rows()[0].get("Ball possession"), Some(&Cell::Int(61)));
        assert_eq!(t.stats.rows()[1].get("Ball possession"), Some(&Cell::Int(39)));

        assert_eq!(t.shots.len(), 1);
        assert_eq!(t.shots.rows()[0].get("body_part"), Some(&Cell::Text("left-foot".into())));
        assert_eq!(t.shots.rows()[0].get("team"), Some(&Cell::Text("Home".into())));

        // Momentum rows attribute the side by the sign of the value.
        assert_eq!(t.momentum.len(), 2);
        assert_eq!(t.momentum.rows()[0].get("team"), Some(&Cell::Text("Home".into())));
        assert_eq!(t.momentum.rows()[1].get("team"), Some(&Cell::Text("Away".into())));
    }

    #[test]
    fn standings_partition_reads_first_table_rows() {
        let doc = json!({"total": {"standings": [{"rows": [{
            "position": 1,
            "team": {"name": "Leaders", "slug": "leaders"},
            "promotion": {"text": "Promotion"},
            "points": 30, "matches": 12, "wins": 9, "losses": 0, "draws": 3,
            "scoresFor": 25, "scoresAgainst": 6
        }]}]}, "home": {}, "away": {}});

        let total = standings_partition(&doc, "total");
        assert_eq!(total.len(), 1);
        assert_eq!(total.rows()[0].get("team_slug"), Some(&Cell::Text("leaders".into())));
        assert_eq!(total.rows()[0].get("points"), Some(&Cell::Int(30)));
        assert!(standings_partition(&doc, "home").is_empty());
    }

    #[test]
    fn player_rows_default_when_profile_missing() {
        let listing = json!({"players": [
            {"playerId": 5, "playerName": "With Profile"},
            {"playerId": 6, "playerName": "Without Profile"},
        ]});
        let profile = json!({"player": {
            "slug": "with-profile", "shortName": "W. Profile",
            "team": {"name": "Club"}, "country": {"name": "Spain"},
            "positionsDetailed": ["ST", "LW"],
            "weight": 80, "height": 183, "shirtNumber": 9,
            "preferredFoot": "Right", "dateOfBirthTimestamp": 612316800i64,
            "proposedMarketValue": 2000000
        }});
        let t = players_table(&listing, |id| (id == 5).then(|| profile.clone()));

        assert_eq!(t.len(), 2);
        let with = &t.rows()[0];
        // Two detailed positions: primary stays empty, second is filled.
        assert_eq!(with.get("position"), Some(&Cell::Text("".into())));
        assert_eq!(with.get("second_position"), Some(&Cell::Text("LW".into())));
        assert_eq!(with.get("team"), Some(&Cell::Text("Club".into())));

        let without = &t.rows()[1];
        assert_eq!(without.get("name"), Some(&Cell::Text("Without Profile".into())));
        assert_eq!(without.get("team"), Some(&Cell::Text("".into())));
        assert_eq!(without.get("market_value"), Some(&Cell::Int(0)));
        // Both rows share one schema.
        assert_eq!(t.columns().len(), 16);
    }

    #[test]
    fn managers_table_ignores_docs_without_profile() {
        let docs = vec![
            json!({"manager": {"id": 1, "name": "Coach", "slug": "coach",
                               "performance": {"total": 20, "wins": 12}}}),
            json!({"error": "not found"}),
        ];
        let t = managers_table(&docs);
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0].get("matches"), Some(&Cell::Int(20)));
    }
}
