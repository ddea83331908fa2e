//! FotMob pipeline: available-seasons index and per-season league documents,
//! flattened into a seasons table and one wide standings table per season.
//!
//! There is no per-match collection stage for this provider; the league
//! documents already carry the standings partitions the analytics need.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::fotmob::{league_url, season_url, FotmobClient};
use crate::cache::{immutable, JsonCache};
use crate::config::LeagueEntry;
use crate::jsonv::{arr_at, at, elem_at, float_at, int_at, str_at};
use crate::report::RunReport;
use crate::table::{Row, Table};

use super::{write_table, Provider};

pub struct Fotmob {
    client: FotmobClient,
    cache: JsonCache,
    clean_dir: PathBuf,
    desired_seasons: HashSet<String>,
}

impl Fotmob {
    pub fn new(
        client: FotmobClient,
        cache: JsonCache,
        clean_dir: PathBuf,
        desired_seasons: HashSet<String>,
    ) -> Self {
        Self {
            client,
            cache,
            clean_dir,
            desired_seasons,
        }
    }

    /// The available-seasons document, with the raw season-label list
    /// rewritten into a `label -> {key, link}` map before caching.
    async fn available_seasons(
        &self,
        league_code: i64,
        report: &mut RunReport,
    ) -> Result<Option<Value>> {
        let rel = format!("{league_code}/available_seasons.json");
        let outcome = self
            .cache
            .get_or_fetch(
                &rel,
                immutable(),
                |v| {
                    at(v, &["allAvailableSeasons"])
                        .and_then(Value::as_object)
                        .is_some_and(|m| !m.is_empty())
                },
                || async {
                    let mut doc = self.client.fetch_json(&league_url(league_code)).await?;
                    if !doc.is_object() {
                        return None;
                    }
                    let labels: Vec<String> = arr_at(&doc, &["allAvailableSeasons"])
                        .iter()
                        .filter_map(|s| s.as_str().map(str::to_string))
                        .collect();
                    let mut seasons = Map::new();
                    for label in labels {
                        if let Some(key) = season_key(&label) {
                            let link = season_url(league_code, &label);
                            seasons.insert(label, json!({"key": key, "link": link}));
                        }
                    }
                    doc["allAvailableSeasons"] = Value::Object(seasons);
                    Some(doc)
                },
            )
            .await?;
        report.record(&rel, &outcome);
        Ok(outcome.into_value())
    }

    /// Desired season keys mapped to their fetch links, in key order.
    fn seasons_map(&self, available: &Value) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(seasons) = at(available, &["allAvailableSeasons"]).and_then(Value::as_object) {
            for entry in seasons.values() {
                let key = str_at(entry, &["key"]);
                let link = str_at(entry, &["link"]);
                if self.desired_seasons.contains(&key) && !link.is_empty() {
                    map.insert(key, link);
                }
            }
        }
        map
    }

    async fn season_data(
        &self,
        league_code: i64,
        season_key: &str,
        link: &str,
        report: &mut RunReport,
    ) -> Result<Option<Value>> {
        let rel = format!("{league_code}/Season{season_key}.json");
        let outcome = self
            .cache
            .get_or_fetch(
                &rel,
                immutable(),
                |v| {
                    at(v, &["fixtures"])
                        .and_then(Value::as_object)
                        .is_some_and(|m| !m.is_empty())
                },
                || self.client.fetch_json(link),
            )
            .await?;
        report.record(&rel, &outcome);
        Ok(outcome.into_value())
    }
}

#[async_trait]
impl Provider for Fotmob {
    fn key(&self) -> &'static str {
        "fm"
    }

    async fn collect(&self, league: &LeagueEntry, report: &mut RunReport) -> Result<()> {
        let code = league.fotmob;
        let Some(available) = self.available_seasons(code, report).await? else {
            return Ok(());
        };

        for (key, link) in self.seasons_map(&available) {
            self.season_data(code, &key, &link, report).await?;
        }
        Ok(())
    }

    fn flatten(&self, league: &LeagueEntry, report: &mut RunReport) -> Result<()> {
        let code = league.fotmob;
        let out_league = self.clean_dir.join(league.slug());

        let Some(available) = self
            .cache
            .load(&format!("{code}/available_seasons.json"))
        else {
            report.skip(format!("fotmob league {code}: nothing collected"));
            return Ok(());
        };

        let seasons = self.seasons_map(&available);
        let seasons_table = seasons_table(league.id, &seasons);
        write_table(&seasons_table, &out_league.join("available_seasons.csv"), report)?;

        for key in seasons.keys() {
            let Some(season_doc) = self.cache.load(&format!("{code}/Season{key}.json")) else {
                report.skip(format!("fotmob season {key}: no season document"));
                continue;
            };
            let standings = standings_table(league.id, key, &season_doc);
            write_table(&standings, &out_league.join("standings").join(format!("{key}.csv")), report)?;
        }
        Ok(())
    }
}

/// Season key from a provider label: "2024/2025" -> "2425"; a single-year
/// label covers that year and the next, "2024" -> "2425".
pub fn season_key(label: &str) -> Option<String> {
    if let Some((start, end)) = label.split_once('/') {
        let head = start.get(start.len().checked_sub(2)?..)?;
        let tail = end.get(end.len().checked_sub(2)?..)?;
        Some(format!("{head}{tail}"))
    } else {
        let year: i64 = label.get(..4)?.parse().ok()?;
        Some(format!("{:02}{:02}", year % 100, (year + 1) % 100))
    }
}

/// Goals conceded out of the combined "scored-conceded" string: second token
/// of a `-`-split. A malformed or absent string is recoverable and counts 0.
pub fn conceded_from_scores(scores: &str) -> i64 {
    match scores.split('-').nth(1).map(str::trim).map(str::parse) {
        Some(Ok(value)) => value,
        _ => {
            if !scores.is_empty() {
                tracing::warn!(scores, "unparsable scored-conceded string, defaulting to 0");
            }
            0
        }
    }
}

fn seasons_table(league_id: u32, seasons: &BTreeMap<String, String>) -> Table {
    let rows = seasons
        .iter()
        .map(|(key, link)| {
            let mut row = Row::new();
            row.push("league", league_id as i64);
            row.push("season", key.as_str());
            row.push("link", link.as_str());
            row
        })
        .collect();
    Table::from_rows(rows)
}

/// One wide standings table: the all/home/away partitions and the xG table
/// joined on team name. A team missing from any partition is dropped.
pub fn standings_table(league_id: u32, season_key: &str, season_doc: &Value) -> Table {
    // The league document carries one table group per stage; this league
    // format has a single stage at position 0.
    const TABLE_MAIN_STAGE: usize = 0;
    let tables = at(elem_at(season_doc, &["table"], TABLE_MAIN_STAGE), &["data", "table"])
        .cloned()
        .unwrap_or(Value::Null);

    let all = partition_table(arr_at(&tables, &["all"]), "");
    let home = partition_table(arr_at(&tables, &["home"]), "home_");
    let away = partition_table(arr_at(&tables, &["away"]), "away_");
    let xg = xg_table(arr_at(&tables, &["xg"]));

    let mut combined = all
        .inner_join(&home, "team")
        .inner_join(&away, "team")
        .inner_join(&xg, "team");
    combined.sort_by_int("pos");
    combined.insert_front("season", season_key);
    combined.insert_front("league", league_id as i64);
    combined
}

fn partition_table(teams: &[Value], suffix: &str) -> Table {
    let rows = teams
        .iter()
        .map(|team| {
            let mut row = Row::new();
            row.push("team", str_at(team, &["name"]));
            row.push(format!("{suffix}pos"), int_at(team, &["idx"]));
            row.push(format!("{suffix}pts"), int_at(team, &["pts"]));
            row.push(format!("{suffix}played"), int_at(team, &["played"]));
            row.push(format!("{suffix}wins"), int_at(team, &["wins"]));
            row.push(format!("{suffix}draws"), int_at(team, &["draws"]));
            row.push(format!("{suffix}losses"), int_at(team, &["losses"]));
            row.push(format!("{suffix}goalsScored"), int_at(team, &["goalsScored"]));
            row.push(
                format!("{suffix}goalsConceded"),
                conceded_from_scores(&str_at(team, &["scoresStr"])),
            );
            row.push(format!("{suffix}goalDiff"), int_at(team, &["goalConDiff"]));
            row
        })
        .collect();
    Table::from_rows(rows)
}

fn xg_table(teams: &[Value]) -> Table {
    let rows = teams
        .iter()
        .map(|team| {
            let mut row = Row::new();
            row.push("team", str_at(team, &["name"]));
            row.push("xG", float_at(team, &["xg"]));
            row.push("xGA", float_at(team, &["xgConceded"]));
            row.push("xGDiff", float_at(team, &["xgDiff"]));
            row.push("xGADiff", float_at(team, &["xgConcededDiff"]));
            row.push("xPos", int_at(team, &["xPosition"]));
            row.push("xPosDiff", int_at(team, &["xPositionDiff"]));
            row.push("xPts", float_at(team, &["xPoints"]));
            row.push("xPtsDiff", float_at(team, &["xPointsDiff"]));
            row
        })
        .collect();
    Table::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;
    use serde_json::json;

    #[test]
    fn season_key_from_split_label() {
        assert_eq!(season_key("2024/2025").as_deref(), Some("2425"));
        assert_eq!(season_key("1999/2000").as_deref(), Some("9900"));
    }

    #[test]
    fn season_key_rejects_labels_it_cannot_slice() {
        assert_eq!(season_key("4/5").as_deref(), None);
        // A label tail that cannot be cut two bytes from the end must be
        // rejected, not panic.
        assert_eq!(season_key("2024/20€").as_deref(), None);
    }

    #[test]
    fn season_key_from_single_year_label() {
        assert_eq!(season_key("2024").as_deref(), Some("2425"));
        assert_eq!(season_key("2024 Apertura").as_deref(), Some("2425"));
        assert_eq!(season_key("x").as_deref(), None);
    }

    #[test]
    fn conceded_parses_second_token() {
        assert_eq!(conceded_from_scores("12-34"), 34);
        assert_eq!(conceded_from_scores("0-0"), 0);
    }

    #[test]
    fn conceded_defaults_on_malformed_input() {
        assert_eq!(conceded_from_scores(""), 0);
        assert_eq!(conceded_from_scores("12"), 0);
        assert_eq!(conceded_from_scores("a-b"), 0);
    }

    fn team(name: &str, idx: i64) -> Value {
        json!({"name": name, "idx": idx, "pts": 10, "played": 5, "wins": 3,
               "draws": 1, "losses": 1, "goalsScored": 9, "scoresStr": "9-4",
               "goalConDiff": 5})
    }

    fn xg_team(name: &str) -> Value {
        json!({"name": name, "xg": 8.2, "xgConceded": 4.1, "xgDiff": 4.1,
               "xgConcededDiff": 0.0, "xPosition": 1, "xPositionDiff": 0,
               "xPoints": 10.5, "xPointsDiff": 0.5})
    }

    #[test]
    fn standings_join_drops_team_missing_from_a_partition() {
        // "X" appears in all and home but not away: it must not survive.
        let doc = json!({"table": [{"data": {"table": {
            "all": [team("X", 1), team("Y", 2)],
            "home": [team("X", 1), team("Y", 2)],
            "away": [team("Y", 1)],
            "xg": [xg_team("X"), xg_team("Y")],
        }}}]});
        let t = standings_table(73, "2425", &doc);
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0].get("team"), Some(&Cell::Text("Y".into())));
    }

    #[test]
    fn standings_join_keeps_all_rows_when_partitions_agree() {
        let names = ["A", "B", "C"];
        let part: Vec<Value> = names.iter().enumerate().map(|(i, n)| team(n, i as i64 + 1)).collect();
        let xg: Vec<Value> = names.iter().map(|n| xg_team(n)).collect();
        let doc = json!({"table": [{"data": {"table": {
            "all": part.clone(), "home": part.clone(), "away": part, "xg": xg,
        }}}]});
        let t = standings_table(73, "2425", &doc);
        assert_eq!(t.len(), 3);
        assert_eq!(t.columns()[0], "league");
        assert_eq!(t.columns()[1], "season");
        // Sorted by overall position.
        assert_eq!(t.rows()[0].get("pos"), Some(&Cell::Int(1)));
        assert_eq!(t.rows()[2].get("pos"), Some(&Cell::Int(3)));
    }

    #[test]
    fn standings_columns_carry_partition_suffixes_and_conceded() {
        let doc = json!({"table": [{"data": {"table": {
            "all": [team("A", 1)], "home": [team("A", 1)],
            "away": [team("A", 1)], "xg": [xg_team("A")],
        }}}]});
        let t = standings_table(73, "2425", &doc);
        let row = &t.rows()[0];
        assert_eq!(row.get("goalsConceded"), Some(&Cell::Int(4)));
        assert_eq!(row.get("home_pts"), Some(&Cell::Int(10)));
        assert_eq!(row.get("away_played"), Some(&Cell::Int(5)));
        assert_eq!(row.get("xPts"), Some(&Cell::Float(10.5)));
    }

    #[test]
    fn missing_table_section_flattens_to_nothing() {
        let t = standings_table(73, "2425", &json!({}));
        assert!(t.is_empty());
    }
}
