//! Scoresway pipeline: per-season match list, standings and squads documents
//! plus one detail document per played match, flattened into season info
//! tables and per-match goal / team-stat / player-stat tables.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::api::scoresway::{match_url, ScoreswayClient};
use crate::cache::{fast_moving, immutable, JsonCache};
use crate::config::{LeagueEntry, ScoreswayUrls};
use crate::jsonv::{arr_at, at, elem_at, int_at, str_at};
use crate::report::RunReport;
use crate::table::{Cell, Row, Table};

use super::{write_table, Provider};

// The standings document exposes its partitions positionally inside the
// first stage's division list; the feed carries no partition-type label, so
// the indices below encode the observed layout.
const STAGE_MAIN: usize = 0;
const DIVISION_TOTAL: usize = 0;
const DIVISION_HOME: usize = 1;
const DIVISION_AWAY: usize = 2;
const DIVISION_HALF_TIME: usize = 6;
const DIVISION_ATTENDANCE: usize = 9;

// Lineups come home-first in the match detail document.
const LINEUP_HOME: usize = 0;
const LINEUP_AWAY: usize = 1;

pub struct Scoresway {
    client: ScoreswayClient,
    cache: JsonCache,
    clean_dir: PathBuf,
    urls: ScoreswayUrls,
    desired_seasons: HashSet<String>,
}

impl Scoresway {
    pub fn new(
        client: ScoreswayClient,
        cache: JsonCache,
        clean_dir: PathBuf,
        urls: ScoreswayUrls,
        desired_seasons: HashSet<String>,
    ) -> Self {
        Self {
            client,
            cache,
            clean_dir,
            urls,
            desired_seasons,
        }
    }

    /// Seasons this provider can serve for the run, in URL-table order.
    fn seasons(&self) -> Vec<String> {
        self.urls
            .seasons()
            .into_iter()
            .filter(|s| self.desired_seasons.contains(s))
            .collect()
    }

    async fn season_document(
        &self,
        league_id: u32,
        season: &str,
        kind: &str,
        root_key: &'static str,
        report: &mut RunReport,
    ) -> Result<Option<Value>> {
        let Some(url) = self.urls.url(league_id, kind, season).map(str::to_string) else {
            report.skip(format!("scoresway {kind} url for season {season}"));
            return Ok(None);
        };
        let rel = format!("{league_id}/{season}/{kind}.json");
        let outcome = self
            .cache
            .get_or_fetch(
                &rel,
                fast_moving(),
                |v| {
                    at(v, &[root_key])
                        .and_then(Value::as_array)
                        .is_some_and(|a| !a.is_empty())
                },
                || self.client.fetch_json(&url),
            )
            .await?;
        report.record(&rel, &outcome);
        Ok(outcome.into_value())
    }

    async fn match_document(
        &self,
        league_id: u32,
        season: &str,
        match_id: &str,
        report: &mut RunReport,
    ) -> Result<Option<Value>> {
        let rel = format!("{league_id}/{season}/matches_info/{match_id}.json");
        let url = match_url(match_id);
        let outcome = self
            .cache
            .get_or_fetch(
                &rel,
                immutable(),
                |v| at(v, &["matchInfo"]).is_some_and(Value::is_object),
                || self.client.fetch_json(&url),
            )
            .await?;
        report.record(&rel, &outcome);
        Ok(outcome.into_value())
    }
}

#[async_trait]
impl Provider for Scoresway {
    fn key(&self) -> &'static str {
        "sw"
    }

    async fn collect(&self, league: &LeagueEntry, report: &mut RunReport) -> Result<()> {
        for season in self.seasons() {
            let matches = self
                .season_document(league.id, &season, "match", "match", report)
                .await?;
            self.season_document(league.id, &season, "standings", "stage", report)
                .await?;
            self.season_document(league.id, &season, "squads", "squad", report)
                .await?;

            let Some(matches) = matches else { continue };
            for match_id in played_match_ids(&matches) {
                self.match_document(league.id, &season, &match_id, report)
                    .await?;
            }
        }
        Ok(())
    }

    fn flatten(&self, league: &LeagueEntry, report: &mut RunReport) -> Result<()> {
        let out_league = self.clean_dir.join(league.slug());

        for season in self.seasons() {
            let raw = |name: &str| format!("{}/{season}/{name}.json", league.id);
            let Some(matches_doc) = self.cache.load(&raw("match")) else {
                report.skip(format!("scoresway season {season}: no match document"));
                continue;
            };

            let out_info = out_league.join(&season).join("info");
            let prefix = |mut table: Table| {
                table.insert_front("season", season.as_str());
                table.insert_front("league", league.id as i64);
                table
            };

            let matches = prefix(matches_table(&matches_doc));
            write_table(&matches, &out_info.join("matches.csv"), report)?;

            if let Some(squads_doc) = self.cache.load(&raw("squads")) {
                let (teams, players, managers) = squads_tables(&squads_doc);
                write_table(&prefix(teams), &out_info.join("teams.csv"), report)?;
                write_table(&prefix(players), &out_info.join("players.csv"), report)?;
                write_table(&prefix(managers), &out_info.join("managers.csv"), report)?;
            } else {
                report.skip(format!("scoresway season {season}: no squads document"));
            }

            if let Some(standings_doc) = self.cache.load(&raw("standings")) {
                let standings = standings_tables(&standings_doc);
                write_table(&prefix(standings.total), &out_info.join("standings_total.csv"), report)?;
                write_table(&prefix(standings.home), &out_info.join("standings_home.csv"), report)?;
                write_table(&prefix(standings.away), &out_info.join("standings_away.csv"), report)?;
                write_table(
                    &prefix(standings.half_time),
                    &out_info.join("standings_halftime.csv"),
                    report,
                )?;
                write_table(
                    &prefix(standings.attendance),
                    &out_info.join("standings_attendance.csv"),
                    report,
                )?;
            } else {
                report.skip(format!("scoresway season {season}: no standings document"));
            }

            let out_matches = out_league.join(&season).join("matches");
            for match_id in played_match_ids(&matches_doc) {
                let rel = format!("{}/{season}/matches_info/{match_id}.json", league.id);
                let Some(match_doc) = self.cache.load(&rel) else {
                    report.skip(format!("scoresway match {match_id}: no detail document"));
                    continue;
                };
                let detail = match_detail_tables(&match_doc);
                let file = format!("{match_id}.csv");
                write_table(&prefix(detail.goals), &out_matches.join("goals").join(&file), report)?;
                write_table(
                    &prefix(detail.team_stats),
                    &out_matches.join("team_stats").join(&file),
                    report,
                )?;
                write_table(
                    &prefix(detail.player_stats),
                    &out_matches.join("player_stats").join(&file),
                    report,
                )?;
            }
        }
        Ok(())
    }
}

/// Ids of matches the feed reports as finished.
pub fn played_match_ids(matches_doc: &Value) -> Vec<String> {
    arr_at(matches_doc, &["match"])
        .iter()
        .filter(|m| str_at(m, &["liveData", "matchDetails", "matchStatus"]) == "Played")
        .map(|m| str_at(m, &["matchInfo", "id"]))
        .filter(|id| !id.is_empty())
        .collect()
}

/// Stable join key for one match: home and away team codes, lowercased and
/// hyphen-joined, home first.
pub fn match_slug(home_code: &str, away_code: &str) -> String {
    format!("{}-{}", home_code.to_lowercase(), away_code.to_lowercase())
}

fn contestant_slug(match_info: &Value) -> String {
    match_slug(
        &str_at(elem_at(match_info, &["contestant"], 0), &["code"]),
        &str_at(elem_at(match_info, &["contestant"], 1), &["code"]),
    )
}

/// Season match table: one row per scheduled match, played or not. Score
/// fields default to 0 for matches that have not been played.
pub fn matches_table(matches_doc: &Value) -> Table {
    let rows = arr_at(matches_doc, &["match"])
        .iter()
        .map(|m| {
            let info = at(m, &["matchInfo"]).cloned().unwrap_or(Value::Null);
            let live = at(m, &["liveData"]).cloned().unwrap_or(Value::Null);
            let official = elem_at(&live, &["matchDetailsExtra", "matchOfficial"], 0);
            let referee = format!(
                "{} {}",
                str_at(official, &["firstName"]),
                str_at(official, &["lastName"])
            )
            .trim()
            .to_string();

            let mut row = Row::new();
            row.push("id", str_at(&info, &["id"]));
            row.push("slug", contestant_slug(&info));
            row.push("date", str_at(&info, &["date"]));
            row.push("time", str_at(&info, &["time"]));
            row.push("home_team", str_at(elem_at(&info, &["contestant"], 0), &["officialName"]));
            row.push("away_team", str_at(elem_at(&info, &["contestant"], 1), &["officialName"]));
            row.push("venue", str_at(&info, &["venue", "longName"]));
            row.push("attendance", int_at(&live, &["matchDetailsExtra", "attendance"]));
            // A match without a reported length is a regulation 90 minutes.
            let match_min = at(&live, &["matchDetails", "matchLengthMin"])
                .and_then(Value::as_i64)
                .unwrap_or(90);
            row.push("match_min", match_min);
            row.push("home_score_ht", int_at(&live, &["matchDetails", "scores", "ht", "home"]));
            row.push("away_score_ht", int_at(&live, &["matchDetails", "scores", "ht", "away"]));
            row.push("home_score_ft", int_at(&live, &["matchDetails", "scores", "ft", "home"]));
            row.push("away_score_ft", int_at(&live, &["matchDetails", "scores", "ft", "away"]));
            row.push("referee", referee);
            row
        })
        .collect();
    Table::from_rows(rows)
}

/// Whether a roster entry carries a usable shirt number (players without one
/// are not part of the active squad).
fn has_shirt_number(person: &Value) -> bool {
    match person.get("shirtNumber") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    }
}

/// Split the mixed squad roster into team, active-player, and manager tables
/// using the entry `type` discriminator.
pub fn squads_tables(squads_doc: &Value) -> (Table, Table, Table) {
    let mut team_rows = Vec::new();
    let mut player_rows = Vec::new();
    let mut manager_rows = Vec::new();

    for squad in arr_at(squads_doc, &["squad"]) {
        let code = str_at(squad, &["contestantCode"]);
        let mut team = Row::new();
        team.push("id", str_at(squad, &["contestantId"]));
        team.push("code", code.clone());
        team.push("slug", code.to_lowercase());
        team.push("name", str_at(squad, &["contestantName"]));
        team.push("club_name", str_at(squad, &["contestantClubName"]));
        team.push("short_name", str_at(squad, &["contestantShortName"]));
        team.push("venue", str_at(squad, &["venueName"]));
        team_rows.push(team);

        let squad_name = str_at(squad, &["contestantName"]);
        for person in arr_at(squad, &["person"]) {
            let first = str_at(person, &["firstName"]);
            let last = str_at(person, &["lastName"]);
            let mut row = Row::new();
            row.push("id", str_at(person, &["id"]));
            row.push("name", format!("{first} {last}"));
            row.push(
                "short_name",
                format!(
                    "{} {}",
                    str_at(person, &["shortFirstName"]),
                    str_at(person, &["shortLastName"])
                ),
            );
            row.push("match_name", str_at(person, &["matchName"]));
            row.push("first_name", first);
            row.push("last_name", last);
            row.push("team", squad_name.clone());
            row.push("nationality", str_at(person, &["nationality"]));

            if str_at(person, &["type"]) == "player" {
                if !has_shirt_number(person) {
                    continue; // not in the active squad
                }
                row.push("position", str_at(person, &["position"]));
                row.push("shirt_number", int_at(person, &["shirtNumber"]));
                player_rows.push(row);
            } else {
                row.push("type", str_at(person, &["type"]));
                manager_rows.push(row);
            }
        }
    }

    (
        Table::from_rows(team_rows),
        Table::from_rows(player_rows),
        Table::from_rows(manager_rows),
    )
}

pub struct StandingsTables {
    pub total: Table,
    pub home: Table,
    pub away: Table,
    pub half_time: Table,
    pub attendance: Table,
}

enum PartitionKind {
    Total,
    Plain,
    Attendance,
}

/// The five standings partitions, read positionally from the first stage.
pub fn standings_tables(standings_doc: &Value) -> StandingsTables {
    let stage = elem_at(standings_doc, &["stage"], STAGE_MAIN);
    let division = |idx: usize| at(elem_at(stage, &["division"], idx), &["ranking"]);
    let table = |idx: usize, kind: PartitionKind| {
        let ranking = division(idx).and_then(Value::as_array);
        partition_table(ranking.map(Vec::as_slice).unwrap_or(&[]), kind)
    };

    StandingsTables {
        total: table(DIVISION_TOTAL, PartitionKind::Total),
        home: table(DIVISION_HOME, PartitionKind::Plain),
        away: table(DIVISION_AWAY, PartitionKind::Plain),
        half_time: table(DIVISION_HALF_TIME, PartitionKind::Plain),
        attendance: table(DIVISION_ATTENDANCE, PartitionKind::Attendance),
    }
}

fn partition_table(ranking: &[Value], kind: PartitionKind) -> Table {
    let rows = ranking
        .iter()
        .map(|team| {
            let mut row = Row::new();
            row.push("rank", int_at(team, &["rank"]));
            match kind {
                PartitionKind::Total | PartitionKind::Plain => {
                    if matches!(kind, PartitionKind::Total) {
                        row.push("status", str_at(team, &["rankStatus"]));
                    }
                    row.push("team", str_at(team, &["contestantName"]));
                    row.push("points", int_at(team, &["points"]));
                    row.push("matches_played", int_at(team, &["matchesPlayed"]));
                    row.push("wins", int_at(team, &["matchesWon"]));
                    row.push("draws", int_at(team, &["matchesDrawn"]));
                    row.push("losses", int_at(team, &["matchesLost"]));
                    row.push("goals_for", int_at(team, &["goalsFor"]));
                    row.push("goals_against", int_at(team, &["goalsAgainst"]));
                }
                PartitionKind::Attendance => {
                    row.push("team", str_at(team, &["contestantName"]));
                    row.push("venue_name", str_at(team, &["venueName"]));
                    row.push("min_attendance", int_at(team, &["minimumAttendance"]));
                    row.push("max_attendance", int_at(team, &["maximumAttendance"]));
                    row.push("total_attendance", int_at(team, &["totalAttendance"]));
                    row.push("avg_attendance", int_at(team, &["averageAttendance"]));
                    row.push("capacity", int_at(team, &["capacity"]));
                    row.push("percent_sold", int_at(team, &["percentSold"]));
                }
            }
            row
        })
        .collect();
    Table::from_rows(rows)
}

pub struct MatchDetailTables {
    pub goals: Table,
    pub team_stats: Table,
    pub player_stats: Table,
}

/// A feed `stat.value` can arrive as a number or a numeric string.
fn stat_cell(value: &Value) -> Cell {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Int(i)
            } else {
                Cell::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => {
            if let Ok(i) = s.parse::<i64>() {
                Cell::Int(i)
            } else if let Ok(f) = s.parse::<f64>() {
                Cell::Float(f)
            } else {
                Cell::Text(s.clone())
            }
        }
        _ => Cell::Int(0),
    }
}

/// Goal, team-stat and player-stat tables from one match detail document.
pub fn match_detail_tables(match_doc: &Value) -> MatchDetailTables {
    let info = at(match_doc, &["matchInfo"]).cloned().unwrap_or(Value::Null);
    let match_id = str_at(&info, &["id"]);
    let slug = contestant_slug(&info);
    let live = at(match_doc, &["liveData"]).cloned().unwrap_or(Value::Null);

    let goal_rows = arr_at(&live, &["goal"])
        .iter()
        .map(|goal| {
            let mut row = Row::new();
            row.push("match", match_id.clone());
            row.push("match_slug", slug.clone());
            row.push("type", str_at(goal, &["type"]));
            row.push("team_id", str_at(goal, &["contestantId"]));
            row.push("minute", str_at(goal, &["timeMinSec"]));
            row.push("scorer_id", str_at(goal, &["scorerId"]));
            row.push("scorer", str_at(goal, &["scorerName"]));
            row.push("assister_id", str_at(goal, &["assistPlayerId"]));
            row.push("assister", str_at(goal, &["assistPlayerName"]));
            row
        })
        .collect();

    let mut team_rows = Vec::new();
    let mut player_tables = Vec::new();
    for side in [LINEUP_HOME, LINEUP_AWAY] {
        let lineup = elem_at(&live, &["lineUp"], side);
        if lineup.is_null() {
            continue;
        }
        let team_id = str_at(lineup, &["contestantId"]);
        let official = elem_at(lineup, &["teamOfficial"], 0);

        let mut row = Row::new();
        row.push("match", match_id.clone());
        row.push("match_slug", slug.clone());
        row.push("team_id", team_id.clone());
        row.push("formation", str_at(lineup, &["formationUsed"]));
        row.push("manager_id", str_at(official, &["id"]));
        row.push(
            "manager",
            format!(
                "{} {}",
                str_at(official, &["firstName"]),
                str_at(official, &["lastName"])
            ),
        );
        row.push("kit", str_at(lineup, &["kit", "type"]));
        row.push("kit_col1", str_at(lineup, &["kit", "colour1"]));
        row.push("kit_col2", str_at(lineup, &["kit", "colour2"]));
        for stat in arr_at(lineup, &["stat"]) {
            let name = str_at(stat, &["type"]);
            if !name.is_empty() {
                row.push(name, stat_cell(&stat["value"]));
            }
        }
        team_rows.push(row);

        player_tables.push(lineup_table(lineup, &match_id, &slug, &team_id));
    }

    MatchDetailTables {
        goals: Table::from_rows(goal_rows),
        team_stats: Table::from_rows(team_rows),
        player_stats: Table::concat(player_tables),
    }
}

/// Per-player rows for one side's lineup; unused substitutes (no minutes
/// played) are dropped.
fn lineup_table(lineup: &Value, match_id: &str, slug: &str, team_id: &str) -> Table {
    let rows = arr_at(lineup, &["player"])
        .iter()
        .filter_map(|player| {
            let mut mins = 0i64;
            let mut stats = Vec::new();
            for stat in arr_at(player, &["stat"]) {
                let name = str_at(stat, &["type"]);
                if name.is_empty() {
                    continue;
                }
                let cell = stat_cell(&stat["value"]);
                if name == "minsPlayed" {
                    if let Cell::Int(v) = cell {
                        mins = v;
                    }
                }
                stats.push((name, cell));
            }
            if mins == 0 {
                return None;
            }

            let pos_side = {
                let side = str_at(player, &["positionSide"]);
                if side.is_empty() {
                    str_at(player, &["subPosition"])
                } else {
                    side
                }
            };

            let mut row = Row::new();
            row.push("match", match_id);
            row.push("match_slug", slug);
            row.push("team", team_id);
            row.push("player_id", str_at(player, &["playerId"]));
            row.push(
                "name",
                format!(
                    "{} {}",
                    str_at(player, &["firstName"]),
                    str_at(player, &["lastName"])
                ),
            );
            row.push(
                "short_name",
                format!(
                    "{} {}",
                    str_at(player, &["shortFirstName"]),
                    str_at(player, &["shortLastName"])
                ),
            );
            row.push("match_name", str_at(player, &["matchName"]));
            row.push("shirt_number", int_at(player, &["shirtNumber"]));
            row.push("position", str_at(player, &["position"]));
            row.push("pos_side", pos_side);
            row.push("formation_place", int_at(player, &["formationPlace"]));
            for (name, cell) in stats {
                row.push(name, cell);
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

    #[test]
    fn slug_is_lowercase_home_then_away() {
        assert_eq!(match_slug("FCB", "RMA"), "fcb-rma");
    }

    fn match_entry(id: &str, status: &str, home_ft: i64, away_ft: i64) -> Value {
        json!({
            "matchInfo": {
                "id": id,
                "date": "2025-03-01",
                "time": "20:00",
                "contestant": [
                    {"code": "FCB", "officialName": "FC Barcelona"},
                    {"code": "RMA", "officialName": "Real Madrid"}
                ],
                "venue": {"longName": "Camp Nou"}
            },
            "liveData": {
                "matchDetails": {
                    "matchStatus": status,
                    "matchLengthMin": 95,
                    "scores": {"ft": {"home": home_ft, "away": away_ft},
                               "ht": {"home": 1, "away": 0}}
                },
                "matchDetailsExtra": {
                    "attendance": 90000,
                    "matchOfficial": [{"firstName": "Ref", "lastName": "One"}]
                }
            }
        })
    }

    #[test]
    fn played_filter_uses_the_status_literal() {
        let doc = json!({"match": [
            match_entry("m1", "Played", 2, 1),
            match_entry("m2", "Fixture", 0, 0),
            match_entry("m3", "Played", 0, 3),
        ]});
        assert_eq!(played_match_ids(&doc), ["m1", "m3"]);
    }

    #[test]
    fn matches_table_lists_unplayed_with_default_scores() {
        let mut unplayed = match_entry("m2", "Fixture", 0, 0);
        unplayed["liveData"]["matchDetails"]
            .as_object_mut()
            .unwrap()
            .remove("scores");
        unplayed["liveData"]["matchDetails"]
            .as_object_mut()
            .unwrap()
            .remove("matchLengthMin");
        let doc = json!({"match": [match_entry("m1", "Played", 2, 1), unplayed]});

        let t = matches_table(&doc);
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[0].get("slug"), Some(&Cell::Text("fcb-rma".into())));
        assert_eq!(t.rows()[0].get("home_score_ft"), Some(&Cell::Int(2)));
        assert_eq!(t.rows()[1].get("home_score_ft"), Some(&Cell::Int(0)));
        assert_eq!(t.rows()[1].get("away_score_ft"), Some(&Cell::Int(0)));
        // Default regulation length when unreported.
        assert_eq!(t.rows()[1].get("match_min"), Some(&Cell::Int(90)));
        assert_eq!(t.rows()[0].get("referee"), Some(&Cell::Text("Ref One".into())));
        assert_eq!(t.rows()[1].get("referee"), Some(&Cell::Text("Ref One".into())));
    }

    fn squads_doc() -> Value {
        json!({"squad": [{
            "contestantId": "t1",
            "contestantCode": "FCB",
            "contestantName": "FC Barcelona",
            "contestantClubName": "Barcelona",
            "contestantShortName": "Barça",
            "venueName": "Camp Nou",
            "person": [
                {"id": "p1", "type": "player", "firstName": "Lamine", "lastName": "Yamal",
                 "shirtNumber": 19, "position": "Attacker", "nationality": "Spain"},
                {"id": "p2", "type": "player", "firstName": "No", "lastName": "Number",
                 "shirtNumber": "", "position": "Midfielder"},
                {"id": "c1", "type": "coach", "firstName": "Head", "lastName": "Coach"}
            ]
        }]})
    }

    #[test]
    fn roster_splits_on_type_and_filters_inactive_players() {
        let (teams, players, managers) = squads_tables(&squads_doc());
        assert_eq!(teams.len(), 1);
        assert_eq!(teams.rows()[0].get("slug"), Some(&Cell::Text("fcb".into())));

        // The shirtless player is dropped; the coach lands in managers.
        assert_eq!(players.len(), 1);
        assert_eq!(players.rows()[0].get("id"), Some(&Cell::Text("p1".into())));
        assert_eq!(players.rows()[0].get("shirt_number"), Some(&Cell::Int(19)));
        assert_eq!(managers.len(), 1);
        assert_eq!(managers.rows()[0].get("type"), Some(&Cell::Text("coach".into())));
    }

    #[test]
    fn standings_partitions_are_positional() {
        let ranking = |name: &str| json!([{
            "rank": 1, "contestantName": name, "points": 10, "matchesPlayed": 5,
            "matchesWon": 3, "matchesDrawn": 1, "matchesLost": 1,
            "goalsFor": 9, "goalsAgainst": 4, "rankStatus": "Promotion"
        }]);
        let divisions: Vec<Value> = (0..10)
            .map(|i| json!({"ranking": ranking(&format!("div{i}"))}))
            .collect();
        let doc = json!({"stage": [{"division": divisions}]});

        let standings = standings_tables(&doc);
        assert_eq!(standings.total.rows()[0].get("team"), Some(&Cell::Text("div0".into())));
        assert_eq!(standings.total.rows()[0].get("status"), Some(&Cell::Text("Promotion".into())));
        assert_eq!(standings.home.rows()[0].get("team"), Some(&Cell::Text("div1".into())));
        assert_eq!(standings.away.rows()[0].get("team"), Some(&Cell::Text("div2".into())));
        assert_eq!(standings.half_time.rows()[0].get("team"), Some(&Cell::Text("div6".into())));
        // The attendance partition has its own column set.
        assert!(standings.attendance.rows()[0].get("status").is_none());
    }

    #[test]
    fn short_division_list_yields_empty_partitions() {
        let doc = json!({"stage": [{"division": []}]});
        let standings = standings_tables(&doc);
        assert!(standings.total.is_empty());
        assert!(standings.attendance.is_empty());
    }

    fn detail_doc() -> Value {
        let player = |id: &str, mins: i64| {
            json!({"playerId": id, "firstName": "P", "lastName": id,
                   "shirtNumber": 9, "position": "Striker", "positionSide": "Centre",
                   "formationPlace": 9,
                   "stat": [{"type": "minsPlayed", "value": mins},
                            {"type": "goals", "value": "1"}]})
        };
        json!({
            "matchInfo": {"id": "m1", "contestant": [{"code": "FCB"}, {"code": "RMA"}]},
            "liveData": {
                "goal": [{"type": "G", "contestantId": "t1", "timeMinSec": "12:30",
                          "scorerId": "p1", "scorerName": "P p1"}],
                "lineUp": [
                    {"contestantId": "t1", "formationUsed": "433",
                     "teamOfficial": [{"id": "c1", "firstName": "Home", "lastName": "Coach"}],
                     "kit": {"type": "home", "colour1": "#a50044", "colour2": "#004d98"},
                     "stat": [{"type": "possessionPercentage", "value": "63.4"}],
                     "player": [player("p1", 90), player("p2", 0)]},
                    {"contestantId": "t2", "formationUsed": "442",
                     "teamOfficial": [{"id": "c2", "firstName": "Away", "lastName": "Coach"}],
                     "kit": {"type": "away", "colour1": "#fff", "colour2": "#000"},
                     "stat": [{"type": "possessionPercentage", "value": "36.6"}],
                     "player": [player("p3", 85)]}
                ]
            }
        })
    }

    #[test]
    fn match_detail_builds_three_tables() {
        let detail = match_detail_tables(&detail_doc());

        assert_eq!(detail.goals.len(), 1);
        assert_eq!(detail.goals.rows()[0].get("match_slug"), Some(&Cell::Text("fcb-rma".into())));

        assert_eq!(detail.team_stats.len(), 2);
        assert_eq!(
            detail.team_stats.rows()[0].get("possessionPercentage"),
            Some(&Cell::Float(63.4))
        );
        assert_eq!(detail.team_stats.rows()[1].get("manager"), Some(&Cell::Text("Away Coach".into())));

        // p2 never played and is dropped; the two sides are stacked.
        assert_eq!(detail.player_stats.len(), 2);
        assert_eq!(detail.player_stats.rows()[0].get("player_id"), Some(&Cell::Text("p1".into())));
        assert_eq!(detail.player_stats.rows()[1].get("team"), Some(&Cell::Text("t2".into())));
        assert_eq!(detail.player_stats.rows()[0].get("goals"), Some(&Cell::Int(1)));
    }
}
