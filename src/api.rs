use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::aggregate::{
    H2hMatch, HeadToHeadRecord, PlayerComparison, PlayerProfile, TeamComparison, TeamStatistics,
    compare_players, compare_teams, team_head_to_head,
};
use crate::error::FetchError;
use crate::http_client::fetch_text;
use crate::standings::StandingRow;
use crate::state::{
    EventKind, League, MatchState, MatchStatistics, MatchStatus, Prediction, TeamRef,
    TimelineEvent,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub fn fetch_matches(&self) -> Result<Vec<MatchState>, FetchError> {
        let body = fetch_text(&self.url("live-matches"), "match listing")?;
        let listing = parse_matches_json(&body).map_err(malformed)?;
        if listing.skipped > 0 {
            warn!(skipped = listing.skipped, "skipped malformed match rows");
        }
        Ok(listing.matches)
    }

    pub fn fetch_leagues(&self) -> Result<Vec<League>, FetchError> {
        let body = fetch_text(&self.url("leagues"), "league listing")?;
        parse_leagues_json(&body).map_err(malformed)
    }

    pub fn fetch_match_events(&self, match_id: u32) -> Result<Vec<TimelineEvent>, FetchError> {
        let body = fetch_text(
            &self.url(&format!("match/{match_id}/events")),
            &format!("match {match_id}"),
        )?;
        parse_events_json(&body).map_err(malformed)
    }

    pub fn fetch_match_statistics(&self, match_id: u32) -> Result<MatchStatistics, FetchError> {
        let body = fetch_text(
            &self.url(&format!("match/{match_id}/statistics")),
            &format!("statistics for match {match_id}"),
        )?;
        parse_match_statistics_json(&body).map_err(malformed)
    }

    pub fn fetch_team_h2h(&self, team1: u32, team2: u32) -> Result<HeadToHeadRecord, FetchError> {
        let body = fetch_text(
            &self.url(&format!("teams/{team1}/vs/{team2}")),
            &format!("team pair {team1}/{team2}"),
        )?;
        parse_team_h2h_json(&body).map_err(malformed)
    }

    pub fn fetch_player_h2h(
        &self,
        player1: u32,
        player2: u32,
    ) -> Result<PlayerComparison, FetchError> {
        let body = fetch_text(
            &self.url(&format!("players/{player1}/vs/{player2}")),
            &format!("player pair {player1}/{player2}"),
        )?;
        parse_player_h2h_json(&body).map_err(malformed)
    }

    pub fn fetch_team_statistics(&self, team_id: u32) -> Result<TeamStatistics, FetchError> {
        let body = fetch_text(
            &self.url(&format!("teams/{team_id}/statistics")),
            &format!("team {team_id}"),
        )?;
        parse_team_statistics_json(&body).map_err(malformed)
    }

    pub fn fetch_team_compare(&self, team1: u32, team2: u32) -> Result<TeamComparison, FetchError> {
        let left = self.fetch_team_statistics(team1)?;
        let right = self.fetch_team_statistics(team2)?;
        Ok(compare_teams(left, right))
    }

    pub fn fetch_standings(&self, league_id: u32) -> Result<Vec<StandingRow>, FetchError> {
        let body = fetch_text(
            &self.url(&format!("league/{league_id}/standings")),
            &format!("league {league_id}"),
        )?;
        parse_standings_json(&body).map_err(malformed)
    }
}

fn malformed(err: anyhow::Error) -> FetchError {
    FetchError::Malformed(format!("{err:#}"))
}

#[derive(Debug, Clone, Default)]
pub struct MatchListing {
    pub matches: Vec<MatchState>,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct RawMatchRow {
    id: u32,
    status: String,
    start_time: String,
    #[serde(default)]
    home_score: Option<u32>,
    #[serde(default)]
    away_score: Option<u32>,
    home_team_id: u32,
    away_team_id: u32,
    #[serde(default)]
    home_team_name: Option<String>,
    #[serde(default)]
    away_team_name: Option<String>,
    #[serde(default)]
    home_team_logo: Option<String>,
    #[serde(default)]
    away_team_logo: Option<String>,
    #[serde(default)]
    league_id: Option<u32>,
    #[serde(default)]
    minute: Option<u16>,
    #[serde(default)]
    prediction: Option<Value>,
}

/// Decode the live-matches listing. Rows that do not decode are skipped and
/// counted; a body that is not a list is an error.
pub fn parse_matches_json(raw: &str) -> Result<MatchListing> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(MatchListing::default());
    }
    let rows: Vec<Value> = serde_json::from_str(trimmed).context("invalid match listing json")?;
    let mut listing = MatchListing {
        matches: Vec::with_capacity(rows.len()),
        skipped: 0,
    };
    for row in rows {
        match match_from_row(row) {
            Ok(m) => listing.matches.push(m),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "match row rejected");
                listing.skipped += 1;
            }
        }
    }
    Ok(listing)
}

fn match_from_row(row: Value) -> Result<MatchState> {
    let raw: RawMatchRow = serde_json::from_value(row).context("match row shape")?;
    let status = MatchStatus::from_code(&raw.status)
        .ok_or_else(|| anyhow!("unknown status {:?} for match {}", raw.status, raw.id))?;
    let start_time = parse_instant(&raw.start_time)
        .ok_or_else(|| anyhow!("bad start_time {:?} for match {}", raw.start_time, raw.id))?;
    let home_name = raw
        .home_team_name
        .unwrap_or_else(|| format!("Team {}", raw.home_team_id));
    let away_name = raw
        .away_team_name
        .unwrap_or_else(|| format!("Team {}", raw.away_team_id));

    let mut state = MatchState {
        id: raw.id,
        status,
        home: TeamRef {
            id: raw.home_team_id,
            name: home_name,
            logo_url: raw.home_team_logo,
        },
        away: TeamRef {
            id: raw.away_team_id,
            name: away_name,
            logo_url: raw.away_team_logo,
        },
        home_score: raw.home_score,
        away_score: raw.away_score,
        minute: raw.minute,
        start_time,
        league_id: raw.league_id,
        prediction: raw.prediction.and_then(prediction_from_value),
        timeline: None,
        statistics: None,
    };
    state.normalize_scores();
    Ok(state)
}

/// An incomplete prediction is dropped rather than failing the row.
fn prediction_from_value(value: Value) -> Option<Prediction> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(prediction) => Some(prediction),
        Err(err) => {
            debug!(%err, "ignoring unreadable prediction");
            None
        }
    }
}

/// RFC 3339, or a naive timestamp taken as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn parse_leagues_json(raw: &str) -> Result<Vec<League>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let mut leagues: Vec<League> = serde_json::from_str(trimmed).context("invalid leagues json")?;
    leagues.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(leagues)
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    minute: u16,
    event_type: String,
    #[serde(default)]
    team_id: Option<u32>,
    #[serde(default)]
    player_name: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

pub fn parse_events_json(raw: &str) -> Result<Vec<TimelineEvent>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let rows: Vec<RawEvent> = serde_json::from_str(trimmed).context("invalid events json")?;
    let mut events: Vec<TimelineEvent> = rows
        .into_iter()
        .map(|e| TimelineEvent {
            minute: e.minute,
            kind: EventKind::from_text(&e.event_type),
            team_id: e.team_id,
            player: e.player_name,
            detail: e.detail,
        })
        .collect();
    events.sort_by_key(|e| e.minute);
    Ok(events)
}

pub fn parse_match_statistics_json(raw: &str) -> Result<MatchStatistics> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(MatchStatistics::default());
    }
    serde_json::from_str(trimmed).context("invalid match statistics json")
}

#[derive(Debug, Deserialize)]
struct RawH2hSide {
    id: u32,
    name: String,
    #[serde(default)]
    logo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTeamH2h {
    team1: RawH2hSide,
    team2: RawH2hSide,
    #[serde(default)]
    match_history: Vec<Value>,
}

pub fn parse_team_h2h_json(raw: &str) -> Result<HeadToHeadRecord> {
    let payload: RawTeamH2h =
        serde_json::from_str(raw.trim()).context("invalid head-to-head json")?;
    let history: Vec<H2hMatch> = payload
        .match_history
        .into_iter()
        .filter_map(|row| h2h_match_from_row(row).ok())
        .collect();
    let team1 = TeamRef {
        id: payload.team1.id,
        name: payload.team1.name,
        logo_url: payload.team1.logo_url,
    };
    let team2 = TeamRef {
        id: payload.team2.id,
        name: payload.team2.name,
        logo_url: payload.team2.logo_url,
    };
    Ok(team_head_to_head(team1, team2, &history))
}

/// History dates come as naive timestamps; everything else maps directly.
fn h2h_match_from_row(mut row: Value) -> Result<H2hMatch> {
    let date = row
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_instant);
    if let Some(obj) = row.as_object_mut() {
        obj.remove("date");
    }
    let mut m: H2hMatch = serde_json::from_value(row).context("head-to-head row shape")?;
    m.date = date;
    Ok(m)
}

#[derive(Debug, Deserialize)]
struct RawPlayerH2h {
    player1: PlayerProfile,
    player2: PlayerProfile,
}

pub fn parse_player_h2h_json(raw: &str) -> Result<PlayerComparison> {
    let payload: RawPlayerH2h =
        serde_json::from_str(raw.trim()).context("invalid player comparison json")?;
    Ok(compare_players(payload.player1, payload.player2))
}

pub fn parse_team_statistics_json(raw: &str) -> Result<TeamStatistics> {
    serde_json::from_str(raw.trim()).context("invalid team statistics json")
}

pub fn parse_standings_json(raw: &str) -> Result<Vec<StandingRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let mut rows: Vec<StandingRow> =
        serde_json::from_str(trimmed).context("invalid standings json")?;
    rows.sort_by_key(|r| r.rank);
    Ok(rows)
}
