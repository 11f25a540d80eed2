use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{HeadToHeadRecord, PairKey, PlayerComparison, TeamComparison};
use crate::classify::{self, DateGroup, ViewContext};
use crate::error::FetchError;
use crate::reconcile::{MatchStore, MergeOutcome, PendingConfig};
use crate::standings::StandingRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    NotStarted,
    Live,
    HalfTime,
    ExtraTime,
    Penalties,
    Postponed,
    Cancelled,
    ToBeDetermined,
    FullTime,
    AfterExtraTime,
    AfterPenalties,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 11] = [
        MatchStatus::NotStarted,
        MatchStatus::Live,
        MatchStatus::HalfTime,
        MatchStatus::ExtraTime,
        MatchStatus::Penalties,
        MatchStatus::Postponed,
        MatchStatus::Cancelled,
        MatchStatus::ToBeDetermined,
        MatchStatus::FullTime,
        MatchStatus::AfterExtraTime,
        MatchStatus::AfterPenalties,
    ];

    pub fn from_code(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        let status = match code.as_str() {
            "NS" => MatchStatus::NotStarted,
            "LIVE" | "1H" | "2H" => MatchStatus::Live,
            "HT" => MatchStatus::HalfTime,
            "ET" => MatchStatus::ExtraTime,
            "P" => MatchStatus::Penalties,
            "PST" => MatchStatus::Postponed,
            "CANC" => MatchStatus::Cancelled,
            "TBD" => MatchStatus::ToBeDetermined,
            "FT" => MatchStatus::FullTime,
            "AET" => MatchStatus::AfterExtraTime,
            "PEN" => MatchStatus::AfterPenalties,
            _ => return None,
        };
        Some(status)
    }

    pub fn code(self) -> &'static str {
        match self {
            MatchStatus::NotStarted => "NS",
            MatchStatus::Live => "LIVE",
            MatchStatus::HalfTime => "HT",
            MatchStatus::ExtraTime => "ET",
            MatchStatus::Penalties => "P",
            MatchStatus::Postponed => "PST",
            MatchStatus::Cancelled => "CANC",
            MatchStatus::ToBeDetermined => "TBD",
            MatchStatus::FullTime => "FT",
            MatchStatus::AfterExtraTime => "AET",
            MatchStatus::AfterPenalties => "PEN",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchStatus::NotStarted => "Scheduled",
            MatchStatus::Live => "LIVE NOW",
            MatchStatus::HalfTime => "Half Time",
            MatchStatus::ExtraTime => "Extra Time",
            MatchStatus::Penalties => "Penalties",
            MatchStatus::Postponed => "Postponed",
            MatchStatus::Cancelled => "Cancelled",
            MatchStatus::ToBeDetermined => "To Be Determined",
            MatchStatus::FullTime => "Full Time",
            MatchStatus::AfterExtraTime => "After Extra Time",
            MatchStatus::AfterPenalties => "After Penalties",
        }
    }

    /// Every status maps to exactly one bucket. Cancelled fixtures are
    /// terminal and sit with the finished ones.
    pub fn bucket(self) -> Bucket {
        match self {
            MatchStatus::Live
            | MatchStatus::HalfTime
            | MatchStatus::ExtraTime
            | MatchStatus::Penalties => Bucket::Live,
            MatchStatus::NotStarted | MatchStatus::ToBeDetermined | MatchStatus::Postponed => {
                Bucket::Upcoming
            }
            MatchStatus::FullTime
            | MatchStatus::AfterExtraTime
            | MatchStatus::AfterPenalties
            | MatchStatus::Cancelled => Bucket::Finished,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Live,
    Upcoming,
    Finished,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Live, Bucket::Upcoming, Bucket::Finished];

    pub fn contains(self, status: MatchStatus) -> bool {
        status.bucket() == self
    }

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Live => "Live",
            Bucket::Upcoming => "Upcoming",
            Bucket::Finished => "Finished",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Bucket::Live => Bucket::Upcoming,
            Bucket::Upcoming => Bucket::Finished,
            Bucket::Finished => Bucket::Live,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Externally computed outcome probabilities, carried as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "home_win_prob")]
    pub home: f64,
    #[serde(rename = "draw_prob")]
    pub draw: f64,
    #[serde(rename = "away_win_prob")]
    pub away: f64,
    #[serde(default, rename = "confidence_score")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Goal,
    Card,
    Sub,
    Other,
}

impl EventKind {
    pub fn from_text(raw: &str) -> Self {
        let s = raw.trim().to_ascii_lowercase();
        if s.contains("goal") {
            EventKind::Goal
        } else if s.contains("card") {
            EventKind::Card
        } else if s.starts_with("sub") {
            EventKind::Sub
        } else {
            EventKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub minute: u16,
    pub kind: EventKind,
    pub team_id: Option<u32>,
    pub player: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStatistics {
    #[serde(default)]
    pub possession_home: Option<u32>,
    #[serde(default)]
    pub possession_away: Option<u32>,
    #[serde(default)]
    pub shots_on_home: Option<u32>,
    #[serde(default)]
    pub shots_on_away: Option<u32>,
    #[serde(default)]
    pub shots_off_home: Option<u32>,
    #[serde(default)]
    pub shots_off_away: Option<u32>,
    #[serde(default)]
    pub corners_home: Option<u32>,
    #[serde(default)]
    pub corners_away: Option<u32>,
    #[serde(default)]
    pub fouls_home: Option<u32>,
    #[serde(default)]
    pub fouls_away: Option<u32>,
}

impl MatchStatistics {
    /// Rows where both sides reported a value.
    pub fn lines(&self) -> Vec<(&'static str, u32, u32)> {
        [
            ("Possession %", self.possession_home, self.possession_away),
            ("Shots on target", self.shots_on_home, self.shots_on_away),
            ("Shots off target", self.shots_off_home, self.shots_off_away),
            ("Corners", self.corners_home, self.corners_away),
            ("Fouls", self.fouls_home, self.fouls_away),
        ]
        .into_iter()
        .filter_map(|(name, home, away)| Some((name, home?, away?)))
        .collect()
    }
}

/// Canonical record for one fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchState {
    pub id: u32,
    pub status: MatchStatus,
    pub home: TeamRef,
    pub away: TeamRef,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub minute: Option<u16>,
    pub start_time: DateTime<Utc>,
    pub league_id: Option<u32>,
    pub prediction: Option<Prediction>,
    pub timeline: Option<Vec<TimelineEvent>>,
    pub statistics: Option<MatchStatistics>,
}

impl MatchState {
    pub fn bucket(&self) -> Bucket {
        self.status.bucket()
    }

    pub fn is_live(&self) -> bool {
        self.bucket() == Bucket::Live
    }

    /// Scores are both present or both absent; a lone side gets a 0 opposite.
    pub fn normalize_scores(&mut self) {
        match (self.home_score, self.away_score) {
            (Some(_), None) => self.away_score = Some(0),
            (None, Some(_)) => self.home_score = Some(0),
            _ => {}
        }
    }

    pub fn score_text(&self) -> String {
        match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => format!("{h}-{a}"),
            _ => "-".to_string(),
        }
    }

    pub fn local_kickoff(&self) -> DateTime<Local> {
        self.start_time.with_timezone(&Local)
    }
}

/// Partial update carried by a push message. `None` means "not reported".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPatch {
    pub match_id: u32,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub minute: Option<u16>,
    pub status: Option<MatchStatus>,
}

impl MatchPatch {
    pub fn is_empty(&self) -> bool {
        self.home_score.is_none()
            && self.away_score.is_none()
            && self.minute.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Result slot for an on-demand fetch. `Unavailable` is terminal (the entity
/// does not exist upstream); `Failed` may be retried.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Loading,
    Ready(T),
    Unavailable,
    Failed(String),
}

impl<T> Lookup<T> {
    pub fn from_result(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => Lookup::Ready(value),
            Err(FetchError::NotFound(_)) => Lookup::Unavailable,
            Err(err) => Lookup::Failed(err.to_string()),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Lookup::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Lookup::Failed(_))
    }
}

/// Fetch state of a match's on-demand detail. Events and statistics come from
/// separate endpoints and resolve independently; the loaded payloads live on
/// the match record itself.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailLookup {
    pub timeline: Lookup<()>,
    pub statistics: Lookup<()>,
}

impl DetailLookup {
    pub fn loading() -> Self {
        Self {
            timeline: Lookup::Loading,
            statistics: Lookup::Loading,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.timeline == Lookup::Loading || self.statistics == Lookup::Loading
    }

    /// Neither half exists upstream.
    pub fn is_unavailable(&self) -> bool {
        self.timeline == Lookup::Unavailable && self.statistics == Lookup::Unavailable
    }

    pub fn is_retryable(&self) -> bool {
        self.timeline.is_retryable() || self.statistics.is_retryable()
    }
}

fn detail_slot<T>(result: &Result<T, FetchError>) -> Lookup<()> {
    match result {
        Ok(_) => Lookup::Ready(()),
        Err(FetchError::NotFound(_)) => Lookup::Unavailable,
        Err(err) => Lookup::Failed(err.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Matches,
    Leagues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Disabled,
    Connecting,
    Connected,
    Waiting { attempt: u32, delay: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    Snapshot(Vec<MatchState>),
    Leagues(Vec<League>),
    Push(MatchPatch),
    MatchDetail {
        id: u32,
        timeline: Result<Vec<TimelineEvent>, FetchError>,
        statistics: Result<MatchStatistics, FetchError>,
    },
    FetchFailed {
        source: FeedSource,
        error: FetchError,
    },
    Channel(ChannelStatus),
    TeamH2h {
        key: PairKey,
        result: Result<HeadToHeadRecord, FetchError>,
    },
    PlayerH2h {
        key: PairKey,
        result: Result<PlayerComparison, FetchError>,
    },
    TeamCompare {
        key: PairKey,
        result: Result<TeamComparison, FetchError>,
    },
    Standings {
        league_id: u32,
        result: Result<Vec<StandingRow>, FetchError>,
    },
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    Refresh,
    RefreshLeagues,
    FetchMatchDetail { match_id: u32 },
    FetchTeamH2h { team1: u32, team2: u32 },
    FetchPlayerH2h { player1: u32, player2: u32 },
    FetchTeamCompare { team1: u32, team2: u32 },
    FetchStandings { league_id: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Board,
    HeadToHead,
    PlayerCompare,
    Standings,
}

/// Reads a player id pair typed as `9 11`, `9,11` or `9 vs 11`.
pub fn parse_player_pair(input: &str) -> Option<(u32, u32)> {
    let ids: Vec<&str> = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty() && !part.eq_ignore_ascii_case("vs"))
        .collect();
    let [first, second] = ids.as_slice() else {
        return None;
    };
    let first = first.parse().ok()?;
    let second = second.parse().ok()?;
    (first != second).then_some((first, second))
}

/// Everything the presentation layer reads. The match store inside is only
/// mutated through [`apply_delta`].
#[derive(Debug)]
pub struct AppState {
    store: MatchStore,
    pub screen: Screen,
    pub view: ViewContext,
    pub selected: usize,
    pub leagues: Vec<League>,
    pub channel: ChannelStatus,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub team_h2h: HashMap<PairKey, Lookup<HeadToHeadRecord>>,
    pub player_h2h: HashMap<PairKey, Lookup<PlayerComparison>>,
    pub team_compare: HashMap<PairKey, Lookup<TeamComparison>>,
    pub standings: HashMap<u32, Lookup<Vec<StandingRow>>>,
    pub details: HashMap<u32, DetailLookup>,
    pub focus_pair: Option<PairKey>,
    pub focus_players: Option<PairKey>,
    /// Text being typed into the player pair prompt, when it is open.
    pub player_prompt: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    bucket_pinned: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(PendingConfig::default())
    }
}

impl AppState {
    pub fn new(pending: PendingConfig) -> Self {
        Self {
            store: MatchStore::new(pending),
            screen: Screen::Board,
            view: ViewContext::default(),
            selected: 0,
            leagues: Vec::new(),
            channel: ChannelStatus::Disabled,
            last_refresh: None,
            last_error: None,
            team_h2h: HashMap::with_capacity(8),
            player_h2h: HashMap::with_capacity(8),
            team_compare: HashMap::with_capacity(8),
            standings: HashMap::with_capacity(8),
            details: HashMap::with_capacity(8),
            focus_pair: None,
            focus_players: None,
            player_prompt: None,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
            bucket_pinned: false,
        }
    }

    pub fn store(&self) -> &MatchStore {
        &self.store
    }

    /// Clone of the canonical list, in snapshot order.
    pub fn matches(&self) -> Vec<MatchState> {
        self.store.matches()
    }

    pub fn visible_matches(&self) -> Vec<&MatchState> {
        classify::filter_matches(self.store.iter(), &self.view)
    }

    pub fn visible_groups(&self) -> Vec<DateGroup> {
        let visible: Vec<MatchState> = self.visible_matches().into_iter().cloned().collect();
        classify::group_by_date(visible, self.view.bucket, &Local)
    }

    /// Rows in display order, flattened across date groups.
    pub fn visible_rows(&self) -> Vec<MatchState> {
        self.visible_groups()
            .into_iter()
            .flat_map(|group| group.matches)
            .collect()
    }

    pub fn selected_match(&self) -> Option<MatchState> {
        self.visible_rows().into_iter().nth(self.selected)
    }

    pub fn select_next(&mut self) {
        let total = self.visible_rows().len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % total;
    }

    pub fn select_prev(&mut self) {
        let total = self.visible_rows().len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        if self.selected == 0 {
            self.selected = total - 1;
        } else {
            self.selected -= 1;
        }
    }

    pub fn clamp_selection(&mut self) {
        let total = self.visible_rows().len();
        if total == 0 {
            self.selected = 0;
        } else if self.selected >= total {
            self.selected = total - 1;
        }
    }

    pub fn set_bucket(&mut self, bucket: Bucket) {
        self.view.bucket = bucket;
        self.bucket_pinned = true;
        self.selected = 0;
    }

    pub fn cycle_bucket(&mut self) {
        self.set_bucket(self.view.bucket.next());
    }

    /// Steps through "all leagues" followed by each known league.
    pub fn cycle_league(&mut self) {
        let next = match self.view.league {
            None => self.leagues.first().map(|l| l.id),
            Some(current) => {
                let pos = self.leagues.iter().position(|l| l.id == current);
                pos.and_then(|idx| self.leagues.get(idx + 1)).map(|l| l.id)
            }
        };
        self.view.league = next;
        self.selected = 0;
        let label = self.league_label();
        self.push_log(format!("[INFO] League: {label}"));
    }

    pub fn league_label(&self) -> String {
        match self.view.league {
            None => "All leagues".to_string(),
            Some(id) => self
                .leagues
                .iter()
                .find(|l| l.id == id)
                .map(|l| l.name.clone())
                .unwrap_or_else(|| format!("League {id}")),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    apply_delta_at(state, delta, Instant::now());
}

/// Same as [`apply_delta`] with an explicit clock for the pending buffer.
pub fn apply_delta_at(state: &mut AppState, delta: Delta, now: Instant) {
    match delta {
        Delta::Snapshot(matches) => {
            let count = matches.len();
            let outcome = state.store.apply_snapshot(matches, now);
            state.last_refresh = Some(Utc::now());
            state.last_error = None;
            if !state.bucket_pinned {
                state.view.bucket = classify::default_bucket(state.store.iter());
            }
            state.clamp_selection();
            debug!(count, changed = outcome.changed, flushed = outcome.flushed, "snapshot applied");
            if outcome.flushed > 0 {
                state.push_log(format!(
                    "[INFO] Applied {} buffered update(s) after refresh",
                    outcome.flushed
                ));
            }
        }
        Delta::Leagues(leagues) => {
            if let Some(id) = state.view.league
                && !leagues.iter().any(|l| l.id == id)
            {
                state.view.league = None;
            }
            state.leagues = leagues;
        }
        Delta::Push(patch) => {
            let id = patch.match_id;
            match state.store.apply_patch(patch, now) {
                MergeOutcome::Applied => {
                    if let Some(m) = state.store.get(id) {
                        debug!(match_id = id, score = %m.score_text(), "push applied");
                    }
                }
                MergeOutcome::Unchanged => {}
                MergeOutcome::Buffered => {
                    debug!(match_id = id, "push buffered for untracked match");
                }
            }
            state.clamp_selection();
        }
        Delta::MatchDetail {
            id,
            timeline,
            statistics,
        } => {
            let lookup = DetailLookup {
                timeline: detail_slot(&timeline),
                statistics: detail_slot(&statistics),
            };
            for (what, slot) in [("events", &lookup.timeline), ("statistics", &lookup.statistics)] {
                if let Lookup::Failed(err) = slot {
                    state.push_log(format!("[WARN] Match {id} {what} error: {err}"));
                }
            }
            if lookup.is_unavailable() {
                state.push_log(format!("[INFO] No details available for match {id}"));
            }
            if !state.store.apply_detail(id, timeline.ok(), statistics.ok()) {
                debug!(match_id = id, "detail for untracked match ignored");
            }
            state.details.insert(id, lookup);
        }
        Delta::FetchFailed { source, error } => {
            let what = match source {
                FeedSource::Matches => "Match refresh",
                FeedSource::Leagues => "League refresh",
            };
            warn!(?source, %error, "refresh failed, keeping previous data");
            state.last_error = Some(error.to_string());
            state.push_log(format!("[WARN] {what} failed: {error}"));
        }
        Delta::Channel(status) => {
            match &status {
                ChannelStatus::Connected => state.push_log("[INFO] Live channel connected"),
                ChannelStatus::Waiting { attempt, delay } => state.push_log(format!(
                    "[WARN] Live channel down, retry #{attempt} in {:.1}s",
                    delay.as_secs_f32()
                )),
                ChannelStatus::Connecting | ChannelStatus::Disabled => {}
            }
            state.channel = status;
        }
        Delta::TeamH2h { key, result } => {
            log_lookup(state, "Head-to-head", key, &result);
            state.team_h2h.insert(key, Lookup::from_result(result));
        }
        Delta::PlayerH2h { key, result } => {
            log_lookup(state, "Player comparison", key, &result);
            state.player_h2h.insert(key, Lookup::from_result(result));
        }
        Delta::TeamCompare { key, result } => {
            log_lookup(state, "Team comparison", key, &result);
            state.team_compare.insert(key, Lookup::from_result(result));
        }
        Delta::Standings { league_id, result } => {
            if let Err(err) = &result {
                state.push_log(format!("[WARN] Standings {league_id}: {err}"));
            }
            state
                .standings
                .insert(league_id, Lookup::from_result(result));
        }
        Delta::Log(msg) => {
            info!(target: "matchboard::console", "{msg}");
            state.push_log(msg);
        }
    }
}

fn log_lookup<T>(state: &mut AppState, what: &str, key: PairKey, result: &Result<T, FetchError>) {
    match result {
        Ok(_) => {}
        Err(FetchError::NotFound(entity)) => {
            state.push_log(format!("[INFO] {what} {key}: {entity} not found"));
        }
        Err(err) => {
            warn!(%key, %err, "{what} fetch failed");
            state.push_log(format!("[WARN] {what} {key} failed: {err}"));
        }
    }
}
