use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{MatchStatistics, TeamRef};

/// Unordered pair of entity ids, used to key comparison results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: u32,
    high: u32,
}

impl PairKey {
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn ids(self) -> (u32, u32) {
        (self.low, self.high)
    }

    pub fn contains(self, id: u32) -> bool {
        self.low == id || self.high == id
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.low, self.high)
    }
}

/// One past meeting as reported by the head-to-head endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct H2hMatch {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_team_id: Option<u32>,
    #[serde(default)]
    pub away_team_id: Option<u32>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    #[serde(default)]
    pub winner_id: Option<u32>,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H2hOutcome {
    Team1,
    Team2,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Team1,
    Team2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadToHeadRecord {
    pub key: PairKey,
    pub team1: TeamRef,
    pub team2: TeamRef,
    pub team1_wins: u32,
    pub team2_wins: u32,
    pub draws: u32,
    pub team1_goals: u32,
    pub team2_goals: u32,
    pub total: u32,
    /// Most recent meeting first.
    pub history: Vec<H2hMatch>,
}

impl HeadToHeadRecord {
    pub fn win_split(&self) -> WinSplit {
        win_split(self.team1_wins, self.team2_wins, self.total)
    }

    pub fn goal_bars(&self) -> BarSplit {
        bar_split(self.team1_goals as f64, self.team2_goals as f64)
    }

    pub fn recent(&self, n: usize) -> &[H2hMatch] {
        &self.history[..n.min(self.history.len())]
    }

    /// Team with strictly more wins, if any.
    pub fn leader(&self) -> Option<u32> {
        match self.team1_wins.cmp(&self.team2_wins) {
            std::cmp::Ordering::Greater => Some(self.team1.id),
            std::cmp::Ordering::Less => Some(self.team2.id),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn outcome_of(&self, m: &H2hMatch) -> H2hOutcome {
        outcome(&self.team1, &self.team2, m)
    }
}

/// Summarise the meetings between `team1` and `team2`. Counts are recomputed
/// from the history; any server-side tallies are ignored.
pub fn team_head_to_head(team1: TeamRef, team2: TeamRef, history: &[H2hMatch]) -> HeadToHeadRecord {
    let mut record = HeadToHeadRecord {
        key: PairKey::new(team1.id, team2.id),
        team1_wins: 0,
        team2_wins: 0,
        draws: 0,
        team1_goals: 0,
        team2_goals: 0,
        total: 0,
        history: Vec::with_capacity(history.len()),
        team1,
        team2,
    };

    for m in history {
        match outcome(&record.team1, &record.team2, m) {
            H2hOutcome::Team1 => record.team1_wins += 1,
            H2hOutcome::Team2 => record.team2_wins += 1,
            H2hOutcome::Draw => record.draws += 1,
        }
        if let Some(home_side) = home_side(&record.team1, &record.team2, m) {
            let (t1, t2) = match home_side {
                Side::Team1 => (m.home_score, m.away_score),
                Side::Team2 => (m.away_score, m.home_score),
            };
            record.team1_goals += t1.unwrap_or(0);
            record.team2_goals += t2.unwrap_or(0);
        }
        record.total += 1;
        record.history.push(m.clone());
    }

    // Undated meetings keep their relative order after the dated ones.
    record.history.sort_by(|a, b| match (a.date, b.date) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    record
}

/// Winner id first, then the `team1_win`/`team2_win`/`draw` tag, then the score.
fn outcome(team1: &TeamRef, team2: &TeamRef, m: &H2hMatch) -> H2hOutcome {
    if let Some(winner) = m.winner_id {
        if winner == team1.id {
            return H2hOutcome::Team1;
        }
        if winner == team2.id {
            return H2hOutcome::Team2;
        }
    }
    if let Some(tag) = m.result.as_deref() {
        match tag.trim().to_ascii_lowercase().as_str() {
            "team1_win" => return H2hOutcome::Team1,
            "team2_win" => return H2hOutcome::Team2,
            "draw" => return H2hOutcome::Draw,
            _ => {}
        }
    }
    if m.winner_id.is_none()
        && let (Some(home), Some(away), Some(side)) =
            (m.home_score, m.away_score, home_side(team1, team2, m))
    {
        return match (home.cmp(&away), side) {
            (std::cmp::Ordering::Greater, Side::Team1) | (std::cmp::Ordering::Less, Side::Team2) => {
                H2hOutcome::Team1
            }
            (std::cmp::Ordering::Greater, Side::Team2) | (std::cmp::Ordering::Less, Side::Team1) => {
                H2hOutcome::Team2
            }
            (std::cmp::Ordering::Equal, _) => H2hOutcome::Draw,
        };
    }
    H2hOutcome::Draw
}

fn home_side(team1: &TeamRef, team2: &TeamRef, m: &H2hMatch) -> Option<Side> {
    match (m.home_team_id, m.away_team_id) {
        (Some(h), _) if h == team1.id => return Some(Side::Team1),
        (Some(h), _) if h == team2.id => return Some(Side::Team2),
        (_, Some(a)) if a == team1.id => return Some(Side::Team2),
        (_, Some(a)) if a == team2.id => return Some(Side::Team1),
        _ => {}
    }
    let home = m.home_team.as_deref()?.trim();
    if home.eq_ignore_ascii_case(team1.name.trim()) {
        Some(Side::Team1)
    } else if home.eq_ignore_ascii_case(team2.name.trim()) {
        Some(Side::Team2)
    } else {
        None
    }
}

/// Integer percentages for a three-way bar; always sums to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinSplit {
    pub team1_pct: u8,
    pub draw_pct: u8,
    pub team2_pct: u8,
}

pub fn win_split(team1_wins: u32, team2_wins: u32, total: u32) -> WinSplit {
    let denom = total.max(1) as f64;
    let t1 = ((team1_wins as f64 / denom) * 100.0).round().clamp(0.0, 100.0) as u8;
    let mut t2 = ((team2_wins as f64 / denom) * 100.0).round().clamp(0.0, 100.0) as u8;
    if t1 as u16 + t2 as u16 > 100 {
        t2 = 100 - t1;
    }
    WinSplit {
        team1_pct: t1,
        draw_pct: 100 - t1 - t2,
        team2_pct: t2,
    }
}

/// Widths of two opposing bars, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSplit {
    pub left_pct: f64,
    pub right_pct: f64,
}

/// `value / (left + right)`, capped to [0, 100]; both zero gives 0/0.
pub fn bar_split(left: f64, right: f64) -> BarSplit {
    let left = left.max(0.0);
    let right = right.max(0.0);
    let sum = left + right;
    let denom = if sum > 0.0 { sum } else { 1.0 };
    BarSplit {
        left_pct: (left / denom * 100.0).min(100.0),
        right_pct: (right / denom * 100.0).min(100.0),
    }
}

/// Home/away share of one in-match stat; an empty stat splits evenly.
pub fn share_split(home: f64, away: f64) -> BarSplit {
    let home = home.max(0.0);
    let away = away.max(0.0);
    let total = home + away;
    let home_pct = if total > 0.0 { home / total * 100.0 } else { 50.0 };
    BarSplit {
        left_pct: home_pct,
        right_pct: 100.0 - home_pct,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonField {
    pub name: String,
    pub left: f64,
    pub right: f64,
    pub bars: BarSplit,
}

impl ComparisonField {
    pub fn diff(&self) -> f64 {
        self.left - self.right
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonDiff {
    pub left_id: u32,
    pub right_id: u32,
    pub fields: Vec<ComparisonField>,
}

impl ComparisonDiff {
    pub fn field(&self, name: &str) -> Option<&ComparisonField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

pub fn comparison_diff(left_id: u32, right_id: u32, fields: &[(&str, f64, f64)]) -> ComparisonDiff {
    ComparisonDiff {
        left_id,
        right_id,
        fields: fields
            .iter()
            .map(|(name, left, right)| ComparisonField {
                name: (*name).to_string(),
                left: *left,
                right: *right,
                bars: bar_split(*left, *right),
            })
            .collect(),
    }
}

pub fn match_stat_bars(stats: &MatchStatistics) -> Vec<(&'static str, u32, u32, BarSplit)> {
    stats
        .lines()
        .into_iter()
        .map(|(name, home, away)| (name, home, away, share_split(home as f64, away as f64)))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default)]
    pub goals: Option<f64>,
    #[serde(default)]
    pub assists: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub team: Option<TeamRef>,
    #[serde(default)]
    pub stats: Option<PlayerStats>,
}

impl PlayerProfile {
    fn stat(&self, pick: fn(&PlayerStats) -> Option<f64>) -> f64 {
        self.stats.as_ref().and_then(pick).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerComparison {
    pub key: PairKey,
    pub player1: PlayerProfile,
    pub player2: PlayerProfile,
    /// First player minus second.
    pub goals_diff: f64,
    pub assists_diff: f64,
    pub rating_diff: f64,
    pub bars: ComparisonDiff,
}

/// Missing stats count as zero.
pub fn compare_players(player1: PlayerProfile, player2: PlayerProfile) -> PlayerComparison {
    let goals = (player1.stat(|s| s.goals), player2.stat(|s| s.goals));
    let assists = (player1.stat(|s| s.assists), player2.stat(|s| s.assists));
    let rating = (player1.stat(|s| s.rating), player2.stat(|s| s.rating));
    let bars = comparison_diff(
        player1.id,
        player2.id,
        &[
            ("Goals", goals.0, goals.1),
            ("Assists", assists.0, assists.1),
            ("Rating", rating.0, rating.1),
        ],
    );
    PlayerComparison {
        key: PairKey::new(player1.id, player2.id),
        goals_diff: goals.0 - goals.1,
        assists_diff: assists.0 - assists.1,
        rating_diff: rating.0 - rating.1,
        bars,
        player1,
        player2,
    }
}

/// Season aggregates for one team, computed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamStatistics {
    pub team_id: u32,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub matches_played: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub draws: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub goals_scored: u32,
    #[serde(default)]
    pub goals_conceded: u32,
    #[serde(default)]
    pub clean_sheets: u32,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub form: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamComparison {
    pub key: PairKey,
    pub team1: TeamStatistics,
    pub team2: TeamStatistics,
    pub diff: ComparisonDiff,
}

pub fn compare_teams(team1: TeamStatistics, team2: TeamStatistics) -> TeamComparison {
    let diff = comparison_diff(
        team1.team_id,
        team2.team_id,
        &[
            ("Wins", team1.wins as f64, team2.wins as f64),
            ("Draws", team1.draws as f64, team2.draws as f64),
            ("Losses", team1.losses as f64, team2.losses as f64),
            ("Goals scored", team1.goals_scored as f64, team2.goals_scored as f64),
            ("Goals conceded", team1.goals_conceded as f64, team2.goals_conceded as f64),
            ("Clean sheets", team1.clean_sheets as f64, team2.clean_sheets as f64),
        ],
    );
    TeamComparison {
        key: PairKey::new(team1.team_id, team2.team_id),
        team1,
        team2,
        diff,
    }
}
