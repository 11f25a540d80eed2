use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use rand::rngs::ThreadRng;
use tracing::warn;

use crate::aggregate::{
    H2hMatch, HeadToHeadRecord, PairKey, PlayerProfile, PlayerStats, TeamStatistics,
    compare_players, compare_teams, team_head_to_head,
};
use crate::error::FetchError;
use crate::feed::{self, FeedHandle};
use crate::standings::StandingRow;
use crate::state::{
    Bucket, ChannelStatus, Delta, EventKind, League, MatchPatch, MatchState, MatchStatistics,
    MatchStatus, Prediction, ProviderCommand, TeamRef, TimelineEvent,
};

const DEMO_LEAGUE: u32 = 39;

const TEAMS: [(u32, &str); 10] = [
    (33, "Manchester United"),
    (34, "Newcastle"),
    (40, "Liverpool"),
    (42, "Arsenal"),
    (47, "Tottenham"),
    (49, "Chelsea"),
    (50, "Manchester City"),
    (51, "Brighton"),
    (65, "Nottingham Forest"),
    (66, "Aston Villa"),
];

pub fn spawn_demo_feed(tx: Sender<Delta>) -> FeedHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = stop.clone();
    let mut threads = Vec::with_capacity(1);
    match thread::Builder::new()
        .name("demo-feed".to_string())
        .spawn(move || run_demo(tx, cmd_rx, thread_stop))
    {
        Ok(handle) => threads.push(handle),
        Err(err) => warn!(%err, "failed to spawn demo feed"),
    }
    feed::handle_from_parts(cmd_tx, stop, threads)
}

fn run_demo(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>, stop: Arc<AtomicBool>) {
    let mut rng = rand::thread_rng();
    let mut matches = seed_matches();

    if tx.send(Delta::Leagues(seed_leagues())).is_err()
        || tx.send(Delta::Snapshot(matches.clone())).is_err()
        || tx.send(Delta::Channel(ChannelStatus::Connected)).is_err()
    {
        return;
    }
    let _ = tx.send(Delta::Log("[INFO] Demo feed running".to_string()));

    let minute_interval = Duration::from_secs(20);
    let mut last_minute_tick = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(900));

        if last_minute_tick.elapsed() >= minute_interval {
            for m in matches.iter_mut().filter(|m| m.status == MatchStatus::Live) {
                let minute = m.minute.unwrap_or(0).saturating_add(1);
                m.minute = Some(minute);
                let patch = MatchPatch {
                    match_id: m.id,
                    minute: Some(minute),
                    status: (minute >= 90).then_some(MatchStatus::FullTime),
                    ..MatchPatch::default()
                };
                if let Some(status) = patch.status {
                    m.status = status;
                }
                if tx.send(Delta::Push(patch)).is_err() {
                    return;
                }
            }
            last_minute_tick = Instant::now();
        } else if rng.gen_bool(0.08) {
            let live: Vec<usize> = matches
                .iter()
                .enumerate()
                .filter(|(_, m)| m.status == MatchStatus::Live)
                .map(|(idx, _)| idx)
                .collect();
            if !live.is_empty() {
                let m = &mut matches[live[rng.gen_range(0..live.len())]];
                let home = rng.gen_bool(0.5);
                let patch = if home {
                    let score = m.home_score.unwrap_or(0) + 1;
                    m.home_score = Some(score);
                    MatchPatch {
                        match_id: m.id,
                        home_score: Some(score),
                        ..MatchPatch::default()
                    }
                } else {
                    let score = m.away_score.unwrap_or(0) + 1;
                    m.away_score = Some(score);
                    MatchPatch {
                        match_id: m.id,
                        away_score: Some(score),
                        ..MatchPatch::default()
                    }
                };
                let scorer = if home { &m.home.name } else { &m.away.name };
                let line = format!(
                    "[INFO] Goal: {scorer} ({} {} {})",
                    m.home.name,
                    m.score_text(),
                    m.away.name
                );
                if tx.send(Delta::Push(patch)).is_err() {
                    return;
                }
                let _ = tx.send(Delta::Log(line));
            }
        }

        loop {
            let cmd = match cmd_rx.try_recv() {
                Ok(cmd) => cmd,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            };
            let delta = match cmd {
                ProviderCommand::Refresh => Delta::Snapshot(matches.clone()),
                ProviderCommand::RefreshLeagues => Delta::Leagues(seed_leagues()),
                ProviderCommand::FetchMatchDetail { match_id } => {
                    demo_detail(&matches, match_id, &mut rng)
                }
                ProviderCommand::FetchTeamH2h { team1, team2 } => Delta::TeamH2h {
                    key: PairKey::new(team1, team2),
                    result: demo_h2h(team1, team2, &mut rng),
                },
                ProviderCommand::FetchPlayerH2h { player1, player2 } => Delta::PlayerH2h {
                    key: PairKey::new(player1, player2),
                    result: Ok(compare_players(
                        demo_player(player1, &mut rng),
                        demo_player(player2, &mut rng),
                    )),
                },
                ProviderCommand::FetchTeamCompare { team1, team2 } => Delta::TeamCompare {
                    key: PairKey::new(team1, team2),
                    result: Ok(compare_teams(
                        demo_team_stats(team1, &mut rng),
                        demo_team_stats(team2, &mut rng),
                    )),
                },
                ProviderCommand::FetchStandings { league_id } => Delta::Standings {
                    league_id,
                    result: if league_id == DEMO_LEAGUE {
                        Ok(demo_standings(&mut rng))
                    } else {
                        Err(FetchError::NotFound(format!("league {league_id}")))
                    },
                },
            };
            if tx.send(delta).is_err() {
                return;
            }
        }
    }
}

fn team(idx: usize) -> TeamRef {
    let (id, name) = TEAMS[idx % TEAMS.len()];
    TeamRef {
        id,
        name: name.to_string(),
        logo_url: None,
    }
}

fn team_name(id: u32) -> String {
    TEAMS
        .iter()
        .find(|(tid, _)| *tid == id)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("Team {id}"))
}

fn seed_leagues() -> Vec<League> {
    vec![League {
        id: DEMO_LEAGUE,
        name: "Premier League".to_string(),
        country: Some("England".to_string()),
        logo_url: None,
    }]
}

fn seed_matches() -> Vec<MatchState> {
    let now = Utc::now();
    let fixture = |id: u32,
                   home: usize,
                   away: usize,
                   status: MatchStatus,
                   offset_hours: i64,
                   score: Option<(u32, u32)>,
                   minute: Option<u16>| MatchState {
        id,
        status,
        home: team(home),
        away: team(away),
        home_score: score.map(|s| s.0),
        away_score: score.map(|s| s.1),
        minute,
        start_time: now + ChronoDuration::hours(offset_hours),
        league_id: Some(DEMO_LEAGUE),
        prediction: Some(Prediction {
            home: 0.45,
            draw: 0.27,
            away: 0.28,
            confidence: Some(0.6),
        }),
        timeline: None,
        statistics: None,
    };
    vec![
        fixture(9001, 0, 1, MatchStatus::Live, -1, Some((1, 0)), Some(52)),
        fixture(9002, 2, 3, MatchStatus::HalfTime, -1, Some((2, 2)), Some(45)),
        fixture(9003, 4, 5, MatchStatus::NotStarted, 3, None, None),
        fixture(9004, 6, 7, MatchStatus::NotStarted, 26, None, None),
        fixture(9005, 8, 9, MatchStatus::Postponed, 50, None, None),
        fixture(9006, 1, 2, MatchStatus::FullTime, -26, Some((0, 3)), None),
        fixture(9007, 3, 4, MatchStatus::AfterPenalties, -50, Some((1, 1)), None),
    ]
}

fn demo_detail(matches: &[MatchState], match_id: u32, rng: &mut ThreadRng) -> Delta {
    let Some(m) = matches.iter().find(|m| m.id == match_id) else {
        return Delta::MatchDetail {
            id: match_id,
            timeline: Err(FetchError::NotFound(format!("match {match_id} events"))),
            statistics: Err(FetchError::NotFound(format!("match {match_id} statistics"))),
        };
    };
    let mut timeline = Vec::new();
    for _ in 0..m.home_score.unwrap_or(0) {
        timeline.push(TimelineEvent {
            minute: rng.gen_range(1..90),
            kind: EventKind::Goal,
            team_id: Some(m.home.id),
            player: None,
            detail: Some("Normal Goal".to_string()),
        });
    }
    for _ in 0..m.away_score.unwrap_or(0) {
        timeline.push(TimelineEvent {
            minute: rng.gen_range(1..90),
            kind: EventKind::Goal,
            team_id: Some(m.away.id),
            player: None,
            detail: Some("Normal Goal".to_string()),
        });
    }
    timeline.sort_by_key(|e| e.minute);
    if m.bucket() == Bucket::Upcoming {
        return Delta::MatchDetail {
            id: match_id,
            timeline: Ok(timeline),
            statistics: Err(FetchError::NotFound(format!("match {match_id} statistics"))),
        };
    }
    let possession = rng.gen_range(35..66);
    let statistics = MatchStatistics {
        possession_home: Some(possession),
        possession_away: Some(100 - possession),
        shots_on_home: Some(rng.gen_range(0..9)),
        shots_on_away: Some(rng.gen_range(0..9)),
        corners_home: Some(rng.gen_range(0..10)),
        corners_away: Some(rng.gen_range(0..10)),
        ..MatchStatistics::default()
    };
    Delta::MatchDetail {
        id: match_id,
        timeline: Ok(timeline),
        statistics: Ok(statistics),
    }
}

fn demo_h2h(team1: u32, team2: u32, rng: &mut ThreadRng) -> Result<HeadToHeadRecord, FetchError> {
    let now = Utc::now();
    let history: Vec<H2hMatch> = (0..rng.gen_range(3..8))
        .map(|i| {
            let (home_id, away_id) = if i % 2 == 0 {
                (team1, team2)
            } else {
                (team2, team1)
            };
            H2hMatch {
                id: Some(8000 + i),
                date: Some(now - ChronoDuration::days(120 * (i as i64 + 1))),
                home_team_id: Some(home_id),
                away_team_id: Some(away_id),
                home_team: Some(team_name(home_id)),
                away_team: Some(team_name(away_id)),
                home_score: Some(rng.gen_range(0..4)),
                away_score: Some(rng.gen_range(0..4)),
                winner_id: None,
                result: None,
            }
        })
        .collect();
    let side = |id: u32| TeamRef {
        id,
        name: team_name(id),
        logo_url: None,
    };
    Ok(team_head_to_head(side(team1), side(team2), &history))
}

fn demo_player(id: u32, rng: &mut ThreadRng) -> PlayerProfile {
    PlayerProfile {
        id,
        name: format!("Player {id}"),
        position: Some("Forward".to_string()),
        nationality: None,
        team: None,
        stats: Some(PlayerStats {
            goals: Some(rng.gen_range(0..25) as f64),
            assists: Some(rng.gen_range(0..15) as f64),
            rating: Some((rng.gen_range(60..85) as f64) / 10.0),
        }),
    }
}

fn demo_team_stats(id: u32, rng: &mut ThreadRng) -> TeamStatistics {
    let wins = rng.gen_range(5..20);
    let draws = rng.gen_range(2..10);
    let losses = rng.gen_range(2..12);
    let played = wins + draws + losses;
    TeamStatistics {
        team_id: id,
        team_name: team_name(id),
        matches_played: played,
        wins,
        draws,
        losses,
        goals_scored: rng.gen_range(20..70),
        goals_conceded: rng.gen_range(15..60),
        clean_sheets: rng.gen_range(2..15),
        win_rate: wins as f64 / played as f64 * 100.0,
        form: ["W", "D", "L", "W", "W"].iter().map(|s| s.to_string()).collect(),
    }
}

fn demo_standings(rng: &mut ThreadRng) -> Vec<StandingRow> {
    let mut rows: Vec<StandingRow> = TEAMS
        .iter()
        .map(|(id, name)| {
            let won = rng.gen_range(3..20);
            let drawn = rng.gen_range(2..10);
            let lost = rng.gen_range(2..14);
            let goals_for = rng.gen_range(20..70);
            let goals_against = rng.gen_range(15..60);
            let form: String = (0..5)
                .map(|_| ["W", "D", "L"][rng.gen_range(0..3)])
                .collect::<Vec<_>>()
                .join(",");
            StandingRow {
                rank: 0,
                team_id: *id,
                team_name: name.to_string(),
                team_logo: None,
                points: (won * 3 + drawn) as i32,
                played: won + drawn + lost,
                won,
                drawn,
                lost,
                goals_for,
                goals_against,
                goal_difference: goals_for as i32 - goals_against as i32,
                form: Some(form),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_difference.cmp(&a.goal_difference))
            .then(a.team_name.cmp(&b.team_name))
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx as u32 + 1;
    }
    rows
}
