use chrono::{TimeZone, Utc};

use matchboard::aggregate::{
    H2hMatch, H2hOutcome, PairKey, PlayerProfile, PlayerStats, TeamStatistics, bar_split,
    compare_players, compare_teams, match_stat_bars, share_split, team_head_to_head, win_split,
};
use matchboard::standings::{FormResult, Medal, Zone, form_string, medal, parse_form, zone};
use matchboard::state::{MatchStatistics, TeamRef};

fn team(id: u32, name: &str) -> TeamRef {
    TeamRef {
        id,
        name: name.to_string(),
        logo_url: None,
    }
}

fn meeting(home: u32, away: u32, score: (u32, u32), day: u32) -> H2hMatch {
    H2hMatch {
        date: Some(Utc.with_ymd_and_hms(2023, 1, day, 15, 0, 0).unwrap()),
        home_team_id: Some(home),
        away_team_id: Some(away),
        home_score: Some(score.0),
        away_score: Some(score.1),
        ..H2hMatch::default()
    }
}

#[test]
fn three_one_one_splits_sixty_twenty_twenty() {
    let split = win_split(3, 1, 5);
    assert_eq!(
        (split.team1_pct, split.draw_pct, split.team2_pct),
        (60, 20, 20)
    );
}

#[test]
fn empty_history_splits_to_all_draw() {
    let split = win_split(0, 0, 0);
    assert_eq!(
        (split.team1_pct, split.draw_pct, split.team2_pct),
        (0, 100, 0)
    );
}

#[test]
fn thirds_sum_to_one_hundred() {
    let split = win_split(1, 1, 3);
    assert_eq!(split.team1_pct, 33);
    assert_eq!(split.team2_pct, 33);
    assert_eq!(split.draw_pct, 34);
}

#[test]
fn pair_of_ten_and_twenty_two_counts_each_outcome_once() {
    let history = vec![
        meeting(10, 22, (2, 0), 1),
        meeting(22, 10, (3, 1), 2),
        meeting(10, 22, (1, 1), 3),
    ];
    let record = team_head_to_head(team(10, "Ten"), team(22, "Twenty Two"), &history);
    assert_eq!(record.total, 3);
    assert_eq!(
        (record.team1_wins, record.team2_wins, record.draws),
        (1, 1, 1)
    );
    assert_eq!(record.team1_goals, 4);
    assert_eq!(record.team2_goals, 4);
    assert_eq!(record.leader(), None);
    assert_eq!(record.key, PairKey::new(22, 10));
    assert_eq!(record.history[0].date.map(|d| d.format("%d").to_string()), Some("03".to_string()));
    assert_eq!(record.outcome_of(&history[1]), H2hOutcome::Team2);
}

#[test]
fn swapping_sides_mirrors_the_record() {
    let history = vec![meeting(10, 22, (2, 0), 1), meeting(10, 22, (2, 1), 2)];
    let forward = team_head_to_head(team(10, "Ten"), team(22, "Twenty Two"), &history);
    let reverse = team_head_to_head(team(22, "Twenty Two"), team(10, "Ten"), &history);
    assert_eq!(forward.team1_wins, reverse.team2_wins);
    assert_eq!(forward.team1_goals, reverse.team2_goals);
    assert_eq!(forward.key, reverse.key);
}

#[test]
fn goalless_history_gives_empty_bars() {
    let record = team_head_to_head(
        team(1, "A"),
        team(2, "B"),
        &[meeting(1, 2, (0, 0), 1)],
    );
    let bars = record.goal_bars();
    assert_eq!(bars.left_pct, 0.0);
    assert_eq!(bars.right_pct, 0.0);
    assert_eq!(record.draws, 1);
}

#[test]
fn bars_are_floored_and_capped() {
    let bars = bar_split(-5.0, 10.0);
    assert_eq!(bars.left_pct, 0.0);
    assert_eq!(bars.right_pct, 100.0);
    let bars = bar_split(3.0, 1.0);
    assert_eq!(bars.left_pct, 75.0);
    assert_eq!(bars.right_pct, 25.0);
}

#[test]
fn empty_in_match_stat_splits_evenly() {
    let split = share_split(0.0, 0.0);
    assert_eq!(split.left_pct, 50.0);
    assert_eq!(split.right_pct, 50.0);

    let stats = MatchStatistics {
        corners_home: Some(6),
        corners_away: Some(2),
        fouls_home: Some(4),
        ..MatchStatistics::default()
    };
    let bars = match_stat_bars(&stats);
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].0, "Corners");
    assert_eq!(bars[0].3.left_pct, 75.0);
}

#[test]
fn player_diffs_are_first_minus_second() {
    let p1 = PlayerProfile {
        id: 9,
        name: "Nine".to_string(),
        position: None,
        nationality: None,
        team: None,
        stats: Some(PlayerStats {
            goals: Some(12.0),
            assists: Some(3.0),
            rating: Some(7.1),
        }),
    };
    let p2 = PlayerProfile {
        id: 11,
        name: "Eleven".to_string(),
        position: None,
        nationality: None,
        team: None,
        stats: Some(PlayerStats {
            goals: Some(15.0),
            assists: None,
            rating: Some(7.1),
        }),
    };
    let cmp = compare_players(p1, p2);
    assert_eq!(cmp.goals_diff, -3.0);
    assert_eq!(cmp.assists_diff, 3.0);
    assert_eq!(cmp.rating_diff, 0.0);
    assert_eq!(cmp.key, PairKey::new(11, 9));
    let assists = cmp.bars.field("Assists").expect("assists field");
    assert_eq!(assists.bars.left_pct, 100.0);
}

#[test]
fn team_comparison_lists_every_field() {
    let left = TeamStatistics {
        team_id: 1,
        wins: 10,
        goals_scored: 30,
        ..TeamStatistics::default()
    };
    let right = TeamStatistics {
        team_id: 2,
        wins: 5,
        goals_scored: 10,
        ..TeamStatistics::default()
    };
    let cmp = compare_teams(left, right);
    assert_eq!(cmp.diff.left_id, 1);
    let wins = cmp.diff.field("Wins").expect("wins field");
    assert_eq!(wins.diff(), 5.0);
    let goals = cmp.diff.field("Goals scored").expect("goals field");
    assert_eq!(goals.bars.left_pct, 75.0);
    let losses = cmp.diff.field("Losses").expect("losses field");
    assert_eq!(losses.bars.left_pct, 0.0);
}

#[test]
fn standings_zones_follow_table_position() {
    assert_eq!(zone(1, 20), Zone::Continental);
    assert_eq!(zone(4, 20), Zone::Continental);
    assert_eq!(zone(5, 20), Zone::Mid);
    assert_eq!(zone(17, 20), Zone::Mid);
    assert_eq!(zone(18, 20), Zone::Relegation);
    assert_eq!(zone(20, 20), Zone::Relegation);
    assert_eq!(zone(3, 3), Zone::Continental);
    assert_eq!(medal(1), Some(Medal::Gold));
    assert_eq!(medal(3), Some(Medal::Bronze));
    assert_eq!(medal(4), None);
}

#[test]
fn form_keeps_last_five() {
    let form = parse_form("L,L,W,D,W,W,L");
    assert_eq!(form.len(), 5);
    assert_eq!(form[0], FormResult::Win);
    assert_eq!(form_string(&form), "WDWWL");
    assert_eq!(form_string(&parse_form("wdl")), "WDL");
    assert!(parse_form("").is_empty());
}
