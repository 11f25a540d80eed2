use chrono::{FixedOffset, TimeZone, Utc};

use matchboard::classify::{
    ViewContext, bucket_counts, default_bucket, filter_matches, group_by_date,
};
use matchboard::state::{Bucket, MatchState, MatchStatus, TeamRef};

fn team(id: u32) -> TeamRef {
    TeamRef {
        id,
        name: format!("Team {id}"),
        logo_url: None,
    }
}

fn fixture(id: u32, status: MatchStatus, league: Option<u32>, ymd_h: (i32, u32, u32, u32)) -> MatchState {
    let (y, mo, d, h) = ymd_h;
    MatchState {
        id,
        status,
        home: team(id * 10),
        away: team(id * 10 + 1),
        home_score: None,
        away_score: None,
        minute: None,
        start_time: Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap(),
        league_id: league,
        prediction: None,
        timeline: None,
        statistics: None,
    }
}

#[test]
fn every_status_lands_in_exactly_one_bucket() {
    for status in MatchStatus::ALL {
        let hits = Bucket::ALL.iter().filter(|b| b.contains(status)).count();
        assert_eq!(hits, 1, "{status:?} should be in exactly one bucket");
        assert_eq!(MatchStatus::from_code(status.code()), Some(status));
    }
}

#[test]
fn known_statuses_map_to_expected_buckets() {
    assert_eq!(MatchStatus::HalfTime.bucket(), Bucket::Live);
    assert_eq!(MatchStatus::Penalties.bucket(), Bucket::Live);
    assert_eq!(MatchStatus::Postponed.bucket(), Bucket::Upcoming);
    assert_eq!(MatchStatus::ToBeDetermined.bucket(), Bucket::Upcoming);
    assert_eq!(MatchStatus::AfterPenalties.bucket(), Bucket::Finished);
    assert_eq!(MatchStatus::Cancelled.bucket(), Bucket::Finished);
    assert_eq!(MatchStatus::from_code("2h"), Some(MatchStatus::Live));
    assert_eq!(MatchStatus::from_code("SUSP"), None);
}

#[test]
fn buckets_partition_the_set() {
    let matches: Vec<MatchState> = MatchStatus::ALL
        .iter()
        .enumerate()
        .map(|(idx, status)| fixture(idx as u32 + 1, *status, Some(39), (2024, 5, 4, 12)))
        .collect();
    let mut seen = Vec::new();
    for bucket in Bucket::ALL {
        let ctx = ViewContext::new(None, bucket);
        seen.extend(filter_matches(&matches, &ctx).into_iter().map(|m| m.id));
    }
    seen.sort_unstable();
    let all: Vec<u32> = matches.iter().map(|m| m.id).collect();
    assert_eq!(seen, all);

    let counts = bucket_counts(&matches, None);
    assert_eq!(counts.total(), matches.len());
    assert_eq!(counts.live, 4);
    assert_eq!(counts.upcoming, 3);
    assert_eq!(counts.finished, 4);
}

#[test]
fn league_filter_keeps_unlabelled_records() {
    let matches = vec![
        fixture(1, MatchStatus::Live, Some(39), (2024, 5, 4, 12)),
        fixture(2, MatchStatus::Live, Some(140), (2024, 5, 4, 12)),
        fixture(3, MatchStatus::Live, None, (2024, 5, 4, 12)),
    ];
    let ctx = ViewContext::new(Some(39), Bucket::Live);
    let ids: Vec<u32> = filter_matches(&matches, &ctx).iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(bucket_counts(&matches, Some(140)).live, 2);
}

#[test]
fn default_bucket_prefers_live() {
    let mut matches = vec![fixture(1, MatchStatus::NotStarted, None, (2024, 5, 4, 12))];
    assert_eq!(default_bucket(&matches), Bucket::Upcoming);
    matches.push(fixture(2, MatchStatus::HalfTime, None, (2024, 5, 4, 12)));
    assert_eq!(default_bucket(&matches), Bucket::Live);
    assert_eq!(default_bucket(&Vec::<MatchState>::new()), Bucket::Upcoming);
}

#[test]
fn upcoming_groups_run_oldest_first() {
    let matches = vec![
        fixture(3, MatchStatus::NotStarted, None, (2024, 5, 5, 18)),
        fixture(1, MatchStatus::NotStarted, None, (2024, 5, 4, 20)),
        fixture(2, MatchStatus::NotStarted, None, (2024, 5, 4, 12)),
    ];
    let groups = group_by_date(matches, Bucket::Upcoming, &Utc);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, "2024-05-04");
    assert_eq!(groups[0].label, "Saturday, May 4, 2024");
    let first: Vec<u32> = groups[0].matches.iter().map(|m| m.id).collect();
    assert_eq!(first, vec![2, 1]);
    assert_eq!(groups[1].key, "2024-05-05");
}

#[test]
fn finished_groups_run_newest_first() {
    let matches = vec![
        fixture(1, MatchStatus::FullTime, None, (2024, 5, 3, 12)),
        fixture(2, MatchStatus::FullTime, None, (2024, 5, 4, 12)),
        fixture(3, MatchStatus::FullTime, None, (2024, 5, 4, 18)),
    ];
    let groups = group_by_date(matches, Bucket::Finished, &Utc);
    let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["2024-05-04", "2024-05-03"]);
    let newest: Vec<u32> = groups[0].matches.iter().map(|m| m.id).collect();
    assert_eq!(newest, vec![3, 2]);
}

#[test]
fn grouping_uses_the_viewer_timezone_and_loses_nothing() {
    let matches = vec![
        fixture(1, MatchStatus::NotStarted, None, (2024, 5, 4, 23)),
        fixture(2, MatchStatus::NotStarted, None, (2024, 5, 4, 10)),
    ];
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    let groups = group_by_date(matches, Bucket::Upcoming, &plus_two);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].key, "2024-05-05");
    let total: usize = groups.iter().map(|g| g.matches.len()).sum();
    assert_eq!(total, 2);
}
