use std::time::Instant;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use matchboard::aggregate::{H2hMatch, team_head_to_head};
use matchboard::api::parse_matches_json;
use matchboard::classify::group_by_date;
use matchboard::reconcile::MatchStore;
use matchboard::state::{Bucket, MatchPatch, MatchState, MatchStatus, TeamRef};

const STATUSES: [&str; 6] = ["LIVE", "HT", "NS", "FT", "PST", "AET"];

fn listing_json(count: u32) -> String {
    let rows: Vec<String> = (0..count)
        .map(|idx| {
            format!(
                r#"{{"id":{id},"start_time":"2024-05-{day:02}T{hour:02}:00:00","status":"{status}","home_score":{hs},"away_score":1,"home_team_id":{home},"away_team_id":{away},"home_team_name":"Home {home}","away_team_name":"Away {away}","league_id":{league}}}"#,
                id = idx + 1,
                day = idx % 28 + 1,
                hour = idx % 24,
                status = STATUSES[idx as usize % STATUSES.len()],
                hs = idx % 4,
                home = idx * 2,
                away = idx * 2 + 1,
                league = 39 + idx % 3,
            )
        })
        .collect();
    format!("[{}]", rows.join(","))
}

fn sample_matches(count: u32) -> Vec<MatchState> {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    (0..count)
        .map(|idx| MatchState {
            id: idx + 1,
            status: MatchStatus::ALL[idx as usize % MatchStatus::ALL.len()],
            home: TeamRef {
                id: idx * 2,
                name: format!("Home {idx}"),
                logo_url: None,
            },
            away: TeamRef {
                id: idx * 2 + 1,
                name: format!("Away {idx}"),
                logo_url: None,
            },
            home_score: Some(idx % 3),
            away_score: Some(idx % 2),
            minute: None,
            start_time: base + ChronoDuration::hours(idx as i64 * 5),
            league_id: Some(39),
            prediction: None,
            timeline: None,
            statistics: None,
        })
        .collect()
}

fn bench_listing_parse(c: &mut Criterion) {
    let raw = listing_json(300);
    c.bench_function("listing_parse_300", |b| {
        b.iter(|| {
            let listing = parse_matches_json(black_box(&raw)).unwrap();
            black_box(listing.matches.len());
        })
    });
}

fn bench_snapshot_merge(c: &mut Criterion) {
    let snapshot = sample_matches(500);
    let mut store = MatchStore::default();
    store.apply_snapshot(snapshot.clone(), Instant::now());
    c.bench_function("snapshot_merge_500", |b| {
        b.iter(|| {
            let outcome = store.apply_snapshot(black_box(snapshot.clone()), Instant::now());
            black_box(outcome.changed);
        })
    });
}

fn bench_push_burst(c: &mut Criterion) {
    let mut store = MatchStore::default();
    store.apply_snapshot(sample_matches(500), Instant::now());
    let patches: Vec<MatchPatch> = (0..1_000u32)
        .map(|idx| MatchPatch {
            match_id: idx % 600 + 1,
            home_score: Some(idx % 5),
            minute: Some((idx % 90) as u16),
            ..MatchPatch::default()
        })
        .collect();
    c.bench_function("push_burst_1000", |b| {
        b.iter(|| {
            for patch in &patches {
                black_box(store.apply_patch(patch.clone(), Instant::now()));
            }
        })
    });
}

fn bench_group_by_date(c: &mut Criterion) {
    let matches = sample_matches(500);
    c.bench_function("group_by_date_500", |b| {
        b.iter(|| {
            let groups = group_by_date(black_box(matches.clone()), Bucket::Finished, &Utc);
            black_box(groups.len());
        })
    });
}

fn bench_head_to_head(c: &mut Criterion) {
    let base = Utc.with_ymd_and_hms(2010, 1, 1, 15, 0, 0).unwrap();
    let history: Vec<H2hMatch> = (0..200u32)
        .map(|idx| H2hMatch {
            date: Some(base + ChronoDuration::days(idx as i64 * 30)),
            home_team_id: Some(if idx % 2 == 0 { 10 } else { 22 }),
            away_team_id: Some(if idx % 2 == 0 { 22 } else { 10 }),
            home_score: Some(idx % 4),
            away_score: Some(idx % 3),
            ..H2hMatch::default()
        })
        .collect();
    let team = |id: u32| TeamRef {
        id,
        name: format!("Team {id}"),
        logo_url: None,
    };
    c.bench_function("head_to_head_200", |b| {
        b.iter(|| {
            let record = team_head_to_head(team(10), team(22), black_box(&history));
            black_box(record.win_split());
        })
    });
}

criterion_group!(
    benches,
    bench_listing_parse,
    bench_snapshot_merge,
    bench_push_burst,
    bench_group_by_date,
    bench_head_to_head
);
criterion_main!(benches);
