use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};

use matchboard::push::{PushMessage, parse_push_message};
use matchboard::reconcile::{MatchStore, MergeOutcome, PendingConfig};
use matchboard::state::{
    EventKind, MatchPatch, MatchState, MatchStatistics, MatchStatus, Prediction, TeamRef,
    TimelineEvent,
};

fn team(id: u32, name: &str) -> TeamRef {
    TeamRef {
        id,
        name: name.to_string(),
        logo_url: None,
    }
}

fn record(id: u32, status: MatchStatus, score: Option<(u32, u32)>) -> MatchState {
    MatchState {
        id,
        status,
        home: team(10, "Home"),
        away: team(22, "Away"),
        home_score: score.map(|s| s.0),
        away_score: score.map(|s| s.1),
        minute: None,
        start_time: Utc.with_ymd_and_hms(2024, 5, 4, 14, 0, 0).unwrap(),
        league_id: Some(39),
        prediction: None,
        timeline: None,
        statistics: None,
    }
}

fn score_patch(id: u32, home: Option<u32>, away: Option<u32>) -> MatchPatch {
    MatchPatch {
        match_id: id,
        home_score: home,
        away_score: away,
        ..MatchPatch::default()
    }
}

#[test]
fn snapshot_replay_is_idempotent() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    let snapshot = vec![
        record(1, MatchStatus::Live, Some((1, 0))),
        record(2, MatchStatus::NotStarted, None),
    ];
    let first = store.apply_snapshot(snapshot.clone(), now);
    assert!(first.changed);
    assert_eq!(first.inserted, 2);
    let before = store.matches();

    let second = store.apply_snapshot(snapshot, now);
    assert!(!second.changed);
    assert_eq!(second.inserted, 0);
    assert_eq!(store.matches(), before);
}

#[test]
fn duplicate_ids_in_a_snapshot_keep_the_first() {
    let mut store = MatchStore::default();
    store.apply_snapshot(
        vec![
            record(1, MatchStatus::Live, Some((1, 0))),
            record(1, MatchStatus::FullTime, Some((3, 3))),
        ],
        Instant::now(),
    );
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(1).map(|m| m.status), Some(MatchStatus::Live));
}

#[test]
fn patch_replay_is_idempotent() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_snapshot(vec![record(1, MatchStatus::Live, Some((0, 0)))], now);

    let patch = score_patch(1, Some(1), Some(0));
    assert_eq!(store.apply_patch(patch.clone(), now), MergeOutcome::Applied);
    let after_first = store.matches();
    assert_eq!(store.apply_patch(patch, now), MergeOutcome::Unchanged);
    assert_eq!(store.matches(), after_first);
}

#[test]
fn patch_touches_only_reported_fields() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    let mut base = record(501, MatchStatus::Live, Some((1, 1)));
    base.minute = Some(60);
    base.prediction = Some(Prediction {
        home: 0.4,
        draw: 0.3,
        away: 0.3,
        confidence: None,
    });
    store.apply_snapshot(vec![base.clone()], now);

    let patch = MatchPatch {
        match_id: 501,
        minute: Some(61),
        ..MatchPatch::default()
    };
    store.apply_patch(patch, now);

    let m = store.get(501).expect("tracked");
    assert_eq!(m.minute, Some(61));
    assert_eq!(m.home_score, Some(1));
    assert_eq!(m.away_score, Some(1));
    assert_eq!(m.status, MatchStatus::Live);
    assert_eq!(m.prediction, base.prediction);
    assert_eq!(m.home, base.home);
}

#[test]
fn score_patch_leaves_status_alone() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_snapshot(vec![record(501, MatchStatus::NotStarted, None)], now);

    store.apply_patch(score_patch(501, Some(2), Some(1)), now);

    let m = store.get(501).expect("tracked");
    assert_eq!(m.status, MatchStatus::NotStarted);
    assert_eq!(m.score_text(), "2-1");
}

#[test]
fn lone_score_patch_on_unscored_match_fills_other_side() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_snapshot(vec![record(7, MatchStatus::Live, None)], now);

    store.apply_patch(score_patch(7, None, Some(1)), now);

    let m = store.get(7).expect("tracked");
    assert_eq!(m.home_score, Some(0));
    assert_eq!(m.away_score, Some(1));
}

#[test]
fn status_patch_moves_match_between_buckets() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_snapshot(vec![record(3, MatchStatus::Live, Some((2, 0)))], now);
    let patch = MatchPatch {
        match_id: 3,
        status: Some(MatchStatus::FullTime),
        ..MatchPatch::default()
    };
    assert_eq!(store.apply_patch(patch, now), MergeOutcome::Applied);
    assert!(!store.get(3).expect("tracked").is_live());
}

#[test]
fn unknown_id_is_buffered_then_flushed_by_next_snapshot() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_snapshot(vec![record(1, MatchStatus::Live, Some((0, 0)))], now);

    let outcome = store.apply_patch(score_patch(2, Some(1), Some(0)), now);
    assert_eq!(outcome, MergeOutcome::Buffered);
    assert!(!store.is_tracked(2));
    assert_eq!(store.len(), 1);
    assert!(store.pending().contains(2));

    let later = now + Duration::from_secs(5);
    let snap = store.apply_snapshot(
        vec![
            record(1, MatchStatus::Live, Some((0, 0))),
            record(2, MatchStatus::Live, Some((0, 0))),
        ],
        later,
    );
    assert_eq!(snap.flushed, 1);
    assert!(store.pending().is_empty());
    assert_eq!(store.get(2).map(|m| m.score_text()), Some("1-0".to_string()));
}

#[test]
fn repeating_a_snapshot_keeps_flushed_patches() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_patch(score_patch(5, Some(1), Some(0)), now);

    let snapshot = vec![record(5, MatchStatus::Live, Some((0, 0)))];
    let first = store.apply_snapshot(snapshot.clone(), now);
    assert_eq!(first.flushed, 1);
    assert_eq!(store.get(5).map(|m| m.score_text()), Some("1-0".to_string()));

    let second = store.apply_snapshot(snapshot, now);
    assert!(!second.changed);
    assert_eq!(store.get(5).map(|m| m.score_text()), Some("1-0".to_string()));
}

#[test]
fn live_patch_survives_an_unchanged_listing() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    let snapshot = vec![record(6, MatchStatus::Live, Some((0, 0)))];
    store.apply_snapshot(snapshot.clone(), now);
    store.apply_patch(score_patch(6, Some(1), Some(0)), now);

    assert!(!store.apply_snapshot(snapshot, now).changed);
    assert_eq!(store.get(6).map(|m| m.score_text()), Some("1-0".to_string()));

    store.apply_snapshot(vec![record(6, MatchStatus::Live, Some((1, 1)))], now);
    assert_eq!(store.get(6).map(|m| m.score_text()), Some("1-1".to_string()));
}

#[test]
fn buffered_patch_does_not_rewind_a_newer_listing() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_patch(score_patch(8, Some(1), Some(0)), now);

    store.apply_snapshot(vec![record(8, MatchStatus::Live, Some((2, 1)))], now);
    assert_eq!(store.get(8).map(|m| m.score_text()), Some("2-1".to_string()));
    assert!(store.pending().is_empty());
}

#[test]
fn stale_buffered_patches_are_dropped() {
    let now = Instant::now();
    let mut store = MatchStore::new(PendingConfig {
        capacity: 8,
        max_age: Duration::from_secs(30),
    });
    store.apply_patch(score_patch(2, Some(4), Some(0)), now);

    let snap = store.apply_snapshot(
        vec![record(2, MatchStatus::Live, Some((0, 0)))],
        now + Duration::from_secs(31),
    );
    assert_eq!(snap.flushed, 0);
    assert_eq!(store.get(2).map(|m| m.score_text()), Some("0-0".to_string()));
}

#[test]
fn buffered_patches_replay_in_arrival_order() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_patch(score_patch(4, Some(1), Some(0)), now);
    store.apply_patch(score_patch(4, Some(1), Some(1)), now);

    store.apply_snapshot(vec![record(4, MatchStatus::Live, Some((0, 0)))], now);
    assert_eq!(store.get(4).map(|m| m.score_text()), Some("1-1".to_string()));
}

#[test]
fn listing_order_is_canonical_and_unlisted_matches_stay() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_snapshot(
        vec![
            record(1, MatchStatus::Live, None),
            record(2, MatchStatus::Live, None),
            record(3, MatchStatus::Live, None),
        ],
        now,
    );
    store.apply_snapshot(
        vec![
            record(3, MatchStatus::Live, None),
            record(1, MatchStatus::Live, None),
        ],
        now,
    );
    let ids: Vec<u32> = store.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[test]
fn detail_survives_a_later_snapshot() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_snapshot(vec![record(1, MatchStatus::Live, Some((1, 0)))], now);

    let timeline = vec![TimelineEvent {
        minute: 12,
        kind: EventKind::Goal,
        team_id: Some(10),
        player: Some("Nine".to_string()),
        detail: None,
    }];
    let stats = MatchStatistics {
        possession_home: Some(55),
        possession_away: Some(45),
        ..MatchStatistics::default()
    };
    assert!(store.apply_detail(1, Some(timeline.clone()), Some(stats.clone())));
    assert!(!store.apply_detail(99, Some(Vec::new()), None));

    store.apply_snapshot(vec![record(1, MatchStatus::Live, Some((2, 0)))], now);
    let m = store.get(1).expect("tracked");
    assert_eq!(m.home_score, Some(2));
    assert_eq!(m.timeline.as_ref(), Some(&timeline));
    assert_eq!(m.statistics.as_ref(), Some(&stats));
}

#[test]
fn malformed_push_messages_never_reach_the_store() {
    let now = Instant::now();
    let mut store = MatchStore::default();
    store.apply_snapshot(vec![record(1, MatchStatus::Live, Some((1, 0)))], now);
    let before = store.matches();

    let raw_messages = [
        "not json",
        r#"{"data":{"match_id":1}}"#,
        r#"{"type":"match_update"}"#,
        r#"{"type":"match_update","data":{"home_score":3}}"#,
        r#"{"type":"match_update","data":{"match_id":-1,"home_score":3}}"#,
        r#"{"type":"match_update","data":{"match_id":1,"home_score":"three"}}"#,
        r#"{"type":"match_update","data":{"match_id":1,"status":"WAT"}}"#,
        r#"{"type":"heartbeat","data":{}}"#,
    ];
    for raw in raw_messages {
        if let Ok(PushMessage::MatchUpdate(patch)) = parse_push_message(raw) {
            store.apply_patch(patch, now);
        }
    }
    assert_eq!(store.matches(), before);
    assert!(store.pending().is_empty());
}

#[test]
fn push_message_decodes_partial_update() {
    let msg = parse_push_message(
        r#"{"type":"match_update","data":{"match_id":501,"home_score":2,"away_score":1,"minute":null}}"#,
    )
    .expect("valid message");
    assert_eq!(
        msg,
        PushMessage::MatchUpdate(MatchPatch {
            match_id: 501,
            home_score: Some(2),
            away_score: Some(1),
            minute: None,
            status: None,
        })
    );
    assert_eq!(
        parse_push_message(r#"{"type":"heartbeat"}"#),
        Ok(PushMessage::Ignored("heartbeat".to_string()))
    );
}
