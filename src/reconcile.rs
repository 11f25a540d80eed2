use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::state::{Bucket, MatchPatch, MatchState, MatchStatistics, TimelineEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingConfig {
    pub capacity: usize,
    pub max_age: Duration,
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            max_age: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    Unchanged,
    Buffered,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    pub changed: bool,
    pub inserted: usize,
    pub flushed: usize,
}

/// Arrival-ordered buffer of patches for ids not yet tracked.
#[derive(Debug, Clone)]
pub struct PendingPatches {
    config: PendingConfig,
    queue: VecDeque<(Instant, MatchPatch)>,
}

impl PendingPatches {
    pub fn new(config: PendingConfig) -> Self {
        Self {
            config,
            queue: VecDeque::with_capacity(config.capacity.min(64)),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains(&self, match_id: u32) -> bool {
        self.queue.iter().any(|(_, p)| p.match_id == match_id)
    }

    pub fn push(&mut self, patch: MatchPatch, now: Instant) {
        self.expire(now);
        // An identical patch already waiting adds nothing on replay.
        if self
            .queue
            .iter()
            .rev()
            .find(|(_, p)| p.match_id == patch.match_id)
            .is_some_and(|(_, p)| *p == patch)
        {
            return;
        }
        while self.queue.len() >= self.config.capacity.max(1) {
            if let Some((_, evicted)) = self.queue.pop_front() {
                debug!(match_id = evicted.match_id, "pending buffer full, evicting oldest");
            }
        }
        self.queue.push_back((now, patch));
    }

    pub fn expire(&mut self, now: Instant) {
        let max_age = self.config.max_age;
        self.queue
            .retain(|(at, _)| now.saturating_duration_since(*at) <= max_age);
    }

    /// Removes and returns, in arrival order, the patches whose id satisfies
    /// `tracked`.
    fn take_matching(&mut self, tracked: impl Fn(u32) -> bool) -> Vec<MatchPatch> {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.queue.len());
        for (at, patch) in self.queue.drain(..) {
            if tracked(patch.match_id) {
                taken.push(patch);
            } else {
                kept.push_back((at, patch));
            }
        }
        self.queue = kept;
        taken
    }
}

/// Canonical per-match records. Snapshots are authoritative for every field
/// they report; pushes patch only what they carry. Pushes naming an untracked
/// id wait in [`PendingPatches`] for the next snapshot containing it.
#[derive(Debug, Clone)]
pub struct MatchStore {
    records: HashMap<u32, MatchState>,
    // Last listing entry seen per id, before pushes were layered on top.
    baselines: HashMap<u32, MatchState>,
    order: Vec<u32>,
    pending: PendingPatches,
}

impl Default for MatchStore {
    fn default() -> Self {
        Self::new(PendingConfig::default())
    }
}

impl MatchStore {
    pub fn new(pending: PendingConfig) -> Self {
        Self {
            records: HashMap::with_capacity(64),
            baselines: HashMap::with_capacity(64),
            order: Vec::with_capacity(64),
            pending: PendingPatches::new(pending),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_tracked(&self, id: u32) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<&MatchState> {
        self.records.get(&id)
    }

    pub fn pending(&self) -> &PendingPatches {
        &self.pending
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchState> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn matches(&self) -> Vec<MatchState> {
        self.iter().cloned().collect()
    }

    /// Merge a full listing. The listing order becomes the canonical order;
    /// ids absent from it stay tracked behind the listed ones. An entry equal
    /// to the last one listed for its id leaves the record as pushes left it.
    pub fn apply_snapshot(&mut self, snapshot: Vec<MatchState>, now: Instant) -> SnapshotOutcome {
        let mut outcome = SnapshotOutcome::default();
        let mut listed = Vec::with_capacity(snapshot.len());
        let mut seen = HashSet::with_capacity(snapshot.len());

        for mut incoming in snapshot {
            if !seen.insert(incoming.id) {
                continue;
            }
            listed.push(incoming.id);
            incoming.normalize_scores();
            if self.baselines.get(&incoming.id) == Some(&incoming) {
                continue;
            }
            self.baselines.insert(incoming.id, incoming.clone());
            match self.records.get_mut(&incoming.id) {
                Some(existing) => {
                    let merged = merge_baseline(existing, incoming);
                    if *existing != merged {
                        *existing = merged;
                        outcome.changed = true;
                    }
                }
                None => {
                    self.records.insert(incoming.id, incoming);
                    outcome.inserted += 1;
                    outcome.changed = true;
                }
            }
        }

        let mut order = listed;
        for id in &self.order {
            if !seen.contains(id) {
                order.push(*id);
            }
        }
        if order != self.order {
            outcome.changed = true;
            self.order = order;
        }

        self.pending.expire(now);
        let records = &self.records;
        let replay = self.pending.take_matching(|id| records.contains_key(&id));
        for patch in replay {
            if let Some(record) = self.records.get_mut(&patch.match_id)
                && patch_record(record, &advancing_only(record, &patch))
            {
                outcome.flushed += 1;
                outcome.changed = true;
            }
        }

        outcome
    }

    /// Apply a partial update in arrival order.
    pub fn apply_patch(&mut self, patch: MatchPatch, now: Instant) -> MergeOutcome {
        match self.records.get_mut(&patch.match_id) {
            Some(record) => {
                if patch_record(record, &patch) {
                    MergeOutcome::Applied
                } else {
                    MergeOutcome::Unchanged
                }
            }
            None => {
                self.pending.push(patch, now);
                MergeOutcome::Buffered
            }
        }
    }

    /// Attach on-demand detail payloads. Returns false for untracked ids.
    pub fn apply_detail(
        &mut self,
        id: u32,
        timeline: Option<Vec<TimelineEvent>>,
        statistics: Option<MatchStatistics>,
    ) -> bool {
        let Some(record) = self.records.get_mut(&id) else {
            return false;
        };
        if timeline.is_some() {
            record.timeline = timeline;
        }
        if statistics.is_some() {
            record.statistics = statistics;
        }
        true
    }
}

/// Snapshot fields win; detail fields the listing does not carry are kept.
fn merge_baseline(existing: &MatchState, mut incoming: MatchState) -> MatchState {
    if incoming.prediction.is_none() {
        incoming.prediction = existing.prediction;
    }
    if incoming.timeline.is_none() {
        incoming.timeline = existing.timeline.clone();
    }
    if incoming.statistics.is_none() {
        incoming.statistics = existing.statistics.clone();
    }
    if incoming.minute.is_none() && incoming.status == existing.status {
        incoming.minute = existing.minute;
    }
    incoming
}

/// A buffered patch predates the snapshot it is replayed onto, so it may move
/// scores, minute and phase forward but never back.
fn advancing_only(record: &MatchState, patch: &MatchPatch) -> MatchPatch {
    let ahead = |new: Option<u32>, current: Option<u32>| {
        new.filter(|n| current.is_none_or(|c| *n >= c))
    };
    MatchPatch {
        match_id: patch.match_id,
        home_score: ahead(patch.home_score, record.home_score),
        away_score: ahead(patch.away_score, record.away_score),
        minute: patch
            .minute
            .filter(|m| record.minute.is_none_or(|c| *m >= c)),
        status: patch
            .status
            .filter(|s| phase(s.bucket()) >= phase(record.bucket())),
    }
}

fn phase(bucket: Bucket) -> u8 {
    match bucket {
        Bucket::Upcoming => 0,
        Bucket::Live => 1,
        Bucket::Finished => 2,
    }
}

fn patch_record(record: &mut MatchState, patch: &MatchPatch) -> bool {
    let before = record.clone();
    if let Some(score) = patch.home_score {
        record.home_score = Some(score);
    }
    if let Some(score) = patch.away_score {
        record.away_score = Some(score);
    }
    if let Some(minute) = patch.minute {
        record.minute = Some(minute);
    }
    if let Some(status) = patch.status {
        record.status = status;
    }
    record.normalize_scores();
    *record != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MatchStatus, TeamRef};

    fn patch(id: u32, home: u32) -> MatchPatch {
        MatchPatch {
            match_id: id,
            home_score: Some(home),
            ..MatchPatch::default()
        }
    }

    #[test]
    fn pending_evicts_oldest_when_full() {
        let mut pending = PendingPatches::new(PendingConfig {
            capacity: 2,
            max_age: Duration::from_secs(60),
        });
        let now = Instant::now();
        pending.push(patch(1, 1), now);
        pending.push(patch(2, 1), now);
        pending.push(patch(3, 1), now);
        assert_eq!(pending.len(), 2);
        assert!(!pending.contains(1));
        assert!(pending.contains(3));
    }

    #[test]
    fn pending_drops_expired_entries() {
        let mut pending = PendingPatches::new(PendingConfig {
            capacity: 8,
            max_age: Duration::from_secs(10),
        });
        let start = Instant::now();
        pending.push(patch(1, 1), start);
        pending.expire(start + Duration::from_secs(11));
        assert!(pending.is_empty());
    }

    #[test]
    fn replay_only_moves_forward() {
        let mut current = MatchState {
            id: 4,
            status: MatchStatus::Live,
            home: TeamRef {
                id: 10,
                name: "Home".to_string(),
                logo_url: None,
            },
            away: TeamRef {
                id: 22,
                name: "Away".to_string(),
                logo_url: None,
            },
            home_score: Some(2),
            away_score: Some(1),
            minute: Some(70),
            start_time: chrono::Utc::now(),
            league_id: None,
            prediction: None,
            timeline: None,
            statistics: None,
        };
        let older = MatchPatch {
            match_id: 4,
            home_score: Some(1),
            away_score: Some(1),
            minute: Some(55),
            status: Some(MatchStatus::NotStarted),
        };
        assert_eq!(
            advancing_only(&current, &older),
            MatchPatch {
                match_id: 4,
                away_score: Some(1),
                ..MatchPatch::default()
            }
        );
        current.home_score = None;
        current.away_score = None;
        assert_eq!(advancing_only(&current, &older).home_score, Some(1));
    }

    #[test]
    fn pending_ignores_repeat_of_latest_patch() {
        let mut pending = PendingPatches::new(PendingConfig::default());
        let now = Instant::now();
        pending.push(patch(9, 2), now);
        pending.push(patch(9, 2), now);
        assert_eq!(pending.len(), 1);
        pending.push(patch(9, 3), now);
        assert_eq!(pending.len(), 2);
    }
}
