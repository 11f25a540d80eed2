use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone};

use crate::state::{Bucket, MatchState};

/// Which slice of the canonical set a view is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewContext {
    pub league: Option<u32>,
    pub bucket: Bucket,
}

impl Default for ViewContext {
    fn default() -> Self {
        Self {
            league: None,
            bucket: Bucket::Live,
        }
    }
}

impl ViewContext {
    pub fn new(league: Option<u32>, bucket: Bucket) -> Self {
        Self { league, bucket }
    }

    /// Records without a league id are shown under every league filter.
    pub fn admits(&self, m: &MatchState) -> bool {
        let league_ok = match (self.league, m.league_id) {
            (Some(want), Some(have)) => want == have,
            _ => true,
        };
        league_ok && self.bucket.contains(m.status)
    }
}

pub fn filter_matches<'a>(
    matches: impl IntoIterator<Item = &'a MatchState>,
    ctx: &ViewContext,
) -> Vec<&'a MatchState> {
    matches.into_iter().filter(|m| ctx.admits(m)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounts {
    pub live: usize,
    pub upcoming: usize,
    pub finished: usize,
}

impl BucketCounts {
    pub fn get(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Live => self.live,
            Bucket::Upcoming => self.upcoming,
            Bucket::Finished => self.finished,
        }
    }

    pub fn total(&self) -> usize {
        self.live + self.upcoming + self.finished
    }
}

pub fn bucket_counts<'a>(
    matches: impl IntoIterator<Item = &'a MatchState>,
    league: Option<u32>,
) -> BucketCounts {
    let mut counts = BucketCounts::default();
    for m in matches {
        if let (Some(want), Some(have)) = (league, m.league_id)
            && want != have
        {
            continue;
        }
        match m.bucket() {
            Bucket::Live => counts.live += 1,
            Bucket::Upcoming => counts.upcoming += 1,
            Bucket::Finished => counts.finished += 1,
        }
    }
    counts
}

/// Live when anything is being played, otherwise upcoming.
pub fn default_bucket<'a>(matches: impl IntoIterator<Item = &'a MatchState>) -> Bucket {
    if matches.into_iter().any(|m| m.is_live()) {
        Bucket::Live
    } else {
        Bucket::Upcoming
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateGroup {
    pub date: NaiveDate,
    /// `YYYY-MM-DD`, stable across locales.
    pub key: String,
    /// e.g. `Saturday, May 4, 2024`.
    pub label: String,
    pub matches: Vec<MatchState>,
}

/// Group by calendar date in `tz`. Groups run oldest first, except for the
/// finished bucket which runs newest first; matches inside a group follow the
/// same direction by kickoff.
pub fn group_by_date<Tz: TimeZone>(
    matches: Vec<MatchState>,
    bucket: Bucket,
    tz: &Tz,
) -> Vec<DateGroup> {
    let mut by_date: BTreeMap<NaiveDate, Vec<MatchState>> = BTreeMap::new();
    for m in matches {
        let date = m.start_time.with_timezone(tz).date_naive();
        by_date.entry(date).or_default().push(m);
    }

    let newest_first = bucket == Bucket::Finished;
    let mut groups: Vec<DateGroup> = by_date
        .into_iter()
        .map(|(date, mut matches)| {
            matches.sort_by(|a, b| {
                let ord = a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id));
                if newest_first { ord.reverse() } else { ord }
            });
            DateGroup {
                date,
                key: date.format("%Y-%m-%d").to_string(),
                label: date.format("%A, %B %-d, %Y").to_string(),
                matches,
            }
        })
        .collect();
    if newest_first {
        groups.reverse();
    }
    groups
}
