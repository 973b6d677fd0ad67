//! Temporal scan and reduction over time-ordered item collections.
//!
//! All reductions exploit the API's sort-order guarantees where they exist:
//! creation-windowed counts and closed-lifetime averages early-exit at the
//! first item older than the cutoff, while staleness and open-lifetime scans
//! walk the whole collection because no `updated_at` ordering is guaranteed.
//! Durations are total seconds floor-divided into minutes, never rounded.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::model::{CloseSortedDesc, CreationSortedDesc, Item};

/// Summary statistics for one lifetime reduction.
///
/// A zero `count` with a zero `average_minutes` is the "no activity" signal,
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifetimeStats {
    /// Items that entered the reduction.
    pub count:                u64,
    /// Floor average lifetime in minutes, 0 when `count` is 0.
    pub average_minutes:      i64,
    /// Subset of `count` authored by team members.
    pub team_count:           u64,
    /// Floor average over the team subset, 0 when `team_count` is 0.
    pub team_average_minutes: i64
}

/// Set of team-member logins used to partition reductions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamRoster {
    logins: BTreeSet<String>
}

impl TeamRoster {
    /// Builds a roster from an iterator of logins.
    pub fn new<I, S>(logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        Self {
            logins: logins.into_iter().map(Into::into).collect()
        }
    }

    /// Returns whether the login belongs to the roster.
    pub fn contains(&self, login: &str) -> bool {
        self.logins.contains(login)
    }

    /// Returns whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }
}

/// Floor duration between two instants in whole minutes.
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().div_euclid(60)
}

/// Counts items created within the last `days` days, partitioned by team
/// membership.
///
/// Precondition: `items` is sorted by `created_at` descending; iteration
/// stops at the first item older than the cutoff because everything after it
/// is guaranteed older still. An unsorted input silently under- or
/// over-counts.
pub fn count_created_within(
    items: &CreationSortedDesc,
    days: i64,
    team: &TeamRoster,
    now: DateTime<Utc>
) -> (u64, u64) {
    let cutoff = now - Duration::days(days);
    let mut total = 0;
    let mut team_total = 0;

    for item in items.items() {
        if item.created_at < cutoff {
            break;
        }
        total += 1;
        if team.contains(item.reporter()) {
            team_total += 1;
        }
    }

    (total, team_total)
}

/// Collects items not updated within the last `days` days.
///
/// No ordering by `updated_at` is guaranteed, so the whole collection is
/// scanned.
pub fn stale_items<'a>(
    items: &'a [Item],
    days: i64,
    now: DateTime<Utc>
) -> Vec<&'a Item> {
    let cutoff = now - Duration::days(days);
    items.iter().filter(|item| item.updated_at < cutoff).collect()
}

/// Counts items with no assignee.
pub fn count_unassigned(items: &[Item]) -> u64 {
    items.iter().filter(|item| item.assignee.is_none()).count() as u64
}

/// Reduces closed items into lifetime statistics over the last `days` days.
///
/// Precondition: `items` is sorted by `closed_at` descending; iteration stops
/// at the first item closed before the cutoff. Lifetime is `closed_at -
/// created_at` floored to minutes; items with no recorded close time are
/// skipped.
pub fn closed_lifetime(
    items: &CloseSortedDesc,
    days: i64,
    team: &TeamRoster,
    now: DateTime<Utc>
) -> LifetimeStats {
    let cutoff = now - Duration::days(days);
    let mut acc = LifetimeAccumulator::default();

    for item in items.items() {
        let Some(closed_at) = item.closed_at else {
            continue;
        };
        if closed_at < cutoff {
            break;
        }
        acc.record(minutes_between(item.created_at, closed_at), team.contains(item.reporter()));
    }

    acc.finish()
}

/// Reduces open items into lifetime statistics.
///
/// `updated_at` stands in for the close time and every item is scanned: open
/// collections carry no close-ordering guarantee, so there is no early exit.
pub fn open_lifetime(items: &[Item], team: &TeamRoster) -> LifetimeStats {
    let mut acc = LifetimeAccumulator::default();

    for item in items {
        acc.record(minutes_between(item.created_at, item.updated_at), team.contains(item.reporter()));
    }

    acc.finish()
}

#[derive(Debug, Default)]
struct LifetimeAccumulator {
    count:        u64,
    minutes:      i64,
    team_count:   u64,
    team_minutes: i64
}

impl LifetimeAccumulator {
    fn record(&mut self, minutes: i64, team_authored: bool) {
        self.count += 1;
        self.minutes += minutes;
        if team_authored {
            self.team_count += 1;
            self.team_minutes += minutes;
        }
    }

    fn finish(self) -> LifetimeStats {
        LifetimeStats {
            count:                self.count,
            average_minutes:      floor_average(self.minutes, self.count),
            team_count:           self.team_count,
            team_average_minutes: floor_average(self.team_minutes, self.team_count)
        }
    }
}

fn floor_average(minutes: i64, count: u64) -> i64 {
    if count == 0 {
        0
    } else {
        minutes.div_euclid(count as i64)
    }
}
