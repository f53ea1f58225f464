use super::{parse_ts, Counter};
use crate::store::ledger::{ActivityRecord, PingRecord};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Start of the trailing window `[now - days, now)`.
pub fn window_start(days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(days)
}

/// Timestamp of a record if it parses and falls inside the window.
/// The lower bound is inclusive, the upper bound exclusive.
fn in_window(raw: &str, start: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    parse_ts(raw).filter(|ts| *ts >= start && *ts < now)
}

/// Messages per UTC calendar date inside the window, ascending by date.
pub fn daily_counts(
    rows: &[ActivityRecord],
    guild_id: &str,
    days: i64,
    now: DateTime<Utc>,
) -> Vec<(NaiveDate, u64)> {
    let start = window_start(days, now);
    let mut per_day: HashMap<NaiveDate, u64> = HashMap::new();
    for row in rows.iter().filter(|r| r.guild_id == guild_id) {
        if let Some(ts) = in_window(&row.timestamp, start, now) {
            *per_day.entry(ts.date_naive()).or_insert(0) += 1;
        }
    }
    let mut series: Vec<(NaiveDate, u64)> = per_day.into_iter().collect();
    series.sort_by_key(|(date, _)| *date);
    series
}

/// Messages per UTC hour of day inside the window. All 24 buckets are
/// present, zero-count hours included.
pub fn hourly_histogram(
    rows: &[ActivityRecord],
    guild_id: &str,
    days: i64,
    now: DateTime<Utc>,
) -> [u64; 24] {
    let start = window_start(days, now);
    let mut buckets = [0u64; 24];
    for row in rows.iter().filter(|r| r.guild_id == guild_id) {
        if let Some(ts) = in_window(&row.timestamp, start, now) {
            buckets[ts.hour() as usize] += 1;
        }
    }
    buckets
}

/// Most active channels inside the window, `(channel_id, count)` descending.
pub fn top_channels(
    rows: &[ActivityRecord],
    guild_id: &str,
    days: i64,
    now: DateTime<Utc>,
    limit: Option<usize>,
) -> Vec<(String, u64)> {
    let start = window_start(days, now);
    let mut counts = Counter::new();
    for row in rows.iter().filter(|r| r.guild_id == guild_id) {
        if in_window(&row.timestamp, start, now).is_some() {
            counts.add(&row.channel_id);
        }
    }
    counts.into_sorted(limit)
}

/// Most active users inside the window, `(user_id, count)` descending.
pub fn top_users(
    rows: &[ActivityRecord],
    guild_id: &str,
    days: i64,
    now: DateTime<Utc>,
    limit: Option<usize>,
) -> Vec<(String, u64)> {
    let start = window_start(days, now);
    let mut counts = Counter::new();
    for row in rows.iter().filter(|r| r.guild_id == guild_id) {
        if in_window(&row.timestamp, start, now).is_some() {
            counts.add(&row.user_id);
        }
    }
    counts.into_sorted(limit)
}

/// Share of message volume held by the most active fraction of users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopShare {
    pub top_users: usize,
    pub total_users: usize,
    pub top_volume: u64,
    pub total_volume: u64,
}

impl TopShare {
    pub fn share(&self) -> f64 {
        if self.total_volume == 0 {
            0.0
        } else {
            self.top_volume as f64 / self.total_volume as f64
        }
    }
}

/// Volume held by the top `fraction` of users (by message count) inside
/// the window. The top group is `ceil(total_users * fraction)` users, at
/// least one. `None` when no user posted in the window.
pub fn top_share(
    rows: &[ActivityRecord],
    guild_id: &str,
    days: i64,
    now: DateTime<Utc>,
    fraction: f64,
) -> Option<TopShare> {
    let per_user = top_users(rows, guild_id, days, now, None);
    if per_user.is_empty() {
        return None;
    }
    let total_users = per_user.len();
    let top = ((total_users as f64 * fraction).ceil() as usize)
        .max(1)
        .min(total_users);
    let total_volume: u64 = per_user.iter().map(|(_, count)| count).sum();
    let top_volume: u64 = per_user.iter().take(top).map(|(_, count)| count).sum();
    Some(TopShare {
        top_users: top,
        total_users,
        top_volume,
        total_volume,
    })
}

/// One user's ping-heaviness inside a window.
#[derive(Debug, Clone, PartialEq)]
pub struct PingRatio {
    pub user_id: String,
    pub pings: u64,
    pub messages: u64,
}

impl PingRatio {
    /// `pings / (pings + messages)`; callers only see nonzero totals.
    pub fn ratio(&self) -> f64 {
        self.pings as f64 / (self.pings + self.messages) as f64
    }
}

/// Users ranked by how much of their output is role pings, descending.
/// Users with no pings and no messages in the window are excluded.
pub fn ping_ratios(
    pings: &[PingRecord],
    messages: &[ActivityRecord],
    guild_id: &str,
    days: i64,
    now: DateTime<Utc>,
) -> Vec<PingRatio> {
    let start = window_start(days, now);
    let mut ping_counts = Counter::new();
    for row in pings.iter().filter(|r| r.guild_id == guild_id) {
        if in_window(&row.timestamp, start, now).is_some() {
            ping_counts.add(&row.user_id);
        }
    }
    let mut message_counts = Counter::new();
    for row in messages.iter().filter(|r| r.guild_id == guild_id) {
        if in_window(&row.timestamp, start, now).is_some() {
            message_counts.add(&row.user_id);
        }
    }

    let mut seen = HashSet::new();
    let mut ratios = Vec::new();
    for (user_id, _) in ping_counts.iter().chain(message_counts.iter()) {
        if !seen.insert(user_id.to_string()) {
            continue;
        }
        ratios.push(PingRatio {
            user_id: user_id.to_string(),
            pings: ping_counts.get(user_id),
            messages: message_counts.get(user_id),
        });
    }
    ratios.sort_by(|a, b| b.ratio().partial_cmp(&a.ratio()).unwrap_or(Ordering::Equal));
    ratios
}

/// Members with no activity inside the window, sorted longest-inactive
/// first. Never-seen members sort as most inactive, with `None` last-seen.
pub fn inactive_users(
    rows: &[ActivityRecord],
    guild_id: &str,
    days: i64,
    now: DateTime<Utc>,
    member_ids: &[String],
) -> Vec<(String, Option<DateTime<Utc>>)> {
    let start = window_start(days, now);
    let mut last_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for row in rows.iter().filter(|r| r.guild_id == guild_id) {
        if let Some(ts) = parse_ts(&row.timestamp) {
            let entry = last_seen.entry(row.user_id.as_str()).or_insert(ts);
            if ts > *entry {
                *entry = ts;
            }
        }
    }

    let mut inactive: Vec<(String, Option<DateTime<Utc>>)> = member_ids
        .iter()
        .filter_map(|member| {
            let last = last_seen.get(member.as_str()).copied();
            match last {
                Some(ts) if ts >= start => None,
                _ => Some((member.clone(), last)),
            }
        })
        .collect();
    // None (never seen) before Some, then oldest last-seen first
    inactive.sort_by(|a, b| match (a.1, b.1) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    });
    inactive
}

/// Most active users inside the window, restricted to the given member
/// set (e.g. the current holders of one role).
pub fn role_activity(
    rows: &[ActivityRecord],
    guild_id: &str,
    days: i64,
    now: DateTime<Utc>,
    member_ids: &HashSet<String>,
    limit: Option<usize>,
) -> Vec<(String, u64)> {
    let start = window_start(days, now);
    let mut counts = Counter::new();
    for row in rows.iter().filter(|r| r.guild_id == guild_id) {
        if !member_ids.contains(&row.user_id) {
            continue;
        }
        if in_window(&row.timestamp, start, now).is_some() {
            counts.add(&row.user_id);
        }
    }
    counts.into_sorted(limit)
}
