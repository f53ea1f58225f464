pub mod activity;
pub mod rank;

use crate::store::ledger::PingRecord;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;

/// Parse a stored timestamp, accepting both RFC 3339 and timezone-naive
/// ISO-8601 forms. Naive values are interpreted as UTC.
pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Occurrence counter that remembers first-seen order, so that sorting by
/// count descending breaks ties in insertion order.
#[derive(Debug, Default)]
pub struct Counter {
    counts: HashMap<String, u64>,
    order: Vec<String>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str) {
        self.add_n(key, 1);
    }

    pub fn add_n(&mut self, key: &str, n: u64) {
        match self.counts.get_mut(key) {
            Some(count) => *count += n,
            None => {
                self.counts.insert(key.to_string(), n);
                self.order.push(key.to_string());
            }
        }
    }

    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.order.iter().map(|key| (key.as_str(), self.counts[key]))
    }

    /// Entries sorted by count descending; ties keep first-seen order.
    /// `limit` of `None` returns every distinct key.
    pub fn into_sorted(self, limit: Option<usize>) -> Vec<(String, u64)> {
        let counts = self.counts;
        let mut entries: Vec<(String, u64)> = self
            .order
            .into_iter()
            .map(|key| {
                let count = counts[&key];
                (key, count)
            })
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        entries
    }
}

/// Top users who pinged one role, `(user_id, count)` by count descending.
pub fn top_for_role(
    rows: &[PingRecord],
    guild_id: &str,
    role_id: &str,
    limit: Option<usize>,
) -> Vec<(String, u64)> {
    let mut counts = Counter::new();
    for row in rows
        .iter()
        .filter(|r| r.guild_id == guild_id && r.role_id == role_id)
    {
        counts.add(&row.user_id);
    }
    counts.into_sorted(limit)
}

/// Every role one user has pinged, `(role_id, count)` by count descending.
pub fn counts_for_user(rows: &[PingRecord], guild_id: &str, user_id: &str) -> Vec<(String, u64)> {
    let mut counts = Counter::new();
    for row in rows
        .iter()
        .filter(|r| r.guild_id == guild_id && r.user_id == user_id)
    {
        counts.add(&row.role_id);
    }
    counts.into_sorted(None)
}

/// One role's slice of the server-wide leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBoard {
    pub role_id: String,
    pub total: u64,
    pub top_users: Vec<(String, u64)>,
}

/// Roles by total ping count descending, each with its own top pingers.
pub fn role_leaderboard(rows: &[PingRecord], guild_id: &str, per_role_users: usize) -> Vec<RoleBoard> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Counter> = HashMap::new();
    for row in rows.iter().filter(|r| r.guild_id == guild_id) {
        groups
            .entry(row.role_id.clone())
            .or_insert_with(|| {
                order.push(row.role_id.clone());
                Counter::new()
            })
            .add(&row.user_id);
    }

    let mut boards: Vec<RoleBoard> = order
        .into_iter()
        .map(|role_id| {
            let counter = groups.remove(&role_id).unwrap_or_default();
            RoleBoard {
                total: counter.total(),
                top_users: counter.into_sorted(Some(per_role_users)),
                role_id,
            }
        })
        .collect();
    boards.sort_by(|a, b| b.total.cmp(&a.total));
    boards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ledger::Ledger;
    use chrono::Timelike;
    use tempfile::tempdir;

    fn ping(guild: &str, role: &str, user: &str) -> PingRecord {
        PingRecord::new(guild, role, user, "chan1")
    }

    #[test]
    fn test_parse_ts_forms() {
        let aware = parse_ts("2025-01-20T12:00:00+00:00").unwrap();
        assert_eq!(aware.hour(), 12);

        let zulu = parse_ts("2025-01-20T12:00:00Z").unwrap();
        assert_eq!(zulu, aware);

        // Offset timestamps normalize to UTC
        let offset = parse_ts("2025-01-20T14:00:00+02:00").unwrap();
        assert_eq!(offset, aware);

        // Naive timestamps are taken as UTC, fractional seconds included
        let naive = parse_ts("2025-01-20T12:00:00.123456").unwrap();
        assert_eq!(naive.hour(), 12);

        assert!(parse_ts("not-a-timestamp").is_none());
        assert!(parse_ts("").is_none());
    }

    #[test]
    fn test_top_for_role_stable_tie_break() {
        // A and B tie at 3; A was seen first and must stay first
        let rows: Vec<PingRecord> = ["A", "A", "A", "B", "B", "B", "C"]
            .iter()
            .map(|user| ping("g1", "r1", user))
            .collect();

        let top = top_for_role(&rows, "g1", "r1", Some(2));
        assert_eq!(top, vec![("A".to_string(), 3), ("B".to_string(), 3)]);

        let all = top_for_role(&rows, "g1", "r1", None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2], ("C".to_string(), 1));
    }

    #[test]
    fn test_top_for_role_filters_guild_and_role() {
        let rows = vec![
            ping("g1", "r1", "u1"),
            ping("g1", "r2", "u1"),
            ping("g2", "r1", "u1"),
        ];
        assert_eq!(top_for_role(&rows, "g1", "r1", None).len(), 1);
        assert!(top_for_role(&rows, "g3", "r1", None).is_empty());
    }

    #[test]
    fn test_role_leaderboard_ordering() {
        let mut rows = Vec::new();
        // r1: 3 pings (u1 x2, u2 x1); r2: 5 pings (u3 x5)
        rows.push(ping("g1", "r1", "u1"));
        rows.push(ping("g1", "r1", "u1"));
        rows.push(ping("g1", "r1", "u2"));
        for _ in 0..5 {
            rows.push(ping("g1", "r2", "u3"));
        }
        rows.push(ping("g2", "r9", "u9"));

        let boards = role_leaderboard(&rows, "g1", 3);
        assert_eq!(boards.len(), 2);
        assert_eq!(boards[0].role_id, "r2");
        assert_eq!(boards[0].total, 5);
        assert_eq!(boards[1].role_id, "r1");
        assert_eq!(boards[1].total, 3);
        assert_eq!(
            boards[1].top_users,
            vec![("u1".to_string(), 2), ("u2".to_string(), 1)]
        );
    }

    #[test]
    fn test_end_to_end_counts_through_ledger() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));

        for _ in 0..3 {
            ledger.append(&ping("1", "10", "u1")).unwrap();
        }
        for _ in 0..2 {
            ledger.append(&ping("1", "10", "u2")).unwrap();
        }
        ledger.append(&ping("1", "10", "u3")).unwrap();
        ledger.append(&ping("1", "20", "u1")).unwrap();

        let rows = ledger.read_all().unwrap();
        assert_eq!(
            top_for_role(&rows, "1", "10", Some(10)),
            vec![
                ("u1".to_string(), 3),
                ("u2".to_string(), 2),
                ("u3".to_string(), 1)
            ]
        );
        assert_eq!(
            counts_for_user(&rows, "1", "u1"),
            vec![("10".to_string(), 3), ("20".to_string(), 1)]
        );
    }
}
