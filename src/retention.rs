use crate::stats::parse_ts;
use crate::store::ledger::{Ledger, LedgerRecord};
use crate::store::reactions::ReactionStore;
use crate::store::{StoreError, Stores};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::time::interval;
use tracing::{info, warn};

/// How often the automatic sweep runs. The first run fires at startup.
pub const SWEEP_INTERVAL_HOURS: u64 = 24;

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("retention horizon must be a positive number of days (got {0})")]
    InvalidHorizon(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one cleanup pass over one store. A pass that removes nothing
/// is a successful no-op, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub remaining: usize,
}

fn cutoff_for(days: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>, RetentionError> {
    if days <= 0 {
        return Err(RetentionError::InvalidHorizon(days));
    }
    Ok(now - Duration::days(days))
}

/// Prune ledger entries older than `days`. Records whose timestamps do not
/// parse are dropped as expired. Nothing is rewritten when no record is
/// removed, so a steady-state pass leaves the file byte-identical.
pub fn cleanup_ledger<R: LedgerRecord>(
    ledger: &Ledger<R>,
    days: i64,
) -> Result<CleanupReport, RetentionError> {
    cleanup_ledger_at(ledger, days, Utc::now())
}

pub fn cleanup_ledger_at<R: LedgerRecord>(
    ledger: &Ledger<R>,
    days: i64,
    now: DateTime<Utc>,
) -> Result<CleanupReport, RetentionError> {
    let cutoff = cutoff_for(days, now)?;
    if !ledger.exists() {
        return Ok(CleanupReport {
            removed: 0,
            remaining: 0,
        });
    }
    let (removed, remaining) = ledger.retain(|record| {
        parse_ts(record.timestamp()).map_or(false, |ts| ts >= cutoff)
    })?;
    Ok(CleanupReport { removed, remaining })
}

/// Prune one guild's reaction stream with the same horizon semantics.
pub fn cleanup_reactions(
    store: &ReactionStore,
    guild_id: &str,
    days: i64,
) -> Result<CleanupReport, RetentionError> {
    cleanup_reactions_at(store, guild_id, days, Utc::now())
}

pub fn cleanup_reactions_at(
    store: &ReactionStore,
    guild_id: &str,
    days: i64,
    now: DateTime<Utc>,
) -> Result<CleanupReport, RetentionError> {
    let cutoff = cutoff_for(days, now)?;
    if !store.exists(guild_id) {
        return Ok(CleanupReport {
            removed: 0,
            remaining: 0,
        });
    }
    let (removed, remaining) =
        store.retain(guild_id, |record| {
            parse_ts(&record.timestamp).map_or(false, |ts| ts >= cutoff)
        })?;
    Ok(CleanupReport { removed, remaining })
}

/// One pass over every store: both shared CSV ledgers and each guild's
/// reaction stream found on disk.
pub fn sweep(stores: &Stores, days: i64) -> Result<(), RetentionError> {
    let pings = cleanup_ledger(&stores.pings, days)?;
    info!(
        "Retention: pings removed {}, {} remain",
        pings.removed, pings.remaining
    );
    let activity = cleanup_ledger(&stores.activity, days)?;
    info!(
        "Retention: activity removed {}, {} remain",
        activity.removed, activity.remaining
    );
    for guild_id in stores.reactions.guild_ids()? {
        match cleanup_reactions(&stores.reactions, &guild_id, days) {
            Ok(report) => info!(
                "Retention: guild {} reactions removed {}, {} remain",
                guild_id, report.removed, report.remaining
            ),
            Err(e) => warn!("Retention failed for guild {} reactions: {}", guild_id, e),
        }
    }
    Ok(())
}

/// Long-lived task: sweep immediately, then every [`SWEEP_INTERVAL_HOURS`].
pub async fn start_retention_task(stores: Stores, days: i64) {
    info!(
        "Starting retention task (horizon {} days, every {}h)",
        days, SWEEP_INTERVAL_HOURS
    );
    let mut ticker = interval(std::time::Duration::from_secs(SWEEP_INTERVAL_HOURS * 3600));
    loop {
        ticker.tick().await;
        if let Err(e) = sweep(&stores, days) {
            warn!("Retention sweep failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ledger::PingRecord;
    use crate::store::reactions::ReactionRecord;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn ping_aged(days: i64, now: DateTime<Utc>) -> PingRecord {
        PingRecord {
            guild_id: "g1".to_string(),
            role_id: "r1".to_string(),
            user_id: format!("u{days}"),
            channel_id: "c1".to_string(),
            timestamp: (now - Duration::days(days)).to_rfc3339(),
        }
    }

    #[test]
    fn test_cleanup_removes_only_expired_records() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));
        let now = fixed_now();

        for age in [5, 29, 30, 31, 60] {
            ledger.append(&ping_aged(age, now)).unwrap();
        }

        let report = cleanup_ledger_at(&ledger, 30, now).unwrap();
        assert_eq!(report, CleanupReport { removed: 2, remaining: 3 });

        let survivors: Vec<String> = ledger
            .read_all()
            .unwrap()
            .into_iter()
            .map(|r| r.user_id)
            .collect();
        assert_eq!(survivors, vec!["u5", "u29", "u30"]);

        // Immediate second pass is a no-op and leaves the file byte-identical
        let before = fs::read(ledger.path()).unwrap();
        let report = cleanup_ledger_at(&ledger, 30, now).unwrap();
        assert_eq!(report, CleanupReport { removed: 0, remaining: 3 });
        assert_eq!(fs::read(ledger.path()).unwrap(), before);
    }

    #[test]
    fn test_unparsable_timestamps_dropped_as_expired() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));
        let now = fixed_now();

        ledger.append(&ping_aged(1, now)).unwrap();
        ledger
            .append(&PingRecord {
                guild_id: "g1".to_string(),
                role_id: "r1".to_string(),
                user_id: "broken".to_string(),
                channel_id: "c1".to_string(),
                timestamp: "yesterday-ish".to_string(),
            })
            .unwrap();

        let report = cleanup_ledger_at(&ledger, 30, now).unwrap();
        assert_eq!(report, CleanupReport { removed: 1, remaining: 1 });
        assert_eq!(ledger.read_all().unwrap()[0].user_id, "u1");
    }

    #[test]
    fn test_non_positive_horizon_rejected() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));
        let now = fixed_now();
        ledger.append(&ping_aged(5, now)).unwrap();

        for days in [0, -3] {
            let err = cleanup_ledger_at(&ledger, days, now).unwrap_err();
            assert!(matches!(err, RetentionError::InvalidHorizon(d) if d == days));
        }
        // Nothing was deleted
        assert_eq!(ledger.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_store_is_a_noop() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));

        let report = cleanup_ledger_at(&ledger, 30, fixed_now()).unwrap();
        assert_eq!(report, CleanupReport { removed: 0, remaining: 0 });
        assert!(!ledger.exists());
    }

    #[test]
    fn test_reaction_cleanup_missing_store_is_a_noop() {
        let dir = tempdir().unwrap();
        let store = ReactionStore::new(dir.path());

        let report = cleanup_reactions_at(&store, "g1", 30, fixed_now()).unwrap();
        assert_eq!(report, CleanupReport { removed: 0, remaining: 0 });
        // The cleanup must not materialize an empty store as a side effect
        assert!(!store.exists("g1"));
        assert!(store.guild_ids().unwrap().is_empty());
    }

    #[test]
    fn test_reaction_cleanup() {
        let dir = tempdir().unwrap();
        let store = ReactionStore::new(dir.path());
        let now = fixed_now();

        let mut fresh = ReactionRecord::new("m1", "u1", "👍");
        fresh.timestamp = (now - Duration::days(2)).to_rfc3339();
        let mut stale = ReactionRecord::new("m2", "u2", "👍");
        stale.timestamp = (now - Duration::days(45)).to_rfc3339();
        store.append("g1", &fresh).unwrap();
        store.append("g1", &stale).unwrap();

        let report = cleanup_reactions_at(&store, "g1", 30, now).unwrap();
        assert_eq!(report, CleanupReport { removed: 1, remaining: 1 });
        let left = store.read_all("g1").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message_id, "m1");
    }
}
