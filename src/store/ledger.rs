use super::StoreError;
use chrono::{SecondsFormat, Utc};
use csv::WriterBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A record kind stored in one CSV ledger.
pub trait LedgerRecord: Serialize + DeserializeOwned {
    /// Canonical header row; must match the struct's field order.
    const HEADERS: &'static [&'static str];
    fn timestamp(&self) -> &str;
}

/// One role-mention occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRecord {
    pub guild_id: String,
    pub role_id: String,
    pub user_id: String,
    pub channel_id: String,
    pub timestamp: String,
}

impl PingRecord {
    pub fn new(guild_id: &str, role_id: &str, user_id: &str, channel_id: &str) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            role_id: role_id.to_string(),
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            timestamp: now_iso(),
        }
    }
}

impl LedgerRecord for PingRecord {
    const HEADERS: &'static [&'static str] =
        &["guild_id", "role_id", "user_id", "channel_id", "timestamp"];

    fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// One qualifying guild message, regardless of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub guild_id: String,
    pub user_id: String,
    pub channel_id: String,
    pub timestamp: String,
}

impl ActivityRecord {
    pub fn new(guild_id: &str, user_id: &str, channel_id: &str) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            timestamp: now_iso(),
        }
    }
}

impl LedgerRecord for ActivityRecord {
    const HEADERS: &'static [&'static str] = &["guild_id", "user_id", "channel_id", "timestamp"];

    fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Append-only flat CSV store for one event stream.
///
/// Rows are immutable once appended; the only mutations are `rewrite`
/// (retention/reset, whole-file replace) and `append`.
#[derive(Clone)]
pub struct Ledger<R> {
    path: PathBuf,
    _record: PhantomData<R>,
}

impl<R: LedgerRecord> Ledger<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the backing file with its header row if it is absent or
    /// empty. Never touches existing content.
    pub fn ensure(&self) -> Result<(), StoreError> {
        let needs_init = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if !needs_init {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;
        writer.write_record(R::HEADERS)?;
        writer.flush()?;
        Ok(())
    }

    /// Durably add one record at the end of the stream.
    pub fn append(&self, record: &R) -> Result<(), StoreError> {
        self.ensure()?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    /// Every record in append order. A row that fails to decode is skipped
    /// with a warning; it never aborts the scan.
    pub fn read_all(&self) -> Result<Vec<R>, StoreError> {
        self.ensure()?;
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            match row {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed row in {:?}: {}", self.path, e),
            }
        }
        Ok(records)
    }

    /// Replace the entire contents with exactly `records`. Written to a
    /// temp file and renamed into place so readers never observe a
    /// partially written store.
    pub fn rewrite(&self, records: &[R]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = WriterBuilder::new().has_headers(false).from_path(&tmp)?;
            writer.write_record(R::HEADERS)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Keep only records matching `keep`; returns `(removed, remaining)`.
    /// When nothing is removed, the file is left untouched.
    pub fn retain<F>(&self, keep: F) -> Result<(usize, usize), StoreError>
    where
        F: Fn(&R) -> bool,
    {
        let records = self.read_all()?;
        let original = records.len();
        let survivors: Vec<R> = records.into_iter().filter(|r| keep(r)).collect();
        let removed = original - survivors.len();
        if removed > 0 {
            self.rewrite(&survivors)?;
        }
        Ok((removed, survivors.len()))
    }
}

impl Ledger<PingRecord> {
    /// Drop every ping recorded for one role in one guild.
    pub fn reset_role(&self, guild_id: &str, role_id: &str) -> Result<usize, StoreError> {
        self.retain(|r| !(r.guild_id == guild_id && r.role_id == role_id))
            .map(|(removed, _)| removed)
    }

    /// Drop every ping recorded for one user in one guild.
    pub fn reset_user(&self, guild_id: &str, user_id: &str) -> Result<usize, StoreError> {
        self.retain(|r| !(r.guild_id == guild_id && r.user_id == user_id))
            .map(|(removed, _)| removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn ping(guild: &str, role: &str, user: &str) -> PingRecord {
        PingRecord::new(guild, role, user, "chan1")
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));

        ledger.ensure().unwrap();
        let header_only = fs::read(ledger.path()).unwrap();
        assert_eq!(
            String::from_utf8(header_only.clone()).unwrap().trim(),
            "guild_id,role_id,user_id,channel_id,timestamp"
        );

        ledger.ensure().unwrap();
        assert_eq!(fs::read(ledger.path()).unwrap(), header_only);

        // Must not clobber existing data either
        ledger.append(&ping("g1", "r1", "u1")).unwrap();
        let with_data = fs::read(ledger.path()).unwrap();
        ledger.ensure().unwrap();
        assert_eq!(fs::read(ledger.path()).unwrap(), with_data);
    }

    #[test]
    fn test_append_round_trip_in_order() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));

        let records = vec![
            ping("111", "222", "333"),
            ping("555", "666", "777"),
            ping("111", "222", "999"),
        ];
        for record in &records {
            ledger.append(record).unwrap();
        }

        assert_eq!(ledger.read_all().unwrap(), records);
    }

    #[test]
    fn test_missing_store_reads_as_empty() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<ActivityRecord> = Ledger::new(dir.path().join("activity_messages.csv"));

        assert!(!ledger.exists());
        assert!(ledger.read_all().unwrap().is_empty());
        assert!(ledger.exists());
    }

    #[test]
    fn test_malformed_row_is_skipped() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));

        ledger.append(&ping("g1", "r1", "u1")).unwrap();
        let mut file = OpenOptions::new().append(true).open(ledger.path()).unwrap();
        writeln!(file, "only,two").unwrap();
        drop(file);
        ledger.append(&ping("g1", "r1", "u2")).unwrap();

        let rows = ledger.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, "u1");
        assert_eq!(rows[1].user_id, "u2");
    }

    #[test]
    fn test_reset_role_scoping() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));

        ledger.append(&ping("g1", "r1", "u1")).unwrap();
        ledger.append(&ping("g1", "r1", "u2")).unwrap();
        ledger.append(&ping("g1", "r2", "u1")).unwrap();
        // Same role id in a different guild must survive
        ledger.append(&ping("g2", "r1", "u1")).unwrap();

        let removed = ledger.reset_role("g1", "r1").unwrap();
        assert_eq!(removed, 2);

        let rows = ledger.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|r| !(r.guild_id == "g1" && r.role_id == "r1")));
        assert!(rows.iter().any(|r| r.guild_id == "g2" && r.role_id == "r1"));
    }

    #[test]
    fn test_reset_user_scoping() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));

        ledger.append(&ping("g1", "r1", "u1")).unwrap();
        ledger.append(&ping("g1", "r2", "u1")).unwrap();
        ledger.append(&ping("g1", "r1", "u2")).unwrap();

        let removed = ledger.reset_user("g1", "u1").unwrap();
        assert_eq!(removed, 2);

        let rows = ledger.read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "u2");
    }

    #[test]
    fn test_retain_skips_rewrite_when_nothing_removed() {
        let dir = tempdir().unwrap();
        let ledger: Ledger<PingRecord> = Ledger::new(dir.path().join("role_pings.csv"));

        ledger.append(&ping("g1", "r1", "u1")).unwrap();
        let before = fs::read(ledger.path()).unwrap();

        let (removed, remaining) = ledger.retain(|_| true).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(remaining, 1);
        assert_eq!(fs::read(ledger.path()).unwrap(), before);
    }
}
