use super::StoreError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Upper bound on monitored roles per guild.
pub const MAX_RANK_ROLES: usize = 5;

/// One reaction to a message classified as spoiler content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub timestamp: String,
}

impl ReactionRecord {
    pub fn new(message_id: &str, user_id: &str, emoji: &str) -> Self {
        Self {
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
            emoji: emoji.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReactionDocument {
    reactions: Vec<ReactionRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RankRoleDocument {
    rank_roles: Vec<String>,
}

/// Per-guild JSON stores: one reaction stream and one rank-role config
/// document per guild, under `<base>/stats/<guild>.json` and
/// `<base>/configs/<guild>.json`.
#[derive(Clone)]
pub struct ReactionStore {
    stats_dir: PathBuf,
    configs_dir: PathBuf,
}

impl ReactionStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let base = base_dir.as_ref();
        Self {
            stats_dir: base.join("stats"),
            configs_dir: base.join("configs"),
        }
    }

    fn stats_path(&self, guild_id: &str) -> PathBuf {
        self.stats_dir.join(format!("{guild_id}.json"))
    }

    fn config_path(&self, guild_id: &str) -> PathBuf {
        self.configs_dir.join(format!("{guild_id}.json"))
    }

    /// Whether the guild has a reaction stream on disk.
    pub fn exists(&self, guild_id: &str) -> bool {
        self.stats_path(guild_id).exists()
    }

    /// Create the guild's reaction document if it does not exist yet.
    pub fn ensure(&self, guild_id: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.stats_dir)?;
        let path = self.stats_path(guild_id);
        if !path.exists() {
            write_json(&path, &ReactionDocument::default())?;
        }
        Ok(())
    }

    fn load(&self, guild_id: &str) -> Result<ReactionDocument, StoreError> {
        self.ensure(guild_id)?;
        let raw = fs::read_to_string(self.stats_path(guild_id))?;
        match serde_json::from_str(&raw) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(
                    "Reaction store for guild {} is unreadable, treating as empty: {}",
                    guild_id, e
                );
                Ok(ReactionDocument::default())
            }
        }
    }

    pub fn append(&self, guild_id: &str, record: &ReactionRecord) -> Result<(), StoreError> {
        let mut doc = self.load(guild_id)?;
        doc.reactions.push(record.clone());
        write_json(&self.stats_path(guild_id), &doc)
    }

    pub fn read_all(&self, guild_id: &str) -> Result<Vec<ReactionRecord>, StoreError> {
        self.load(guild_id).map(|doc| doc.reactions)
    }

    /// Keep only records matching `keep`; returns `(removed, remaining)`.
    /// When nothing is removed, the file is left untouched.
    pub fn retain<F>(&self, guild_id: &str, keep: F) -> Result<(usize, usize), StoreError>
    where
        F: Fn(&ReactionRecord) -> bool,
    {
        let doc = self.load(guild_id)?;
        let original = doc.reactions.len();
        let survivors: Vec<ReactionRecord> = doc.reactions.into_iter().filter(|r| keep(r)).collect();
        let removed = original - survivors.len();
        let remaining = survivors.len();
        if removed > 0 {
            write_json(
                &self.stats_path(guild_id),
                &ReactionDocument {
                    reactions: survivors,
                },
            )?;
        }
        Ok((removed, remaining))
    }

    /// Drop the guild's entire reaction stream. Returns whether a store
    /// existed in the first place.
    pub fn reset(&self, guild_id: &str) -> Result<bool, StoreError> {
        let path = self.stats_path(guild_id);
        if path.exists() {
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Guilds with a reaction stream on disk.
    pub fn guild_ids(&self) -> Result<Vec<String>, StoreError> {
        if !self.stats_dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.stats_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Monitored roles for reaction ranking, at most [`MAX_RANK_ROLES`].
    /// Missing or unreadable config reads as empty.
    pub fn load_rank_roles(&self, guild_id: &str) -> Result<Vec<String>, StoreError> {
        let path = self.config_path(guild_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(path)?;
        let mut doc: RankRoleDocument = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "Rank-role config for guild {} is unreadable, treating as empty: {}",
                    guild_id, e
                );
                RankRoleDocument::default()
            }
        };
        doc.rank_roles.truncate(MAX_RANK_ROLES);
        Ok(doc.rank_roles)
    }

    /// Overwrite the guild's monitored roles, truncated to [`MAX_RANK_ROLES`].
    pub fn save_rank_roles(&self, guild_id: &str, roles: &[String]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.configs_dir)?;
        let mut rank_roles = roles.to_vec();
        rank_roles.truncate(MAX_RANK_ROLES);
        write_json(&self.config_path(guild_id), &RankRoleDocument { rank_roles })
    }
}

/// Serialize to a temp file and rename into place so readers never observe
/// a partially written document.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_creates_empty_document() {
        let dir = tempdir().unwrap();
        let store = ReactionStore::new(dir.path());

        store.ensure("guild1").unwrap();
        let raw = fs::read_to_string(dir.path().join("stats/guild1.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["reactions"], serde_json::json!([]));

        assert!(store.read_all("guild1").unwrap().is_empty());
    }

    #[test]
    fn test_append_and_read_all() {
        let dir = tempdir().unwrap();
        let store = ReactionStore::new(dir.path());

        for i in 0..5 {
            store
                .append(
                    "guild1",
                    &ReactionRecord::new(&format!("msg{i}"), &format!("user{i}"), "🎉"),
                )
                .unwrap();
        }

        let reactions = store.read_all("guild1").unwrap();
        assert_eq!(reactions.len(), 5);
        assert_eq!(reactions[0].message_id, "msg0");
        assert_eq!(reactions[4].user_id, "user4");
        assert!(reactions.iter().all(|r| r.emoji == "🎉"));
    }

    #[test]
    fn test_guild_stores_are_isolated() {
        let dir = tempdir().unwrap();
        let store = ReactionStore::new(dir.path());

        store
            .append("guild1", &ReactionRecord::new("m1", "u1", "👍"))
            .unwrap();
        store
            .append("guild2", &ReactionRecord::new("m2", "u2", "👍"))
            .unwrap();

        assert_eq!(store.read_all("guild1").unwrap().len(), 1);
        assert_eq!(store.read_all("guild2").unwrap().len(), 1);
        assert_eq!(store.guild_ids().unwrap(), vec!["guild1", "guild2"]);
    }

    #[test]
    fn test_reset_drops_store() {
        let dir = tempdir().unwrap();
        let store = ReactionStore::new(dir.path());

        store
            .append("guild1", &ReactionRecord::new("m1", "u1", "👍"))
            .unwrap();
        assert!(store.reset("guild1").unwrap());
        assert!(!store.reset("guild1").unwrap());
        assert!(store.read_all("guild1").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = ReactionStore::new(dir.path());

        fs::create_dir_all(dir.path().join("stats")).unwrap();
        fs::write(dir.path().join("stats/guild1.json"), "{not json").unwrap();
        assert!(store.read_all("guild1").unwrap().is_empty());
    }

    #[test]
    fn test_rank_roles_round_trip_and_cap() {
        let dir = tempdir().unwrap();
        let store = ReactionStore::new(dir.path());

        assert!(store.load_rank_roles("guild1").unwrap().is_empty());

        let six: Vec<String> = (1..=6).map(|i| format!("role{i}")).collect();
        store.save_rank_roles("guild1", &six).unwrap();

        let loaded = store.load_rank_roles("guild1").unwrap();
        assert_eq!(loaded.len(), MAX_RANK_ROLES);
        assert_eq!(loaded[0], "role1");
        assert_eq!(loaded[4], "role5");
    }

    #[test]
    fn test_retain_skips_rewrite_when_nothing_removed() {
        let dir = tempdir().unwrap();
        let store = ReactionStore::new(dir.path());

        store
            .append("guild1", &ReactionRecord::new("m1", "u1", "👍"))
            .unwrap();
        let before = fs::read(dir.path().join("stats/guild1.json")).unwrap();

        let (removed, remaining) = store.retain("guild1", |_| true).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(remaining, 1);
        assert_eq!(fs::read(dir.path().join("stats/guild1.json")).unwrap(), before);
    }
}
