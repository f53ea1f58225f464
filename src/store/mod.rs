pub mod ledger;
pub mod reactions;

use crate::config::Config;
use ledger::{ActivityRecord, Ledger, PingRecord};
use reactions::ReactionStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every persistent store the bot owns, rooted at configured paths.
///
/// Passed around explicitly so commands, the ingestion path and tests all
/// operate on the same handles (tests point these at a temp directory).
#[derive(Clone)]
pub struct Stores {
    pub pings: Ledger<PingRecord>,
    pub activity: Ledger<ActivityRecord>,
    pub reactions: ReactionStore,
}

impl Stores {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pings: Ledger::new(&config.ping_log_path),
            activity: Ledger::new(&config.activity_log_path),
            reactions: ReactionStore::new(&config.reaction_data_dir),
        }
    }

    /// Materialize the shared CSV ledgers at startup.
    pub fn ensure_shared(&self) -> Result<(), StoreError> {
        self.pings.ensure()?;
        self.activity.ensure()?;
        Ok(())
    }
}
