use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub discord_token: String,
    pub ping_log_path: String,
    pub activity_log_path: String,
    pub reaction_data_dir: String,
    pub retention_days: i64,
    pub status_message: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            ping_log_path: env::var("PING_LOG_PATH")
                .unwrap_or_else(|_| "role_pings.csv".to_string()),
            activity_log_path: env::var("ACTIVITY_LOG_PATH")
                .unwrap_or_else(|_| "activity_messages.csv".to_string()),
            reaction_data_dir: env::var("REACTION_DATA_DIR")
                .unwrap_or_else(|_| "data/reactions".to_string()),
            retention_days: env::var("RETENTION_DAYS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .filter(|days| *days > 0)
                .unwrap_or(30),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Counting pings".to_string()),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("ping_log_path", &self.ping_log_path)
            .field("activity_log_path", &self.activity_log_path)
            .field("reaction_data_dir", &self.reaction_data_dir)
            .field("retention_days", &self.retention_days)
            .field("status_message", &self.status_message)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_logic() {
        // 1. Missing token should fail
        env::remove_var("DISCORD_TOKEN");
        let result = Config::build();
        assert!(result.is_err(), "Should fail when DISCORD_TOKEN is missing");

        // 2. Defaults
        env::set_var("DISCORD_TOKEN", "test_token");
        let config = Config::build().unwrap();
        assert_eq!(config.discord_token, "test_token");
        assert_eq!(config.ping_log_path, "role_pings.csv");
        assert_eq!(config.activity_log_path, "activity_messages.csv");
        assert_eq!(config.reaction_data_dir, "data/reactions");
        assert_eq!(config.retention_days, 30);

        // 3. Debug redaction
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("test_token"));
        assert!(debug_output.contains("[REDACTED]"));

        // 4. Non-positive or garbage retention falls back to the default,
        //    so the sweep always runs with a valid horizon
        for bad in ["-5", "0", "soon"] {
            env::set_var("RETENTION_DAYS", bad);
            let config = Config::build().unwrap();
            assert_eq!(config.retention_days, 30, "RETENTION_DAYS={bad}");
        }
        env::set_var("RETENTION_DAYS", "90");
        assert_eq!(Config::build().unwrap().retention_days, 90);

        // Cleanup
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("RETENTION_DAYS");
    }
}
