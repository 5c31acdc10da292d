//! Environment configuration for the bot.
//!
//! Values come from the process environment, after `.env` has been loaded.
//! The bot token itself is read by `Bot::from_env()` (`TELOXIDE_TOKEN`).

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the stimulus images of the trial pool.
    pub images_dir: PathBuf,
    /// SQLite file for the per-chat dialogue storage.
    pub db_path: String,
    /// JSON-lines file receiving one feature row per completed attempt.
    pub export_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let images_dir = lookup("MRT_IMAGES_DIR").unwrap_or_else(|| "images".to_string());
        let db_path = lookup("MRT_DB_PATH").unwrap_or_else(|| "db.sqlite".to_string());
        let export_path =
            lookup("MRT_EXPORT_PATH").unwrap_or_else(|| "mrt_features.jsonl".to_string());

        Self {
            images_dir: PathBuf::from(images_dir),
            db_path,
            export_path: PathBuf::from(export_path),
        }
    }
}
