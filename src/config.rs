//! Runtime configuration and environment loading.

use std::{env, path::PathBuf};

use directories::ProjectDirs;
use tokio::time::Duration;

/// Default name of the attendee database file.
pub const DB_FILE_NAME: &str = "checkin.db";

/// Settings for [`crate::runtime::handle::spawn_checkin`] and the CLI.
#[derive(Debug, Clone)]
pub struct CheckInConfig {
    /// Database file. `None` means the platform data directory.
    pub db_path: Option<PathBuf>,
    /// Quiet window after an accepted scan.
    pub scan_cooldown: Duration,
    /// Fall back to a session-only store when the database cannot be opened.
    pub in_memory_fallback: bool,
    /// Bound of the command channel.
    pub command_buffer: usize,
    /// Directory exports are written to. `None` means the working directory.
    pub export_dir: Option<PathBuf>,
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            scan_cooldown: Duration::from_millis(2000),
            in_memory_fallback: true,
            command_buffer: 64,
            export_dir: None,
        }
    }
}

impl CheckInConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `CHECKIN_DB_PATH` - Database file (default: platform data dir)
    /// - `CHECKIN_SCAN_COOLDOWN_MS` - Scan debounce window (default: 2000)
    /// - `CHECKIN_IN_MEMORY_FALLBACK` - Degrade to memory if storage fails (default: true)
    /// - `CHECKIN_COMMAND_BUFFER` - Command queue size (default: 64)
    /// - `CHECKIN_EXPORT_DIR` - Export output directory (default: cwd)
    ///
    /// Blank values count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`CheckInConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.db_path = read("CHECKIN_DB_PATH").map(PathBuf::from);

        if let Some(ms) = parse::<u64>(read("CHECKIN_SCAN_COOLDOWN_MS")) {
            config.scan_cooldown = Duration::from_millis(ms);
        }

        if let Some(enable) = parse::<bool>(read("CHECKIN_IN_MEMORY_FALLBACK")) {
            config.in_memory_fallback = enable;
        }

        if let Some(capacity) = parse::<usize>(read("CHECKIN_COMMAND_BUFFER")) {
            config.command_buffer = capacity.max(1);
        }

        config.export_dir = read("CHECKIN_EXPORT_DIR").map(PathBuf::from);

        config
    }

    /// Resolved database path, creating the platform data directory if needed.
    ///
    /// An empty `db_path` is treated as unset.
    pub fn resolve_db_path(&self) -> std::io::Result<PathBuf> {
        if let Some(path) = self.db_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            return Ok(path.clone());
        }
        let dir = ProjectDirs::from("", "", "checkin")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(DB_FILE_NAME))
    }
}

fn parse<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}
