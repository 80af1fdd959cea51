use std::env;

/// Server configuration, read from environment variables with sensible
/// defaults: plain `std::env` parsing, no config-file crate, one
/// `from_env()` constructor.
///
/// Environment variables:
/// - `DATABASE_PATH` — path to the SQLite database file (default: `data/relay.db`)
/// - `MIGRATIONS_DIR` — directory of `NNN_name.sql` migration files (default: `migrations`)
/// - `ROOM_MAX_MEMBERS` — max concurrent WebSocket connections per room (default: 4)
/// - `WS_READ_LIMIT_BYTES` — per-frame read limit (default: 2 MiB)
/// - `SWEEP_INTERVAL_SECS` — expiry sweeper cadence (default: 30)
/// - `NOTIFY_HOOK_PATH` — optional external command fired on lifecycle events
pub struct Config {
    pub database_path: String,
    pub migrations_dir: String,
    pub room_max_members: usize,
    pub ws_read_limit_bytes: usize,
    pub sweep_interval_secs: u64,
    pub notify_hook_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "data/relay.db".to_string(),
            migrations_dir: "migrations".to_string(),
            room_max_members: 4,
            ws_read_limit_bytes: 2 * 1024 * 1024,
            sweep_interval_secs: 30,
            notify_hook_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("DATABASE_PATH") {
            config.database_path = val;
        }
        if let Ok(val) = env::var("MIGRATIONS_DIR") {
            config.migrations_dir = val;
        }
        if let Ok(val) = env::var("ROOM_MAX_MEMBERS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.room_max_members = n;
        }
        if let Ok(val) = env::var("WS_READ_LIMIT_BYTES")
            && let Ok(n) = val.parse::<usize>()
        {
            config.ws_read_limit_bytes = n;
        }
        if let Ok(val) = env::var("SWEEP_INTERVAL_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.sweep_interval_secs = n;
        }
        if let Ok(val) = env::var("NOTIFY_HOOK_PATH") {
            config.notify_hook_path = Some(val);
        }

        config
    }
}

/// Parse a room TTL string (`"15m"`, `"1h"`, `"24h"`) into seconds.
/// Any unrecognized value falls back to one hour.
pub fn parse_ttl_secs(ttl: Option<&str>) -> i64 {
    match ttl {
        Some("15m") => 15 * 60,
        Some("1h") => 60 * 60,
        Some("24h") => 24 * 60 * 60,
        _ => 60 * 60,
    }
}
