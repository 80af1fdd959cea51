use std::sync::Mutex;

use rusqlite::Connection;

use crate::migrations::MigrationRunner;

/// Shared database handle. All persistent state — rooms, messages, the
/// migration tracking table — lives behind this single connection, guarded
/// by a mutex. SQLite in WAL mode still serializes writers, so one
/// connection per process is sufficient and keeps the message log's
/// sequence-assignment transaction trivially exclusive.
pub struct Db {
    pub conn: Mutex<Connection>,
}

impl Db {
    /// Opens (or creates) the database at `path` and runs all pending
    /// migrations from `migrations_dir`. Fatal on any migration or open
    /// failure — the process should not start against an unmigrated store.
    pub fn open(path: &str, migrations_dir: &str) -> Self {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let mut conn = Connection::open(path).expect("failed to open database");
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .expect("failed to set pragmas");

        MigrationRunner::new(migrations_dir)
            .run(&mut conn)
            .unwrap_or_else(|e| panic!("migration failed: {e}"));

        Db {
            conn: Mutex::new(conn),
        }
    }
}
