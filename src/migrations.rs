use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::MigrationError;

/// One pending migration file, parsed from a `NNN_name.sql` filename.
struct PendingMigration {
    version: i64,
    name: String,
    sql: String,
}

/// Discovers and applies schema migrations under a directory of files named
/// `NNN_name.sql` (three-or-more-digit version prefix, underscore,
/// descriptive name), applying each exactly once across all invocations.
pub struct MigrationRunner {
    dir: PathBuf,
}

impl MigrationRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Ensures the tracking table exists, discovers pending migrations newer
    /// than the applied head, and applies each under its own transaction.
    /// Returns the number of migrations applied this invocation.
    pub fn run(&self, conn: &mut Connection) -> Result<usize, MigrationError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            );",
        )?;

        let head: i64 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;

        let mut pending = self.discover()?;
        pending.retain(|m| m.version > head);
        pending.sort_by_key(|m| m.version);

        let mut applied = 0;
        for migration in &pending {
            log::info!(
                "applying migration {} ({})",
                migration.version,
                migration.name
            );
            self.apply_one(conn, migration)?;
            applied += 1;
        }

        if applied == 0 {
            log::info!("migrations up to date at version {head}");
        }

        Ok(applied)
    }

    fn apply_one(
        &self,
        conn: &mut Connection,
        migration: &PendingMigration,
    ) -> Result<(), MigrationError> {
        let now = chrono::Utc::now().timestamp();
        let tx = conn.transaction().map_err(|e| MigrationError::Apply {
            version: migration.version,
            name: migration.name.clone(),
            source: e,
        })?;

        let result = tx
            .execute_batch(&migration.sql)
            .and_then(|_| {
                tx.execute(
                    "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![migration.version, &migration.name, now],
                )
            })
            .map_err(|e| MigrationError::Apply {
                version: migration.version,
                name: migration.name.clone(),
                source: e,
            });

        result?;
        tx.commit().map_err(|e| MigrationError::Apply {
            version: migration.version,
            name: migration.name.clone(),
            source: e,
        })
    }

    fn discover(&self) -> Result<Vec<PendingMigration>, MigrationError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            MigrationError::UnreadableDirectory(self.dir.display().to_string(), e)
        })?;

        let mut seen: Vec<(i64, String)> = Vec::new();
        let mut migrations = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| {
                MigrationError::UnreadableDirectory(self.dir.display().to_string(), e)
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }

            let (version, name) = parse_filename(&path)?;
            if let Some((_, existing_name)) = seen.iter().find(|(v, _)| *v == version) {
                return Err(MigrationError::DuplicateVersion(
                    version,
                    existing_name.clone(),
                    name,
                ));
            }
            seen.push((version, name.clone()));

            let sql = std::fs::read_to_string(&path).map_err(|e| {
                MigrationError::UnreadableDirectory(path.display().to_string(), e)
            })?;
            migrations.push(PendingMigration { version, name, sql });
        }

        Ok(migrations)
    }
}

fn parse_filename(path: &Path) -> Result<(i64, String), MigrationError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MigrationError::MalformedName(path.display().to_string()))?;

    let (prefix, name) = stem
        .split_once('_')
        .ok_or_else(|| MigrationError::MalformedName(stem.to_string()))?;

    if prefix.len() < 3 || !prefix.chars().all(|c| c.is_ascii_digit()) {
        return Err(MigrationError::MalformedName(stem.to_string()));
    }

    let version: i64 = prefix
        .parse()
        .map_err(|_| MigrationError::UnparseableVersion(stem.to_string()))?;

    Ok((version, name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn applies_files_in_version_order_exactly_once() {
        let tmp = std::env::temp_dir().join(format!("mig_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&tmp).unwrap();
        write_file(&tmp, "002_second.sql", "CREATE TABLE b (id INTEGER);");
        write_file(&tmp, "001_first.sql", "CREATE TABLE a (id INTEGER);");

        let mut conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new(&tmp);

        let applied = runner.run(&mut conn).unwrap();
        assert_eq!(applied, 2);

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert_eq!(versions, vec![1, 2]);

        // Second invocation is a no-op: nothing new to apply, no re-execution.
        let applied_again = runner.run(&mut conn).unwrap();
        assert_eq!(applied_again, 0);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn rejects_malformed_filename() {
        let tmp = std::env::temp_dir().join(format!("mig_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&tmp).unwrap();
        write_file(&tmp, "nozprefix.sql", "CREATE TABLE a (id INTEGER);");

        let mut conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new(&tmp);
        assert!(matches!(
            runner.run(&mut conn),
            Err(MigrationError::MalformedName(_))
        ));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn aborts_whole_run_on_sql_failure_and_retries_from_same_version() {
        let tmp = std::env::temp_dir().join(format!("mig_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&tmp).unwrap();
        write_file(&tmp, "001_ok.sql", "CREATE TABLE a (id INTEGER);");
        write_file(&tmp, "002_bad.sql", "THIS IS NOT SQL;");

        let mut conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new(&tmp);
        assert!(runner.run(&mut conn).is_err());

        // Version 1 committed, version 2's tracking row did not land.
        let head: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(head, 1);

        std::fs::remove_dir_all(&tmp).ok();
    }
}
