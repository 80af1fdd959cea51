use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::db::Db;
use crate::error::StoreError;

/// A freshly created room: its token and when it expires.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub token: String,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Create/lookup/delete rooms with TTL, and sweep expired ones. Room tokens
/// are a v4 UUID formatted as 32 lowercase hex digits: a uniformly random,
/// URL-safe opaque string without adding a `rand` dependency.
pub struct RoomStore<'a> {
    db: &'a Db,
}

impl<'a> RoomStore<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    pub fn create(&self, ttl_secs: i64) -> Result<RoomHandle, StoreError> {
        let token = format!("{:032x}", Uuid::new_v4().as_u128());
        let now = chrono::Utc::now().timestamp();
        let expires_at = now + ttl_secs;

        let conn = self.db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO rooms (token, created_at, expires_at) VALUES (?1, ?2, ?3)",
            params![&token, now, expires_at],
        )?;

        log::debug!("room {token} created, expires at {expires_at}");

        Ok(RoomHandle {
            token,
            created_at: now,
            expires_at,
        })
    }

    pub fn exists(&self, token: &str) -> bool {
        self.get_expiry(token).is_ok()
    }

    /// Returns the expiry for a live room; fails with `NotFound` if the room
    /// is missing or has already expired.
    pub fn get_expiry(&self, token: &str) -> Result<i64, StoreError> {
        let conn = self.db.conn.lock().unwrap();
        let expiry: Option<i64> = conn
            .query_row(
                "SELECT expires_at FROM rooms WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()?;

        match expiry {
            Some(expiry) if expiry > chrono::Utc::now().timestamp() => Ok(expiry),
            _ => Err(StoreError::NotFound),
        }
    }

    /// Unconditional removal, used by explicit destroy.
    pub fn delete(&self, token: &str) {
        let conn = self.db.conn.lock().unwrap();
        conn.execute("DELETE FROM rooms WHERE token = ?1", params![token])
            .ok();
        log::debug!("room {token} deleted");
    }

    /// In one transaction, deletes every message whose room has expired,
    /// then those rooms. Idempotent: a second run with nothing newly
    /// expired deletes zero rows.
    pub fn cleanup_expired(&self) -> Result<usize, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let mut conn = self.db.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM messages WHERE room_id IN (SELECT token FROM rooms WHERE expires_at <= ?1)",
            params![now],
        )?;
        let deleted = tx.execute("DELETE FROM rooms WHERE expires_at <= ?1", params![now])?;

        tx.commit()?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Db {
        let dir = std::env::temp_dir().join(format!("store_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("001_rooms.sql"),
            include_str!("../migrations/001_rooms.sql"),
        )
        .unwrap();
        std::fs::write(
            dir.join("002_messages.sql"),
            include_str!("../migrations/002_messages.sql"),
        )
        .unwrap();
        Db::open(":memory:", dir.to_str().unwrap())
    }

    #[test]
    fn create_then_exists_then_expires() {
        let db = test_db();
        let store = RoomStore::new(&db);

        let room = store.create(3600).unwrap();
        assert!(store.exists(&room.token));
        assert_eq!(store.get_expiry(&room.token).unwrap(), room.expires_at);

        let expired = store.create(-1).unwrap();
        assert!(!store.exists(&expired.token));
        assert!(matches!(
            store.get_expiry(&expired.token),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn cleanup_expired_is_idempotent() {
        let db = test_db();
        let store = RoomStore::new(&db);
        store.create(-1).unwrap();

        let first = store.cleanup_expired().unwrap();
        assert_eq!(first, 1);
        let second = store.cleanup_expired().unwrap();
        assert_eq!(second, 0);
    }
}
