use rusqlite::{params, OptionalExtension};

use crate::db::Db;
use crate::error::StoreError;

/// One persisted message row, as returned by [`MessageLog::since`].
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub seq: i64,
    pub created_at: i64,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub message_type: String,
}

/// Assigns per-room monotone sequence numbers and streams history. The
/// concurrency-critical component: sequence assignment, the room-expiry
/// check, and the insert all happen inside one transaction, so two
/// concurrent inserts into the same room can never be assigned the same
/// `seq` — SQLite's writer serialization makes the transaction's
/// read-then-write on `(room_id, seq)` atomic.
pub struct MessageLog<'a> {
    db: &'a Db,
}

impl<'a> MessageLog<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    pub fn insert(
        &self,
        room_token: &str,
        nonce: &[u8],
        ciphertext: &[u8],
        created_at: i64,
        message_type: &str,
    ) -> Result<i64, StoreError> {
        let mut conn = self.db.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let expiry: Option<i64> = tx
            .query_row(
                "SELECT expires_at FROM rooms WHERE token = ?1",
                params![room_token],
                |row| row.get(0),
            )
            .optional()?;
        let expiry = expiry.ok_or(StoreError::NotFound)?;
        if expiry <= created_at {
            return Err(StoreError::RoomExpired);
        }

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE room_id = ?1",
            params![room_token],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO messages (room_id, created_at, ciphertext, nonce, seq, message_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![room_token, created_at, ciphertext, nonce, seq, message_type],
        )?;

        tx.commit()?;
        Ok(seq)
    }

    pub fn since(&self, room_token: &str, after_seq: i64) -> Result<Vec<StoredMessage>, StoreError> {
        let conn = self.db.conn.lock().unwrap();

        let expiry: Option<i64> = conn
            .query_row(
                "SELECT expires_at FROM rooms WHERE token = ?1",
                params![room_token],
                |row| row.get(0),
            )
            .optional()?;
        let expiry = expiry.ok_or(StoreError::NotFound)?;
        if expiry <= chrono::Utc::now().timestamp() {
            return Err(StoreError::RoomExpired);
        }

        let mut stmt = conn.prepare(
            "SELECT seq, created_at, nonce, ciphertext, message_type
             FROM messages WHERE room_id = ?1 AND seq > ?2 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![room_token, after_seq], |row| {
            Ok(StoredMessage {
                seq: row.get(0)?,
                created_at: row.get(1)?,
                nonce: row.get(2)?,
                ciphertext: row.get(3)?,
                message_type: row.get(4)?,
            })
        })?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn max_seq(&self, room_token: &str) -> Result<i64, StoreError> {
        let conn = self.db.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM messages WHERE room_id = ?1",
            params![room_token],
            |row| row.get(0),
        )?)
    }
}
