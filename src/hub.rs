use std::collections::HashMap;
use std::sync::Mutex;

use ws::Message;

use crate::connection::{Connection, ConnId};

/// The set of live connections participating in one room: a mutex-guarded
/// map keyed by connection id, entries added/removed under the lock.
#[derive(Default)]
pub struct Hub {
    members: Mutex<HashMap<ConnId, Connection>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, conn: Connection) {
        self.members.lock().unwrap().insert(conn.id, conn);
    }

    pub fn remove(&self, id: ConnId) {
        self.members.lock().unwrap().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.members.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best-effort enqueue to every member. No ordering guarantee across
    /// recipients; per-recipient order is preserved by that connection's
    /// writer loop.
    pub fn broadcast(&self, message: &Message) {
        for conn in self.members.lock().unwrap().values() {
            conn.enqueue(message.clone());
        }
    }

    /// Same as [`Hub::broadcast`] but skips `sender`.
    pub fn broadcast_except(&self, message: &Message, sender: ConnId) {
        for conn in self.members.lock().unwrap().values() {
            if conn.id != sender {
                conn.enqueue(message.clone());
            }
        }
    }

    /// Best-effort closes every member's socket. Used by explicit room
    /// destruction to evict live peers synchronously instead of waiting for
    /// their next liveness re-check.
    pub fn close_all(&self) {
        for conn in self.members.lock().unwrap().values() {
            conn.enqueue(Message::Close(None));
        }
    }
}

/// Process-wide map of room token to hub. Lazily populated on first
/// connection, removed once a hub's member count returns to zero. Rooms are
/// persistent in the database and transient here — the hub is a cache of
/// live peers, not the source of truth.
#[derive(Default)]
pub struct HubRegistry {
    hubs: Mutex<HashMap<String, std::sync::Arc<Hub>>>,
}

impl HubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the hub for `token`, creating it if this is the first
    /// connection to the room.
    pub fn get_or_create(&self, token: &str) -> std::sync::Arc<Hub> {
        self.hubs
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_insert_with(|| std::sync::Arc::new(Hub::new()))
            .clone()
    }

    /// Returns the hub for `token` if one is currently populated, without
    /// creating it. Used by explicit room destruction to close live sockets
    /// synchronously.
    pub fn get(&self, token: &str) -> Option<std::sync::Arc<Hub>> {
        self.hubs.lock().unwrap().get(token).cloned()
    }

    /// Removes the hub for `token` if its member count has reached zero.
    /// Safe to call speculatively: a hub that gained a new member between
    /// the caller's decrement and this call is left alone.
    pub fn gc(&self, token: &str) {
        let mut hubs = self.hubs.lock().unwrap();
        if let Some(hub) = hubs.get(token)
            && hub.is_empty()
        {
            hubs.remove(token);
        }
    }

    /// Removes and returns the hub for `token` unconditionally, used by room
    /// destruction to drop all members regardless of count.
    pub fn remove(&self, token: &str) -> Option<std::sync::Arc<Hub>> {
        self.hubs.lock().unwrap().remove(token)
    }
}
