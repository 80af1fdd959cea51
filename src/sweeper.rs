use std::sync::Arc;

use crate::db::Db;
use crate::store::RoomStore;

/// Spawns a background task that periodically purges expired rooms and their
/// messages: sleep loop, log failures, continue on the next tick.
///
/// The cadence is not a correctness requirement — every read path also
/// rechecks room liveness — so a missed or delayed sweep only delays
/// reclaiming storage, never produces a visible inconsistency.
pub fn spawn_sweeper(db: Arc<Db>, interval_secs: u64) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(interval_secs)).await;

            let store = RoomStore::new(&db);
            match store.cleanup_expired() {
                Ok(0) => {}
                Ok(n) => log::info!("expiry sweep: removed {n} expired room(s)"),
                Err(e) => log::warn!("expiry sweep failed: {e}"),
            }
        }
    });
}
