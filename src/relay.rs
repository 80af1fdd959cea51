use std::sync::Arc;

use rocket::futures::{SinkExt, StreamExt};
use rocket::http::Status;
use rocket::{get, State};
use serde_json::Value;

use ws::Message;

use crate::config::Config;
use crate::connection::Connection;
use crate::db::Db;
use crate::envelope::{self, is_persisted_type};
use crate::error::StoreError;
use crate::hub::HubRegistry;
use crate::message_log::MessageLog;
use crate::store::RoomStore;

/// Delay between replayed rows, so a reconnecting peer with a long backlog
/// doesn't get hammered with a burst of reliable sends all at once.
const REPLAY_PACING: std::time::Duration = std::time::Duration::from_millis(2);

/// `GET /ws/<token>` — the WebSocket upgrade route. Performs the room and
/// capacity gates synchronously (so a rejected client gets a plain HTTP
/// status, never a WebSocket handshake) and hands off to [`run_connection`]
/// for the lifetime of the socket.
#[get("/ws/<token>?<after_seq>&<after>")]
pub fn ws_connect(
    ws: ws::WebSocket,
    token: String,
    after_seq: Option<i64>,
    after: Option<i64>,
    db: &State<Arc<Db>>,
    hubs: &State<Arc<HubRegistry>>,
    config: &State<Arc<Config>>,
) -> Result<ws::Channel<'static>, Status> {
    if !RoomStore::new(db).exists(&token) {
        return Err(Status::NotFound);
    }

    let hub = hubs.get_or_create(&token);
    if hub.len() >= config.room_max_members {
        return Err(Status::Forbidden);
    }

    let db = Arc::clone(db.inner());
    let hubs = Arc::clone(hubs.inner());
    let read_limit = config.ws_read_limit_bytes;
    let watermark = after_seq.or(after).unwrap_or(0);

    let ws = ws.config(ws::Config {
        max_message_size: Some(read_limit),
        max_frame_size: Some(read_limit),
        ..Default::default()
    });

    Ok(ws.channel(move |stream| {
        Box::pin(async move {
            run_connection(stream, token, watermark, db, hubs, hub).await;
            Ok(())
        })
    }))
}

/// Per-connection replay state. Tracked as a single flag: the reader loop is
/// the sole task that dispatches `READY`, so no synchronization is needed.
struct ConnState {
    watermark: i64,
    replayed: bool,
}

/// Owns one connection's lifetime end to end: register, run the writer task,
/// run the reader loop, deregister. Never returns early on a per-frame
/// failure — only a transport error or room expiry ends the loop.
async fn run_connection(
    stream: ws::stream::DuplexStream,
    token: String,
    watermark: i64,
    db: Arc<Db>,
    hubs: Arc<HubRegistry>,
    hub: Arc<crate::hub::Hub>,
) {
    static NEXT_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
    let id = NEXT_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

    let (conn, rx) = Connection::new(id);
    hub.add(conn.clone());
    log::debug!("connection {id} joined room {token}");

    let (sink, mut read) = stream.split();
    let writer = tokio::spawn(drain_outbound(sink, rx));

    let mut state = ConnState {
        watermark,
        replayed: false,
    };

    while let Some(frame) = read.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                log::debug!("connection {id} read error: {e}");
                break;
            }
        };

        match message {
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Text(_) | Message::Binary(_) => {}
            Message::Frame(_) => continue,
        }

        if !RoomStore::new(&db).exists(&token) {
            log::debug!("room {token} expired mid-session, closing connection {id}");
            break;
        }

        let Ok(envelope) = serde_json::from_str::<Value>(message.to_text().unwrap_or_default())
        else {
            continue;
        };
        let Some(t) = envelope.get("t").and_then(Value::as_str) else {
            continue;
        };
        let d = envelope.get("d").cloned().unwrap_or(Value::Null);

        match t {
            "READY" => handle_ready(&conn, &db, &token, &d, &mut state).await,
            t if is_persisted_type(t) => {
                handle_persisted(&conn, &hub, &db, &token, t, &d, id).await
            }
            "HELLO" => hub.broadcast_except(&Message::text(envelope.to_string()), id),
            _ => {}
        }
    }

    hub.remove(id);
    hubs.gc(&token);
    drop(conn);
    let _ = writer.await;
    log::debug!("connection {id} left room {token}");
}

/// Drains a connection's outbound channel into its socket half, as its own
/// task so the hub's best-effort broadcasts never wait on a slow peer's
/// socket write.
async fn drain_outbound(
    mut sink: rocket::futures::stream::SplitSink<ws::stream::DuplexStream, Message>,
    mut rx: tokio::sync::mpsc::Receiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        if sink.send(message).await.is_err() {
            break;
        }
    }
}

/// Dispatches `READY`: raises the watermark, then (once per connection) reads
/// and reliably replays every message with `seq > watermark`.
async fn handle_ready(conn: &Connection, db: &Db, token: &str, d: &Value, state: &mut ConnState) {
    if let Some(last_seen) = d.get("lastSeenSeq").and_then(Value::as_i64) {
        state.watermark = state.watermark.max(last_seen);
    }

    if state.replayed {
        return;
    }
    state.replayed = true;

    let rows = match MessageLog::new(db).since(token, state.watermark) {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("replay for room {token} failed: {e}");
            return;
        }
    };

    for row in rows {
        let frame = envelope::build_persisted_envelope(
            &row.message_type,
            row.seq,
            &row.nonce,
            &row.ciphertext,
        );
        if conn
            .enqueue_reliable(Message::text(frame.to_string()))
            .await
            .is_err()
        {
            return;
        }
        tokio::time::sleep(REPLAY_PACING).await;
    }
}

/// Dispatches a persisted type (`MSG`/`IMG_META`/`IMG_CHUNK`/`IMG_END`):
/// decode, persist with a server-assigned `seq`, then fan out the rewritten
/// envelope — or, on any failure, reply to the sender alone with an `ERROR`
/// frame and fan out nothing.
async fn handle_persisted(
    conn: &Connection,
    hub: &crate::hub::Hub,
    db: &Db,
    token: &str,
    message_type: &str,
    d: &Value,
    sender: crate::connection::ConnId,
) {
    let (nonce, ciphertext) = match envelope::extract_nonce_ciphertext(d) {
        Ok(pair) => pair,
        Err(e) => {
            log::warn!("rejecting malformed {message_type} from connection {sender}: {e}");
            conn.enqueue(Message::text(
                envelope::build_error_envelope(e.code(), &e.to_string()).to_string(),
            ));
            return;
        }
    };

    let created_at = chrono::Utc::now().timestamp();
    let seq = match MessageLog::new(db).insert(token, &nonce, &ciphertext, created_at, message_type) {
        Ok(seq) => seq,
        Err(e) => {
            log::warn!("storage refused {message_type} in room {token}: {e}");
            conn.enqueue(Message::text(
                envelope::build_error_envelope("MSG_REJECTED", &store_error_message(&e)).to_string(),
            ));
            return;
        }
    };

    let frame = envelope::build_persisted_envelope(message_type, seq, &nonce, &ciphertext);
    hub.broadcast_except(&Message::text(frame.to_string()), sender);
}

fn store_error_message(e: &StoreError) -> String {
    match e {
        StoreError::NotFound => "room not found".to_string(),
        StoreError::RoomExpired => "room has expired".to_string(),
        StoreError::Storage(_) => "storage error, please retry".to_string(),
    }
}
