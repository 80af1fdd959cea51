use std::sync::Arc;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{delete, get, post, State};
use serde::{Deserialize, Serialize};

use crate::config::{parse_ttl_secs, Config};
use crate::db::Db;
use crate::hook;
use crate::hub::HubRegistry;
use crate::store::RoomStore;

#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomRequest {
    ttl: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    url: String,
    expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct RoomInfoResponse {
    expires_at: String,
    expires_in_sec: i64,
}

/// `POST /create`. The JSON body is optional; an absent or unrecognized
/// `ttl` falls back to one hour ([`parse_ttl_secs`]).
#[post("/create", data = "<body>")]
pub fn create_room(
    db: &State<Arc<Db>>,
    config: &State<Arc<Config>>,
    body: Option<Json<CreateRoomRequest>>,
) -> Result<Json<CreateRoomResponse>, Status> {
    let ttl_secs = parse_ttl_secs(body.and_then(|b| b.ttl.clone()).as_deref());

    let room = RoomStore::new(db)
        .create(ttl_secs)
        .map_err(|_| Status::InternalServerError)?;

    hook::notify(
        config.notify_hook_path.as_deref(),
        "room.created",
        &room.token,
        &format!("ttl={ttl_secs}s"),
    );

    Ok(Json(CreateRoomResponse {
        url: format!("/#{}", room.token),
        expires_at: to_rfc3339(room.expires_at),
    }))
}

/// `GET /room/{token}`.
#[get("/room/<token>")]
pub fn get_room(db: &State<Arc<Db>>, token: &str) -> Result<Json<RoomInfoResponse>, Status> {
    let expires_at = RoomStore::new(db)
        .get_expiry(token)
        .map_err(|_| Status::NotFound)?;

    Ok(Json(RoomInfoResponse {
        expires_at: to_rfc3339(expires_at),
        expires_in_sec: (expires_at - chrono::Utc::now().timestamp()).max(0),
    }))
}

/// `DELETE /room/{token}`. Closes every live socket in the room's hub before
/// the row is dropped, so connected peers are evicted immediately rather
/// than left to notice on their next write.
#[delete("/room/<token>")]
pub fn delete_room(
    db: &State<Arc<Db>>,
    hubs: &State<Arc<HubRegistry>>,
    config: &State<Arc<Config>>,
    token: &str,
) -> Status {
    if let Some(hub) = hubs.remove(token) {
        hub.close_all();
    }
    RoomStore::new(db).delete(token);
    hook::notify(config.notify_hook_path.as_deref(), "room.destroyed", token, "");

    Status::NoContent
}

fn to_rfc3339(epoch_secs: i64) -> String {
    chrono::DateTime::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
