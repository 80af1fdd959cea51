use rocket::http::{ContentType, Status};

use crate::common::test_client;

#[test]
fn create_room_defaults_to_one_hour() {
    let client = test_client();
    let res = client.post("/create").dispatch();
    assert_eq!(res.status(), Status::Ok);

    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["url"].as_str().unwrap().starts_with("/#"));
    assert!(body["expires_at"].as_str().unwrap().contains('T'));
}

#[test]
fn create_room_honors_ttl() {
    let client = test_client();
    let res = client
        .post("/create")
        .header(ContentType::JSON)
        .body(r#"{"ttl": "15m"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    let body: serde_json::Value = res.into_json().unwrap();
    let token = body["url"].as_str().unwrap().trim_start_matches("/#");

    let res = client.get(format!("/room/{token}")).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let info: serde_json::Value = res.into_json().unwrap();
    assert!(info["expires_in_sec"].as_i64().unwrap() <= 15 * 60);
}

#[test]
fn unrecognized_ttl_falls_back_to_one_hour() {
    let client = test_client();
    let res = client
        .post("/create")
        .header(ContentType::JSON)
        .body(r#"{"ttl": "nonsense"}"#)
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let token = body["url"].as_str().unwrap().trim_start_matches("/#");

    let res = client.get(format!("/room/{token}")).dispatch();
    let info: serde_json::Value = res.into_json().unwrap();
    let secs = info["expires_in_sec"].as_i64().unwrap();
    assert!(secs > 15 * 60 && secs <= 60 * 60);
}

#[test]
fn get_room_missing_is_not_found() {
    let client = test_client();
    let res = client.get("/room/does-not-exist").dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn delete_room_is_unconditional_and_idempotent() {
    let client = test_client();
    let res = client.post("/create").dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let token = body["url"].as_str().unwrap().trim_start_matches("/#").to_string();

    let res = client.delete(format!("/room/{token}")).dispatch();
    assert_eq!(res.status(), Status::NoContent);

    let res = client.get(format!("/room/{token}")).dispatch();
    assert_eq!(res.status(), Status::NotFound);

    // Deleting again is still a 204, not an error.
    let res = client.delete(format!("/room/{token}")).dispatch();
    assert_eq!(res.status(), Status::NoContent);
}

#[test]
fn ws_upgrade_rejects_unknown_room() {
    let client = test_client();
    let res = client
        .get("/ws/does-not-exist")
        .header(rocket::http::Header::new("Connection", "upgrade"))
        .header(rocket::http::Header::new("Upgrade", "websocket"))
        .header(rocket::http::Header::new("Sec-WebSocket-Version", "13"))
        .header(rocket::http::Header::new("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="))
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}
