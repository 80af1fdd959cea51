pub mod config;
pub mod connection;
pub mod db;
pub mod envelope;
pub mod error;
pub mod hook;
pub mod hub;
pub mod message_log;
pub mod migrations;
pub mod relay;
pub mod routes;
pub mod store;
pub mod sweeper;

use std::path::PathBuf;
use std::sync::Arc;

use config::Config;
use db::Db;
use hub::HubRegistry;
use rocket::fs::{FileServer, Options};
use rocket_cors::CorsOptions;

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    rocket_with_config(Config::from_env())
}

pub fn rocket_with_config(config: Config) -> rocket::Rocket<rocket::Build> {
    build_rocket(config, rocket::Config::figment())
}

/// Builds against an explicit port instead of the process-wide figment, so
/// tests can run an independent server per test without racing over
/// `ROCKET_PORT`.
pub fn rocket_with_config_on_port(config: Config, port: u16) -> rocket::Rocket<rocket::Build> {
    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", "127.0.0.1"));
    build_rocket(config, figment)
}

fn build_rocket(config: Config, figment: rocket::figment::Figment) -> rocket::Rocket<rocket::Build> {
    let db = Arc::new(Db::open(&config.database_path, &config.migrations_dir));
    let hubs = Arc::new(HubRegistry::new());
    let config = Arc::new(config);

    hook::notify(config.notify_hook_path.as_deref(), "system.start", "-", "");

    let sweep_db = Arc::clone(&db);
    let sweep_interval_secs = config.sweep_interval_secs;

    let cors = CorsOptions::default()
        .to_cors()
        .expect("failed to build CORS fairing");

    let mut build = rocket::custom(figment)
        .manage(db)
        .manage(hubs)
        .manage(Arc::clone(&config))
        .attach(cors)
        .mount(
            "/",
            rocket::routes![
                routes::create_room,
                routes::get_room,
                routes::delete_room,
                relay::ws_connect,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff("Room Sweeper", move |_rocket| {
            Box::pin(async move {
                sweeper::spawn_sweeper(sweep_db, sweep_interval_secs);
                println!("room sweeper started");
            })
        }));

    // Serves a browser client's static bundle, if present. The bundle itself
    // (encryption, UI) is out of scope here; only the file server is.
    let static_dir: PathBuf = std::env::var("STATIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("frontend/dist"));

    if static_dir.is_dir() {
        println!("serving static client bundle from {}", static_dir.display());
        build = build.mount("/", FileServer::new(&static_dir, Options::Index));
    }

    build
}
