use rocket::local::blocking::Client;

/// Wrapper around `Client` that auto-deletes the temp SQLite file (and its
/// WAL/SHM siblings) on drop.
pub struct TestClient {
    client: Option<Client>,
    db_path: String,
}

impl Drop for TestClient {
    fn drop(&mut self) {
        drop(self.client.take());
        let _ = std::fs::remove_file(&self.db_path);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_path));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_path));
    }
}

impl std::ops::Deref for TestClient {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().unwrap()
    }
}

pub fn test_client() -> TestClient {
    let db_path = format!(
        "/tmp/relay_test_{}.db",
        uuid::Uuid::new_v4().to_string().split('-').next().unwrap()
    );

    let config = ephemeral_relay::config::Config {
        database_path: db_path.clone(),
        sweep_interval_secs: 3600,
        ..Default::default()
    };

    let rocket = ephemeral_relay::rocket_with_config(config);
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient {
        client: Some(client),
        db_path,
    }
}
