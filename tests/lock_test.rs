//! Integration test for the single-instance startup guard.

mod common;

use common::write_self_signed;
use wavy_server::config::Config;
use wavy_server::server::Server;

#[tokio::test]
async fn second_instance_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let (cert_path, key_path) = write_self_signed(dir.path());
    let lock_path = dir.path().join("wavy.lock");

    let mut config = Config::default();
    config.server.port = 0;
    config.server.cert_path = cert_path;
    config.server.key_path = key_path;
    config.server.lock_path = lock_path;
    config.storage.root = dir.path().join("hls_storage");
    config.storage.temp_root = dir.path().join("hls_temp");

    let first = Server::bind(config.clone()).await.expect("first bind");

    // Same lock endpoint, otherwise independent configuration.
    let second = Server::bind(config.clone()).await;
    assert!(second.is_err());

    // Releasing the first instance frees the endpoint.
    drop(first);
    let third = Server::bind(config).await;
    assert!(third.is_ok());
}
