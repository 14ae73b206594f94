//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which stands up a full TLS server on a random
//! port over a temporary storage tree, plus builders for the gzip-tar
//! upload archives the server ingests. The reqwest client accepts the
//! harness's self-signed certificate.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use wavy_server::config::Config;
use wavy_server::server::Server;

/// Test harness wrapping a running server and its scratch storage tree.
pub struct TestHarness {
    pub root: TempDir,
    pub storage_root: PathBuf,
    pub temp_root: PathBuf,
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestHarness {
    /// Start a server with default test configuration.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a server after applying `tweak` to the test configuration.
    pub async fn start_with(tweak: impl FnOnce(&mut Config)) -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let storage_root = root.path().join("hls_storage");
        let temp_root = root.path().join("hls_temp");
        let (cert_path, key_path) = write_self_signed(root.path());

        let mut config = Config::default();
        config.server.port = 0;
        config.server.cert_path = cert_path;
        config.server.key_path = key_path;
        config.server.lock_path = root.path().join("wavy.lock");
        config.storage.root = storage_root.clone();
        config.storage.temp_root = temp_root.clone();
        tweak(&mut config);

        let server = Server::bind(config).await.expect("failed to bind test server");
        let addr = server.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            server.serve().await.ok();
        });

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .expect("failed to build client");

        Self {
            root,
            storage_root,
            temp_root,
            addr,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://127.0.0.1:{}{}", self.addr.port(), path)
    }

    /// POST an archive body to the upload endpoint and return the response.
    pub async fn upload(&self, body: Vec<u8>) -> reqwest::Response {
        self.client
            .post(self.url("/"))
            .body(body)
            .send()
            .await
            .expect("upload request failed")
    }

    /// Upload an archive expected to succeed; returns the asset id.
    pub async fn upload_ok(&self, files: &[(&str, &[u8])]) -> String {
        let resp = self.upload(build_archive(files)).await;
        assert_eq!(resp.status(), 200);
        resp.headers()
            .get("Client-ID")
            .expect("missing Client-ID header")
            .to_str()
            .unwrap()
            .to_string()
    }
}

/// Build a gzip-compressed tar archive from in-memory files.
pub fn build_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Block-compress segment bytes the way uploaders do for `.zst` entries.
pub fn zstd_compress(data: &[u8]) -> Vec<u8> {
    zstd::stream::encode_all(data, 0).unwrap()
}

/// Write a throwaway self-signed certificate and key under `dir`.
pub fn write_self_signed(dir: &Path) -> (PathBuf, PathBuf) {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    let generated =
        rcgen::generate_simple_self_signed(vec!["localhost".into(), "127.0.0.1".into()])
            .expect("failed to generate certificate");
    let cert_path = dir.join("server.crt");
    let key_path = dir.join("server.key");
    std::fs::write(&cert_path, generated.cert.pem()).unwrap();
    std::fs::write(&key_path, generated.key_pair.serialize_pem()).unwrap();
    (cert_path, key_path)
}
