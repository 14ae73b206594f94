use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Hard ceiling on request body size, in MiB. Exceeding it yields 413.
    #[serde(default = "default_body_limit_mib")]
    pub body_limit_mib: usize,

    /// PEM certificate chain presented to clients.
    #[serde(default = "default_cert_path")]
    pub cert_path: PathBuf,

    /// PEM private key matching the certificate.
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,

    /// Unix socket path backing the single-instance lock.
    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,
}

impl ServerConfig {
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mib * 1024 * 1024
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of the promoted owner/asset tree.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Transient staging area. Must share a parent with `root` so that
    /// promotion renames stay on one filesystem.
    #[serde(default = "default_temp_root")]
    pub temp_root: PathBuf,
}

fn default_port() -> u16 {
    8443
}
fn default_body_limit_mib() -> usize {
    200
}
fn default_cert_path() -> PathBuf {
    PathBuf::from("server.crt")
}
fn default_key_path() -> PathBuf {
    PathBuf::from("server.key")
}
fn default_lock_path() -> PathBuf {
    PathBuf::from("/tmp/wavy-server.lock")
}
fn default_storage_root() -> PathBuf {
    PathBuf::from("hls_storage")
}
fn default_temp_root() -> PathBuf {
    PathBuf::from("hls_temp")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            body_limit_mib: default_body_limit_mib(),
            cert_path: default_cert_path(),
            key_path: default_key_path(),
            lock_path: default_lock_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            temp_root: default_temp_root(),
        }
    }
}
