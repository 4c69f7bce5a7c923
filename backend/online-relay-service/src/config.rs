//! Configuration for the online relay service
//!
//! Settings come from environment variables, with a `.env` file loaded in
//! debug builds.

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::models::Platform;
use crate::websocket::{ConnectionHandle, OutboundFrame};

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let log_json = match env::var("LOG_FORMAT") {
            Ok(format) => format.eq_ignore_ascii_case("json"),
            Err(_) => app_env == "production",
        };

        Ok(Self {
            app_env,
            log_json,
            server: ServerConfig::from_env()?,
            relay: RelayConfig::from_env()?,
            auth: AuthConfig::from_env(),
        })
    }
}

/// Listener settings for the gRPC API and the HTTP health/metrics endpoints
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub grpc_port: u16,
    pub http_port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("GRPC_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            grpc_port: env::var("GRPC_PORT")
                .unwrap_or_else(|_| "10400".to_string())
                .parse()
                .context("Invalid GRPC_PORT")?,
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8400".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
        })
    }

    pub fn grpc_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.grpc_port)
            .parse()
            .with_context(|| format!("Invalid gRPC address {}:{}", self.host, self.grpc_port))
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Upper bound on concurrent per-user workers in filtered batch pushes
    pub max_push_workers: usize,
    pub write_timeout: Duration,
    pub outbound_queue_size: usize,
}

impl RelayConfig {
    fn from_env() -> Result<Self> {
        let max_push_workers: usize = env::var("RELAY_MAX_PUSH_WORKERS")
            .unwrap_or_else(|_| "64".to_string())
            .parse()
            .context("Invalid RELAY_MAX_PUSH_WORKERS")?;
        anyhow::ensure!(
            max_push_workers > 0,
            "RELAY_MAX_PUSH_WORKERS must be greater than zero"
        );

        let write_timeout_ms: u64 = env::var("RELAY_WRITE_TIMEOUT_MS")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("Invalid RELAY_WRITE_TIMEOUT_MS")?;

        let outbound_queue_size: usize = env::var("RELAY_OUTBOUND_QUEUE_SIZE")
            .unwrap_or_else(|_| "256".to_string())
            .parse()
            .context("Invalid RELAY_OUTBOUND_QUEUE_SIZE")?;

        Ok(Self {
            max_push_workers,
            write_timeout: Duration::from_millis(write_timeout_ms),
            outbound_queue_size,
        })
    }

    /// Create a connection handle using the configured queue size and write
    /// timeout. The transport drains the returned receiver.
    pub fn open_connection(
        &self,
        user_id: impl Into<String>,
        platform: Platform,
        remote_addr: SocketAddr,
    ) -> (ConnectionHandle, mpsc::Receiver<OutboundFrame>) {
        ConnectionHandle::channel(
            user_id,
            platform,
            remote_addr,
            self.outbound_queue_size,
            self.write_timeout,
        )
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_push_workers: 64,
            write_timeout: Duration::from_millis(3000),
            outbound_queue_size: 256,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Callers allowed to query online status
    pub manager_user_ids: Vec<String>,
}

impl AuthConfig {
    fn from_env() -> Self {
        let manager_user_ids = env::var("APP_MANAGER_UIDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();

        Self { manager_user_ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "APP_ENV",
        "LOG_FORMAT",
        "GRPC_HOST",
        "GRPC_PORT",
        "HTTP_PORT",
        "RELAY_MAX_PUSH_WORKERS",
        "RELAY_WRITE_TIMEOUT_MS",
        "RELAY_OUTBOUND_QUEUE_SIZE",
        "APP_MANAGER_UIDS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();

        let server = ServerConfig::from_env().unwrap();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.grpc_port, 10400);
        assert_eq!(server.http_port, 8400);

        let relay = RelayConfig::from_env().unwrap();
        assert_eq!(relay.max_push_workers, 64);
        assert_eq!(relay.write_timeout, Duration::from_millis(3000));
        assert_eq!(relay.outbound_queue_size, 256);

        assert!(AuthConfig::from_env().manager_user_ids.is_empty());
    }

    #[test]
    #[serial]
    fn test_manager_ids_are_trimmed() {
        clear_env();
        env::set_var("APP_MANAGER_UIDS", " openIM123456, ,openIMAdmin ");

        let auth = AuthConfig::from_env();
        assert_eq!(auth.manager_user_ids, vec!["openIM123456", "openIMAdmin"]);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_rejected() {
        clear_env();
        env::set_var("GRPC_PORT", "not-a-port");

        assert!(ServerConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_push_workers_is_rejected() {
        clear_env();
        env::set_var("RELAY_MAX_PUSH_WORKERS", "0");

        assert!(RelayConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_grpc_addr() {
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            grpc_port: 10400,
            http_port: 8400,
        };
        assert_eq!(server.grpc_addr().unwrap().port(), 10400);
        assert_eq!(server.http_addr(), "127.0.0.1:8400");
    }

    #[tokio::test]
    async fn test_open_connection_uses_queue_settings() {
        use crate::websocket::PushConnection;

        let relay = RelayConfig {
            outbound_queue_size: 1,
            write_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let (conn, _rx) =
            relay.open_connection("alice", Platform::Web, "127.0.0.1:5000".parse().unwrap());

        conn.write_frame(bytes::Bytes::from_static(b"a")).await.unwrap();
        assert!(conn.write_frame(bytes::Bytes::from_static(b"b")).await.is_err());
    }
}
