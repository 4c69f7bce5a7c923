use super::connection::{ConnectionId, PushConnection, SharedConnection};
use crate::metrics;
use crate::models::Platform;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read access to live connections, as used by the relay operations
///
/// Lookups return snapshots; an unknown user yields an empty list.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn connections_for_user(&self, user_id: &str) -> Vec<SharedConnection>;

    async fn connections_for_user_on_platform(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Vec<SharedConnection>;
}

/// Registry of live gateway connections
///
/// Tracks every connection per user, in registration order. A user may hold
/// one connection per platform, but transient duplicates during reconnects
/// are kept side by side until the accept path removes the stale one.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    // user_id -> connections of that user
    inner: Arc<RwLock<HashMap<String, Vec<SharedConnection>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for its user
    ///
    /// A connection with the same platform and remote address is replaced
    /// in place and returned.
    pub async fn register(&self, conn: SharedConnection) -> Option<SharedConnection> {
        let mut guard = self.inner.write().await;
        let conns = guard.entry(conn.user_id().to_string()).or_default();

        let existing = conns.iter().position(|c| {
            c.platform() == conn.platform() && c.remote_addr() == conn.remote_addr()
        });

        let replaced = match existing {
            Some(idx) => Some(std::mem::replace(&mut conns[idx], conn.clone())),
            None => {
                conns.push(conn.clone());
                metrics::ONLINE_CONNECTIONS.inc();
                None
            }
        };

        tracing::debug!(
            user_id = %conn.user_id(),
            platform = %conn.platform(),
            remote_addr = %conn.remote_addr(),
            replaced = replaced.is_some(),
            total = conns.len(),
            "Registered connection"
        );

        replaced
    }

    /// Remove a specific connection
    ///
    /// Must be called by the accept path when a connection closes. Returns
    /// whether the connection was still registered.
    pub async fn unregister(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;

        let Some(conns) = guard.get_mut(user_id) else {
            return false;
        };

        let before = conns.len();
        conns.retain(|c| c.id() != connection_id);
        let removed = before != conns.len();

        if removed {
            metrics::ONLINE_CONNECTIONS.dec();
            tracing::debug!(
                user_id = %user_id,
                remaining = conns.len(),
                "Unregistered connection"
            );
        }

        if conns.is_empty() {
            guard.remove(user_id);
        }

        removed
    }

    /// Number of users with at least one live connection
    pub async fn online_user_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Total number of live connections
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.values().map(|v| v.len()).sum()
    }
}

#[async_trait]
impl ConnectionStore for ConnectionRegistry {
    async fn connections_for_user(&self, user_id: &str) -> Vec<SharedConnection> {
        let guard = self.inner.read().await;
        guard.get(user_id).cloned().unwrap_or_default()
    }

    async fn connections_for_user_on_platform(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Vec<SharedConnection> {
        let guard = self.inner.read().await;
        guard
            .get(user_id)
            .map(|conns| {
                conns
                    .iter()
                    .filter(|c| c.platform() == platform)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
