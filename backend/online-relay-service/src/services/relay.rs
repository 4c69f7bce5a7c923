//! Online message relay
//!
//! Delivers push envelopes to the live gateway connections of target users
//! and reports one outcome per (user, platform) attempted. Per-connection
//! write failures are always recorded as outcomes and never abort the rest
//! of a fan-out.

use crate::error::{RelayError, Result};
use crate::metrics;
use crate::models::{
    DeliveryOutcome, OnlinePlatformStatus, Platform, PlatformOutcome, UserPushResult,
};
use crate::nova::online_relay::v1::{MsgData, MsgDataList};
use crate::services::auth::ManagerAuthorizer;
use crate::services::filter::{PlatformBatch, PlatformMessageFilter};
use crate::websocket::{envelope, ConnectionStore, PushConnection, SharedConnection};
use bytes::Bytes;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

const PUSH_TO_USER: &str = "OnlinePushMsg";
const PUSH_SAME_TO_USERS: &str = "SuperGroupOnlineBatchPushOneMsg";
const PUSH_FILTERED_TO_USERS: &str = "OnlineBatchPushOneMsg";

#[derive(Clone)]
pub struct RelayService {
    store: Arc<dyn ConnectionStore>,
    filter: Arc<dyn PlatformMessageFilter>,
    authorizer: Arc<ManagerAuthorizer>,
    push_workers: Arc<Semaphore>,
}

impl RelayService {
    /// `max_push_workers` caps the per-user workers running at once across
    /// all filtered batch pushes.
    pub fn new(
        store: Arc<dyn ConnectionStore>,
        filter: Arc<dyn PlatformMessageFilter>,
        authorizer: Arc<ManagerAuthorizer>,
        max_push_workers: usize,
    ) -> Self {
        Self {
            store,
            filter,
            authorizer,
            push_workers: Arc::new(Semaphore::new(max_push_workers.max(1))),
        }
    }

    /// Push one message to every platform connection of one user
    ///
    /// The result lists every platform in the platform set: one entry per
    /// connection found, or a single `NotConnected` entry.
    pub async fn push_to_user(
        &self,
        operation_id: &str,
        msg_data: &MsgData,
        user_id: &str,
    ) -> Vec<PlatformOutcome> {
        let frame = encode_or_log(operation_id, || envelope::encode_push(operation_id, msg_data));

        let mut targets: Vec<(Platform, Vec<SharedConnection>)> =
            Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            let conns = self
                .store
                .connections_for_user_on_platform(user_id, platform)
                .await;
            targets.push((platform, conns));
        }

        let writes = targets
            .iter()
            .flat_map(|(_, conns)| conns.iter())
            .map(|conn| deliver(conn, frame.as_ref(), operation_id, PUSH_TO_USER));
        let mut delivered = join_all(writes).await.into_iter();

        let mut outcomes = Vec::with_capacity(targets.len());
        let mut any_connected = false;
        for (platform, conns) in &targets {
            if conns.is_empty() {
                metrics::record_delivery(PUSH_TO_USER, DeliveryOutcome::NotConnected);
                outcomes.push(PlatformOutcome::new(
                    user_id,
                    *platform,
                    DeliveryOutcome::NotConnected,
                ));
                continue;
            }
            any_connected = true;
            for _ in conns {
                let outcome = delivered.next().unwrap_or(DeliveryOutcome::SendFailed);
                outcomes.push(PlatformOutcome::new(user_id, *platform, outcome));
            }
        }

        if !any_connected {
            debug!(
                operation_id = %operation_id,
                user_id = %user_id,
                "Push skipped, no live connection for user"
            );
        }

        outcomes
    }

    /// Push one identical message to many users, one user at a time
    ///
    /// Only successful deliveries to push-terminal platforms are listed in a
    /// user's outcomes. Users without connections get an empty entry.
    pub async fn push_same_to_users(
        &self,
        operation_id: &str,
        msg_data: &MsgData,
        user_ids: &[String],
    ) -> Vec<UserPushResult> {
        let frame = encode_or_log(operation_id, || envelope::encode_push(operation_id, msg_data));

        let mut results = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            let mut result = UserPushResult::empty(user_id.clone());
            let conns = self.store.connections_for_user(user_id).await;

            let outcomes = join_all(
                conns
                    .iter()
                    .map(|conn| deliver(conn, frame.as_ref(), operation_id, PUSH_SAME_TO_USERS)),
            )
            .await;

            for (conn, outcome) in conns.iter().zip(outcomes) {
                if outcome.is_delivered() && conn.platform().is_push_terminal() {
                    result.record_terminal_delivery(conn.platform());
                }
            }
            results.push(result);
        }

        results
    }

    /// Push a filtered batch to many users, one concurrent worker per user
    ///
    /// Each worker asks the platform filter what its user's platforms still
    /// need and pushes a platform-specific envelope. Every write is reported
    /// per connection as `Delivered` or `SendFailed`. Returns once every
    /// worker has finished, with one entry per requested user in request
    /// order.
    pub async fn push_filtered_to_users(
        &self,
        operation_id: &str,
        msg_data: MsgData,
        user_ids: &[String],
    ) -> Result<Vec<UserPushResult>> {
        let batch = Arc::new(envelope::decode_batch(&msg_data)?);
        let msg_data = Arc::new(msg_data);
        let operation_id: Arc<str> = Arc::from(operation_id);

        let mut workers = JoinSet::new();
        for (slot, user_id) in user_ids.iter().enumerate() {
            let permit = self
                .push_workers
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| RelayError::Internal("push worker pool closed".into()))?;

            let store = self.store.clone();
            let filter = self.filter.clone();
            let operation_id = operation_id.clone();
            let msg_data = msg_data.clone();
            let batch = batch.clone();
            let user_id = user_id.clone();

            workers.spawn(async move {
                let result = push_filtered_to_user(
                    store.as_ref(),
                    filter.as_ref(),
                    &operation_id,
                    &msg_data,
                    &batch,
                    user_id,
                )
                .await;
                drop(permit);
                (slot, result)
            });
        }

        let mut slots: Vec<Option<UserPushResult>> = vec![None; user_ids.len()];
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((slot, result)) => slots[slot] = Some(result),
                Err(e) => error!(
                    operation_id = %operation_id,
                    error = %e,
                    "Batch push worker failed"
                ),
            }
        }

        Ok(slots
            .into_iter()
            .zip(user_ids)
            .map(|(slot, user_id)| slot.unwrap_or_else(|| UserPushResult::empty(user_id.clone())))
            .collect())
    }

    /// Report the distinct online platforms of each user
    ///
    /// Only manager callers may query. Offline users are left out.
    pub async fn query_online_status(
        &self,
        caller_id: &str,
        user_ids: &[String],
    ) -> Result<Vec<OnlinePlatformStatus>> {
        if !self.authorizer.is_manager(caller_id) {
            warn!(caller_id = %caller_id, "Online status query denied");
            return Err(RelayError::AccessDenied);
        }

        let mut statuses = Vec::new();
        for user_id in user_ids {
            let conns = self.store.connections_for_user(user_id).await;

            let mut platforms: Vec<Platform> = Vec::new();
            for conn in &conns {
                if !platforms.contains(&conn.platform()) {
                    platforms.push(conn.platform());
                }
            }

            if !platforms.is_empty() {
                statuses.push(OnlinePlatformStatus {
                    user_id: user_id.clone(),
                    platforms,
                });
            }
        }

        Ok(statuses)
    }

    /// Send a kick frame to each matching connection of the given users
    ///
    /// `platform` of `None` matches every platform. Returns the number of
    /// kick frames sent.
    pub async fn kick_users(&self, user_ids: &[String], platform: Option<Platform>) -> usize {
        let mut kicked = 0;
        for user_id in user_ids {
            for conn in self.store.connections_for_user(user_id).await {
                if platform.map_or(true, |p| p == conn.platform()) {
                    conn.send_kick().await;
                    kicked += 1;
                }
            }
        }
        kicked
    }
}

async fn push_filtered_to_user(
    store: &dyn ConnectionStore,
    filter: &dyn PlatformMessageFilter,
    operation_id: &str,
    msg_data: &MsgData,
    batch: &MsgDataList,
    user_id: String,
) -> UserPushResult {
    let mut result = UserPushResult::empty(user_id.clone());

    let mut by_platform: BTreeMap<Platform, Vec<SharedConnection>> = BTreeMap::new();
    for conn in store.connections_for_user(&user_id).await {
        by_platform.entry(conn.platform()).or_default().push(conn);
    }
    if by_platform.is_empty() {
        return result;
    }

    let platforms: Vec<Platform> = by_platform.keys().copied().collect();
    let decisions = filter
        .filter_for_platforms(operation_id, batch, &user_id, &platforms)
        .await;

    for (platform, decision) in decisions {
        match decision {
            PlatformBatch::Filtered(list) => {
                let Some(conns) = by_platform.get(&platform) else {
                    continue;
                };
                let frame = encode_or_log(operation_id, || {
                    envelope::encode_batch_push(operation_id, msg_data, &list)
                });
                let outcomes = join_all(conns.iter().map(|conn| {
                    deliver(conn, frame.as_ref(), operation_id, PUSH_FILTERED_TO_USERS)
                }))
                .await;

                for outcome in outcomes {
                    result.record(platform, outcome);
                }
            }
            PlatformBatch::AlreadySynced => {
                if platform.is_push_terminal() {
                    result.record_terminal_delivery(platform);
                }
            }
        }
    }

    result
}

fn encode_or_log(operation_id: &str, encode: impl FnOnce() -> Result<Bytes>) -> Option<Bytes> {
    match encode() {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!(operation_id = %operation_id, error = %e, "Push envelope encode failed");
            None
        }
    }
}

/// Write one frame to one connection
///
/// A missing frame (encode failure) is reported as `SendFailed` without
/// touching the connection.
async fn deliver(
    conn: &SharedConnection,
    frame: Option<&Bytes>,
    operation_id: &str,
    method: &'static str,
) -> DeliveryOutcome {
    let outcome = match frame {
        Some(frame) => match conn.write_frame(frame.clone()).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                error!(
                    operation_id = %operation_id,
                    user_id = %conn.user_id(),
                    platform = %conn.platform(),
                    remote_addr = %conn.remote_addr(),
                    error = %e,
                    "Push to connection failed"
                );
                DeliveryOutcome::SendFailed
            }
        },
        None => DeliveryOutcome::SendFailed,
    };
    metrics::record_delivery(method, outcome);
    outcome
}
