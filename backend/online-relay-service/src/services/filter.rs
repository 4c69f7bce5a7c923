use crate::models::Platform;
use crate::nova::online_relay::v1::MsgDataList;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Per-platform content decision for one recipient
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformBatch {
    /// Push this platform-specific list
    Filtered(MsgDataList),
    /// The client on this platform already holds the content; acknowledge
    /// without writing
    AlreadySynced,
}

/// Decides what each of a recipient's platforms still needs from a batch
#[async_trait]
pub trait PlatformMessageFilter: Send + Sync {
    async fn filter_for_platforms(
        &self,
        operation_id: &str,
        batch: &MsgDataList,
        user_id: &str,
        platforms: &[Platform],
    ) -> BTreeMap<Platform, PlatformBatch>;
}

/// Drops the messages a user sent from the same platform they are pushed to
///
/// The sending client already has its own messages, so echoing them back is
/// skipped. A platform left with nothing to push is reported as
/// [`PlatformBatch::AlreadySynced`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SenderEchoFilter;

impl SenderEchoFilter {
    fn filter_one(batch: &MsgDataList, user_id: &str, platform: Platform) -> PlatformBatch {
        let remaining: Vec<_> = batch
            .msg_data_list
            .iter()
            .filter(|m| !(m.send_id == user_id && m.sender_platform_id == platform.id()))
            .cloned()
            .collect();

        if remaining.is_empty() {
            PlatformBatch::AlreadySynced
        } else {
            PlatformBatch::Filtered(MsgDataList {
                msg_data_list: remaining,
            })
        }
    }
}

#[async_trait]
impl PlatformMessageFilter for SenderEchoFilter {
    async fn filter_for_platforms(
        &self,
        operation_id: &str,
        batch: &MsgDataList,
        user_id: &str,
        platforms: &[Platform],
    ) -> BTreeMap<Platform, PlatformBatch> {
        let decisions: BTreeMap<_, _> = platforms
            .iter()
            .map(|&platform| (platform, Self::filter_one(batch, user_id, platform)))
            .collect();

        tracing::trace!(
            operation_id = %operation_id,
            user_id = %user_id,
            platforms = decisions.len(),
            "Filtered batch for platforms"
        );

        decisions
    }
}
