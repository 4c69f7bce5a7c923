use super::Platform;
use serde::{Deserialize, Serialize};

/// Result of one attempted send to one (user, platform) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    /// The frame was handed to the connection's writer
    Delivered,
    /// No live connection existed for the platform
    NotConnected,
    /// A live connection existed but the write failed
    SendFailed,
}

impl DeliveryOutcome {
    /// Wire result code reported to upstream callers
    pub fn result_code(self) -> i64 {
        match self {
            DeliveryOutcome::Delivered => 0,
            DeliveryOutcome::NotConnected => -1,
            DeliveryOutcome::SendFailed => -2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::NotConnected => "not_connected",
            DeliveryOutcome::SendFailed => "send_failed",
        }
    }

    pub fn is_delivered(self) -> bool {
        self == DeliveryOutcome::Delivered
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformOutcome {
    pub user_id: String,
    pub platform: Platform,
    pub outcome: DeliveryOutcome,
}

impl PlatformOutcome {
    pub fn new(user_id: impl Into<String>, platform: Platform, outcome: DeliveryOutcome) -> Self {
        Self {
            user_id: user_id.into(),
            platform,
            outcome,
        }
    }
}

/// Per-user entry of a batch push response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPushResult {
    pub user_id: String,
    /// At least one push-terminal platform received the message
    pub pushed_via_terminal: bool,
    pub outcomes: Vec<PlatformOutcome>,
}

impl UserPushResult {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            pushed_via_terminal: false,
            outcomes: Vec::new(),
        }
    }

    /// Record a delivery that counts toward the terminal push flag
    pub(crate) fn record_terminal_delivery(&mut self, platform: Platform) {
        self.record(platform, DeliveryOutcome::Delivered);
    }

    /// Record one per-connection outcome; terminal successes raise the flag
    pub(crate) fn record(&mut self, platform: Platform, outcome: DeliveryOutcome) {
        if outcome.is_delivered() && platform.is_push_terminal() {
            self.pushed_via_terminal = true;
        }
        self.outcomes
            .push(PlatformOutcome::new(self.user_id.clone(), platform, outcome));
    }
}

/// One user's online platforms, as returned by the status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlinePlatformStatus {
    pub user_id: String,
    pub platforms: Vec<Platform>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_codes() {
        assert_eq!(DeliveryOutcome::Delivered.result_code(), 0);
        assert_eq!(DeliveryOutcome::NotConnected.result_code(), -1);
        assert_eq!(DeliveryOutcome::SendFailed.result_code(), -2);
    }

    #[test]
    fn test_record_terminal_delivery_raises_flag() {
        let mut result = UserPushResult::empty("u1");
        assert!(!result.pushed_via_terminal);

        result.record_terminal_delivery(Platform::Ios);

        assert!(result.pushed_via_terminal);
        assert_eq!(
            result.outcomes,
            vec![PlatformOutcome::new("u1", Platform::Ios, DeliveryOutcome::Delivered)]
        );
    }

    #[test]
    fn test_record_keeps_failures_without_raising_flag() {
        let mut result = UserPushResult::empty("u1");

        result.record(Platform::Android, DeliveryOutcome::SendFailed);
        result.record(Platform::Web, DeliveryOutcome::Delivered);

        assert!(!result.pushed_via_terminal);
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes[0].outcome, DeliveryOutcome::SendFailed);
    }
}
