use serde::{Deserialize, Serialize};
use std::fmt;

/// Client device platform a gateway connection was opened from
///
/// The numeric ids are part of the wire contract with upstream services and
/// connected clients and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    Ios,
    Android,
    Windows,
    Osx,
    Web,
    MiniWeb,
    Linux,
}

impl Platform {
    /// Every known platform, ordered by id
    pub const ALL: [Platform; 7] = [
        Platform::Ios,
        Platform::Android,
        Platform::Windows,
        Platform::Osx,
        Platform::Web,
        Platform::MiniWeb,
        Platform::Linux,
    ];

    pub fn id(self) -> i32 {
        match self {
            Platform::Ios => 1,
            Platform::Android => 2,
            Platform::Windows => 3,
            Platform::Osx => 4,
            Platform::Web => 5,
            Platform::MiniWeb => 6,
            Platform::Linux => 7,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::Ios => "IOS",
            Platform::Android => "Android",
            Platform::Windows => "Windows",
            Platform::Osx => "OSX",
            Platform::Web => "Web",
            Platform::MiniWeb => "MiniWeb",
            Platform::Linux => "Linux",
        }
    }

    /// Platforms that also receive an out-of-band push notification
    pub fn is_push_terminal(self) -> bool {
        matches!(self, Platform::Ios | Platform::Android)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_ids_are_contiguous() {
        let ids: Vec<i32> = Platform::ALL.iter().map(|p| p.id()).collect();
        assert_eq!(ids, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_from_id() {
        assert_eq!(Platform::from_id(2), Some(Platform::Android));
        assert_eq!(Platform::from_id(7), Some(Platform::Linux));
        assert_eq!(Platform::from_id(0), None);
        assert_eq!(Platform::from_id(8), None);
    }

    #[test]
    fn test_push_terminal_subset() {
        let terminals: Vec<Platform> = Platform::ALL
            .into_iter()
            .filter(|p| p.is_push_terminal())
            .collect();
        assert_eq!(terminals, vec![Platform::Ios, Platform::Android]);
    }

    #[test]
    fn test_names() {
        assert_eq!(Platform::Osx.to_string(), "OSX");
        assert_eq!(Platform::MiniWeb.name(), "MiniWeb");
    }
}
