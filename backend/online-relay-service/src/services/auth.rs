use std::collections::HashSet;

/// Recognizes manager (administrative) callers
#[derive(Debug, Clone, Default)]
pub struct ManagerAuthorizer {
    manager_ids: HashSet<String>,
}

impl ManagerAuthorizer {
    pub fn new<I, S>(manager_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            manager_ids: manager_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_manager(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.manager_ids.contains(user_id)
    }
}
