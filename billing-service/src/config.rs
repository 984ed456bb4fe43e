use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Per-insurer appeal rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealPolicy {
    /// Days from denial creation to the appeal deadline
    pub appeal_window_days: i64,
}

impl AppealPolicy {
    pub fn new(appeal_window_days: i64) -> Self {
        Self { appeal_window_days }
    }
}

impl Default for AppealPolicy {
    fn default() -> Self {
        Self {
            appeal_window_days: 30,
        }
    }
}

/// Insurer configuration threaded into the repositories by the caller;
/// insurers without an explicit entry get the default policy
#[derive(Debug, Clone, Default)]
pub struct InsurerDirectory {
    policies: HashMap<Uuid, AppealPolicy>,
    default_policy: AppealPolicy,
}

impl InsurerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, insurer_id: Uuid, policy: AppealPolicy) -> Self {
        self.policies.insert(insurer_id, policy);
        self
    }

    pub fn with_default_policy(mut self, policy: AppealPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn policy_for(&self, insurer_id: Uuid) -> AppealPolicy {
        self.policies
            .get(&insurer_id)
            .copied()
            .unwrap_or(self.default_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_insurers_fall_back_to_the_default_window() {
        let insurer = Uuid::new_v4();
        let directory = InsurerDirectory::new().with_policy(insurer, AppealPolicy::new(45));

        assert_eq!(directory.policy_for(insurer).appeal_window_days, 45);
        assert_eq!(directory.policy_for(Uuid::new_v4()).appeal_window_days, 30);
    }
}
