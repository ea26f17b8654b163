use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Usage of one sender identity within the current epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageRecord {
    pub count: u64,
    pub reserved: u64,
    pub consecutive_failures: u32,
}

impl UsageRecord {
    pub fn remaining(&self, cap: u64) -> u64 {
        cap.saturating_sub(self.count.saturating_add(self.reserved))
    }

    pub fn is_exhausted(&self, cap: u64) -> bool {
        self.count >= cap
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub identity: String,
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub epoch_started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_accounts_for_reservations() {
        let record = UsageRecord {
            count: 20,
            reserved: 5,
            consecutive_failures: 0,
        };
        assert_eq!(record.remaining(28), 3);
        assert!(!record.is_exhausted(28));
    }

    #[test]
    fn remaining_saturates_at_zero() {
        let record = UsageRecord {
            count: 30,
            reserved: 0,
            consecutive_failures: 0,
        };
        assert_eq!(record.remaining(28), 0);
        assert!(record.is_exhausted(28));
    }
}
