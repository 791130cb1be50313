//! Configuration for the sync engine.

use rostersync_model::EntityKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default retention window for deletion records.
pub const DEFAULT_LEDGER_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// What full sync does with local records the remote snapshot lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacePolicy {
    /// The local table becomes an exact copy of the remote sheet.
    Replace,
    /// Local records never uploaded (pending identity) survive the replace.
    PreserveLocalOnly,
}

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Spreadsheet id of the remote target.
    pub spreadsheet_id: Option<String>,
    /// Retry configuration for individual remote calls.
    pub retry: RetryConfig,
    /// Interval for background differential sync.
    pub sync_interval: Option<Duration>,
    /// How long deletion records are kept.
    pub ledger_retention: Duration,
    /// Full-sync replace policy, indexed like `EntityKind::ALL`.
    replace_policies: [ReplacePolicy; 5],
}

impl SyncConfig {
    /// Creates a configuration targeting the given spreadsheet.
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: Some(spreadsheet_id.into()),
            ..Self::default()
        }
    }

    /// Returns true if a remote target is set.
    pub fn is_configured(&self) -> bool {
        self.spreadsheet_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the background sync interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Sets the deletion ledger retention window.
    pub fn with_ledger_retention(mut self, retention: Duration) -> Self {
        self.ledger_retention = retention;
        self
    }

    /// Sets the full-sync replace policy of one kind.
    pub fn with_replace_policy(mut self, kind: EntityKind, policy: ReplacePolicy) -> Self {
        self.replace_policies[kind_index(kind)] = policy;
        self
    }

    /// Returns the full-sync replace policy of one kind.
    pub fn replace_policy(&self, kind: EntityKind) -> ReplacePolicy {
        self.replace_policies[kind_index(kind)]
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        let mut replace_policies = [ReplacePolicy::Replace; 5];
        // Volunteers are created locally far more often than they are
        // deleted remotely.
        replace_policies[kind_index(EntityKind::Volunteer)] = ReplacePolicy::PreserveLocalOnly;

        Self {
            spreadsheet_id: None,
            retry: RetryConfig::default(),
            sync_interval: None,
            ledger_retention: DEFAULT_LEDGER_RETENTION,
            replace_policies,
        }
    }
}

pub(crate) fn kind_index(kind: EntityKind) -> usize {
    EntityKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or_default()
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Creates a retry configuration with the given attempt budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    ///
    /// Attempt 0 runs immediately; attempt `n` waits
    /// `min(initial * 2^(n-1), max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let doublings = (attempt - 1).min(31);
        self.initial_delay
            .saturating_mul(1u32 << doublings)
            .min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
