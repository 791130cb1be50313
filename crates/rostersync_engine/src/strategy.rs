//! Startup sync policy.

use std::fmt;

/// What a compound startup sync should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStrategy {
    /// Upload local data over an empty remote (backup).
    LocalWins,
    /// Replace empty local data with the remote (full sync).
    RemoteWins,
    /// Both sides have data: differential sync.
    Merge,
    /// Both sides are empty.
    Nothing,
}

impl SyncStrategy {
    /// Returns the strategy name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStrategy::LocalWins => "local-wins",
            SyncStrategy::RemoteWins => "remote-wins",
            SyncStrategy::Merge => "merge",
            SyncStrategy::Nothing => "nothing",
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the startup strategy from total row counts on each side.
pub fn choose_strategy(local_rows: usize, remote_rows: usize) -> SyncStrategy {
    match (local_rows, remote_rows) {
        (0, 0) => SyncStrategy::Nothing,
        (_, 0) => SyncStrategy::LocalWins,
        (0, _) => SyncStrategy::RemoteWins,
        _ => SyncStrategy::Merge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_table() {
        assert_eq!(choose_strategy(0, 0), SyncStrategy::Nothing);
        assert_eq!(choose_strategy(4, 0), SyncStrategy::LocalWins);
        assert_eq!(choose_strategy(0, 4), SyncStrategy::RemoteWins);
        assert_eq!(choose_strategy(1, 1), SyncStrategy::Merge);
    }

    #[test]
    fn display() {
        assert_eq!(SyncStrategy::RemoteWins.to_string(), "remote-wins");
    }
}
