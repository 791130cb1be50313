//! Local and remote identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-local identity assigned by the local store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub u64);

impl LocalId {
    /// Returns the raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity assigned by the remote sheet on first upload (the `ID` column).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Creates a remote id, trimming surrounding whitespace.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the numeric value of the id, if it has one.
    pub fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for RemoteId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Whether a record has been uploaded to the remote sheet yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Identity {
    /// The remote sheet has assigned this id.
    Remote(RemoteId),
    /// Not synced yet.
    #[default]
    Pending,
}

impl Identity {
    /// Returns the remote id, if assigned.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        match self {
            Identity::Remote(id) => Some(id),
            Identity::Pending => None,
        }
    }

    /// Returns true if the record has never been uploaded.
    pub fn is_pending(&self) -> bool {
        matches!(self, Identity::Pending)
    }
}

/// Key used to pair records across stores.
///
/// Remote ids take precedence; the business key is the fallback for records
/// that have not been uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKey {
    /// Matched by remote id.
    Remote(RemoteId),
    /// Matched by business key.
    Business(String),
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::Remote(id) => write!(f, "remote:{id}"),
            MatchKey::Business(key) => write!(f, "key:{key}"),
        }
    }
}

/// Bookkeeping fields carried by every record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Local id, `None` until the local store inserts the record.
    pub local_id: Option<LocalId>,
    /// Remote identity.
    pub identity: Identity,
    /// Unix milliseconds of the last local mutation.
    pub last_modified: u64,
}

impl RecordMeta {
    /// Metadata for a record read from the remote sheet.
    pub fn remote(id: RemoteId, last_modified: u64) -> Self {
        Self {
            local_id: None,
            identity: Identity::Remote(id),
            last_modified,
        }
    }
}

/// Joins business key components: trimmed, lowercased, `|` separated.
pub fn normalize_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_id_trims_and_parses() {
        let id = RemoteId::new("  42 ");
        assert_eq!(id.as_str(), "42");
        assert_eq!(id.as_number(), Some(42));
        assert_eq!(RemoteId::new("abc").as_number(), None);
    }

    #[test]
    fn identity_accessors() {
        assert!(Identity::Pending.is_pending());
        assert_eq!(Identity::Pending.remote_id(), None);

        let remote = Identity::Remote(RemoteId::from(7));
        assert!(!remote.is_pending());
        assert_eq!(remote.remote_id(), Some(&RemoteId::from("7")));
    }

    #[test]
    fn key_normalization() {
        assert_eq!(normalize_key(&[" Alice ", "A@X.org", ""]), "alice|a@x.org|");
    }
}
