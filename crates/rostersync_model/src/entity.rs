//! The entity trait shared by all record kinds.

use crate::identity::{Identity, LocalId, MatchKey, RecordMeta, RemoteId};
use crate::kind::EntityKind;
use crate::row::SheetRow;
use std::fmt::Debug;
use std::time::SystemTime;

/// Returns the current time in unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A record kind that can be synchronized.
///
/// Implementors provide their metadata, a business key and the list of
/// tracked fields; identity matching is derived from those.
pub trait Entity: SheetRow + Clone + Debug + PartialEq + Send + Sync + 'static {
    /// The kind of this entity.
    const KIND: EntityKind;

    /// Returns the bookkeeping fields.
    fn meta(&self) -> &RecordMeta;

    /// Returns the bookkeeping fields mutably.
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Deterministic key built from the semantically-unique fields.
    fn business_key(&self) -> String;

    /// Compares the tracked business fields only.
    ///
    /// Identity fields and `last_modified` are never compared.
    fn same_tracked_fields(&self, other: &Self) -> bool;

    /// Returns the local id.
    fn local_id(&self) -> Option<LocalId> {
        self.meta().local_id
    }

    /// Sets the local id.
    fn set_local_id(&mut self, id: Option<LocalId>) {
        self.meta_mut().local_id = id;
    }

    /// Returns the remote identity.
    fn identity(&self) -> &Identity {
        &self.meta().identity
    }

    /// Sets the remote identity.
    fn set_identity(&mut self, identity: Identity) {
        self.meta_mut().identity = identity;
    }

    /// Returns the remote id, if assigned.
    fn remote_id(&self) -> Option<&RemoteId> {
        self.meta().identity.remote_id()
    }

    /// Returns the last modification time in unix milliseconds.
    fn last_modified(&self) -> u64 {
        self.meta().last_modified
    }

    /// Bumps `last_modified`, never moving it backwards.
    fn touch(&mut self) {
        let meta = self.meta_mut();
        meta.last_modified = now_millis().max(meta.last_modified.saturating_add(1));
    }

    /// Returns the preferred match key (remote id, else business key).
    fn match_key(&self) -> MatchKey {
        match self.remote_id() {
            Some(id) => MatchKey::Remote(id.clone()),
            None => MatchKey::Business(self.business_key()),
        }
    }

    /// Applies the identity rule: remote ids decide when both sides have
    /// one, business keys decide otherwise.
    fn is_same_record(&self, other: &Self) -> bool {
        match (self.remote_id(), other.remote_id()) {
            (Some(a), Some(b)) => a == b,
            _ => self.business_key() == other.business_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Volunteer;

    fn volunteer(remote: Option<&str>, name: &str) -> Volunteer {
        let mut v = Volunteer::new(name, "v@example.org", "555-0100");
        if let Some(id) = remote {
            v.set_identity(Identity::Remote(RemoteId::new(id)));
        }
        v
    }

    #[test]
    fn identity_rule_prefers_remote_ids() {
        // Same business key, different remote ids: different records.
        assert!(!volunteer(Some("1"), "Ann").is_same_record(&volunteer(Some("2"), "Ann")));
        // Same remote id, renamed: same record.
        assert!(volunteer(Some("1"), "Ann").is_same_record(&volunteer(Some("1"), "Anne")));
    }

    #[test]
    fn identity_rule_falls_back_to_business_key() {
        assert!(volunteer(None, "Ann").is_same_record(&volunteer(Some("9"), "ann ")));
        assert!(!volunteer(None, "Ann").is_same_record(&volunteer(None, "Bea")));
    }

    #[test]
    fn touch_is_monotonic() {
        let mut v = volunteer(None, "Ann");
        v.meta_mut().last_modified = u64::MAX - 1;
        v.touch();
        assert_eq!(v.last_modified(), u64::MAX);
    }

    #[test]
    fn match_key_variants() {
        assert_eq!(
            volunteer(Some("3"), "Ann").match_key(),
            MatchKey::Remote(RemoteId::from(3))
        );
        assert!(matches!(volunteer(None, "Ann").match_key(), MatchKey::Business(_)));
    }
}
