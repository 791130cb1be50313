//! # rostersync model
//!
//! Data types shared by the rostersync engine and its tools.
//!
//! This crate provides:
//! - The five entity kinds (guests, volunteers, jobs, job types, venues)
//! - Local and remote identities and the identity rule
//! - The sheet row codec (one fixed column layout per kind)
//! - `ChangeSet` and `SyncResult` for differential sync
//! - The page table used by page-scoped sync
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changeset;
mod entity;
mod identity;
mod kind;
mod page;
mod records;
mod row;

pub use changeset::{ChangeSet, KindSummary, SyncResult};
pub use entity::{now_millis, Entity};
pub use identity::{normalize_key, Identity, LocalId, MatchKey, RecordMeta, RemoteId};
pub use kind::{EntityKind, ParseKindError};
pub use page::{kinds_for_navigation, Page, ParsePageError};
pub use records::{Guest, Job, JobTypeConfig, Venue, Volunteer};
pub use row::{parse_rows, ParsedRows, RowError, RowReader, SheetRow};
