//! # rostersync engine
//!
//! Keeps an on-device store and a spreadsheet-backed remote store in step
//! for five entity kinds (guests, volunteers, jobs, job types, venues).
//!
//! This crate provides:
//! - Differential comparison of remote and local snapshots
//! - Change application to the local store
//! - A deletion ledger that prevents deleted records from coming back
//! - Retry with exponential backoff for rate-limited remote calls
//! - The sync orchestrator (full sync, backup, differential, page-scoped,
//!   single-item upsert and delete, compound startup sync)
//! - Periodic background sync
//! - A sheet-backed remote store and in-memory stores
//!
//! ## Architecture
//!
//! Every remote-touching operation runs under one async lock:
//! 1. Fetch remote rows (each call retried on rate limits)
//! 2. Compare or replace against the local snapshot
//! 3. Write results locally, or upload local rows
//!
//! ## Key Invariants
//!
//! - Remote ids decide identity when both sides have one
//! - A full sync never wipes local data because of an empty remote
//! - A record deleted locally is never resurrected by a sync
//! - No two operations touch the remote at the same time
//! - A second differential sync over unchanged data finds no changes

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod applier;
mod background;
mod config;
mod diff;
mod error;
mod ledger;
mod memory;
mod orchestrator;
mod retry;
mod sheet;
mod store;
mod strategy;

pub use applier::{apply_changes, ApplyReport};
pub use background::BackgroundSync;
pub use config::{ReplacePolicy, RetryConfig, SyncConfig, DEFAULT_LEDGER_RETENTION};
pub use diff::compare;
pub use error::{EngineResult, SyncError};
pub use ledger::{DeletionLedger, DeletionRecord, LedgerLookup};
pub use memory::{
    MemoryLocalStore, MemorySheet, MemoryStores, SheetCall, SheetFault, SheetOp, Workbook,
};
pub use orchestrator::{DeleteOutcome, SyncOrchestrator, SyncOutcome, SyncStats, UpsertOutcome};
pub use retry::RetryPolicy;
pub use sheet::{SheetClient, SheetRemoteStore};
pub use store::{KindStores, LocalStore, RemoteStore, StoreSet, StoresFor};
pub use strategy::{choose_strategy, SyncStrategy};
