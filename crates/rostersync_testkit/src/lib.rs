//! # rostersync testkit
//!
//! Test utilities for rostersync.
//!
//! This crate provides:
//! - Sample records and a harness wiring in-memory stores to an orchestrator
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rostersync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn merges_remote_rows() {
//!     let harness = TestHarness::new();
//!     harness.seed_remote(&[alice()]);
//!     harness.orchestrator.differential_sync().await.unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}
