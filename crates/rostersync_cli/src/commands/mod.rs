//! CLI command implementations.

pub mod init;
pub mod inspect;
pub mod item;
pub mod ledger;
pub mod sync;
pub mod watch;
