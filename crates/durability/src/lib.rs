//! Durability layer for Hearth
//!
//! Two cooperating persistence mechanisms:
//! - `wal`: an append-only journal of mutations, replayed on startup on
//!   top of the last snapshot.
//! - `snapshot`: a consistent whole-map dump written with the
//!   write-fsync-rename pattern so a reader observes either the old or
//!   the new snapshot, never a torn file.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod snapshot;
pub mod wal;

pub use wal::{Wal, WalEntry, WalOp};
