//! SealDrive core engines.
//!
//! [`SealDrive`] is the provider owning the metadata stores, the object
//! store, the lock service, and the configuration. The operations are
//! grouped by engine:
//!
//! - collection graph: create, move, state transitions, tree queries
//! - membership & access: hierarchical share/unshare, permission checks
//! - file lifecycle: three-step upload, presigned downloads, state machine
//! - sync: cursor-paged deltas over collections and files
//!
//! An orphan reaper sweeps abandoned pending uploads.

mod access;
mod ops;
mod provider;
mod reaper;

pub use provider::SealDrive;
pub use reaper::ReapStats;
