//! Core building blocks for SealDrive.
//!
//! This crate provides the foundation shared across all SealDrive service
//! crates: opaque entity identifiers, the service-wide error taxonomy,
//! environment-driven configuration, and the named distributed mutex used to
//! serialize cross-document operations across replicas.

mod config;
mod error;
pub mod lock;
mod types;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use lock::{KeyValueStore, LockGuard, LockService, MemoryKeyValueStore};
pub use types::{EntityId, UserId};
