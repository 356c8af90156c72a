//! Storage backends for SealDrive.
//!
//! - [`CollectionStore`] and [`FileStore`]: in-memory document stores with
//!   the secondary-index query surface the engines rely on (owner, parent,
//!   ancestor containment, member recipient, sync scans) and per-document
//!   update atomicity.
//! - [`ObjectStore`]: the seam to the ciphertext object store, with
//!   [`MemoryObjectStore`] as the in-process implementation.
//! - [`UrlSigner`]: HMAC-signed, time-limited upload/download URLs.

mod collections;
mod files;
mod object;
mod presign;

pub use collections::CollectionStore;
pub use files::FileStore;
pub use object::{MemoryObjectStore, ObjectStore};
pub use presign::{PresignedRequest, UrlSigner};
