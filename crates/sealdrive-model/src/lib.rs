//! Data model and wire DTOs for SealDrive.
//!
//! All encrypted fields are opaque strings the server never interprets; the
//! model carries only the plaintext structure needed to authorize access,
//! keep the namespace hierarchical, bill storage, and synchronize devices.

mod collection;
mod file;
mod input;
mod output;
mod sync;
mod types;

pub use collection::{Collection, CollectionMembership, CollectionNode};
pub use file::File;
pub use input::{
    CreateCollectionInput, CreatePendingFileInput, DeleteManyInput, MoveCollectionInput,
    ShareInput, UpdateCollectionInput, UpdateFileInput, UpdateMemberPermissionInput,
};
pub use output::{
    CreatePendingFileOutput, DeleteManyOutput, DeleteManyResult, FileResponse,
    PresignedDownloadOutput,
};
pub use sync::{CollectionSyncItem, FileSyncItem, SyncCursor, SyncPage};
pub use types::{CollectionState, CollectionType, FileState, PermissionLevel};
