//! Lifecycle states and the permission lattice.

use serde::{Deserialize, Serialize};

/// Kind of collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionType {
    /// General-purpose folder.
    #[default]
    Folder,
    /// Photo album.
    Album,
}

impl CollectionType {
    /// Returns the string value of this enum variant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Album => "album",
        }
    }
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a collection.
///
/// `deleted` is terminal until hard-delete physically removes the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
    /// Visible and writable.
    #[default]
    Active,
    /// Hidden from default listings but recoverable.
    Archived,
    /// Tombstoned; surfaced only to sync and admin recovery paths.
    Deleted,
}

impl CollectionState {
    /// Returns the string value of this enum variant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    /// Whether the `self -> to` transition is allowed.
    ///
    /// Same-state is treated as an allowed no-op. No transition leaves
    /// `deleted`.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        match (self, to) {
            (a, b) if a == b => true,
            (Self::Active, Self::Archived | Self::Deleted)
            | (Self::Archived, Self::Active | Self::Deleted) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for CollectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a file.
///
/// A file starts `pending` (metadata persisted, ciphertext not yet proven
/// present in the object store) and becomes `active` on upload completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Metadata persisted; upload not yet verified.
    #[default]
    Pending,
    /// Upload verified; object present in the object store.
    Active,
    /// Hidden from default listings; object retained.
    Archived,
    /// Tombstoned; object retained until hard-delete.
    Deleted,
}

impl FileState {
    /// Returns the string value of this enum variant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    /// Whether the `self -> to` transition is allowed.
    ///
    /// Same-state is treated as an allowed no-op.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        match (self, to) {
            (a, b) if a == b => true,
            (Self::Pending, Self::Active | Self::Deleted)
            | (Self::Active, Self::Archived | Self::Deleted)
            | (Self::Archived, Self::Active) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission level granted by a membership.
///
/// Levels are totally ordered: `read_only < read_write < admin`; the derived
/// `Ord` follows declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// May read metadata and download.
    #[default]
    ReadOnly,
    /// May create and update files, and manage members at or below this
    /// level.
    ReadWrite,
    /// May move, delete, share, unshare, and change permissions.
    Admin,
}

impl PermissionLevel {
    /// Returns the string value of this enum variant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::ReadWrite => "read_write",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
