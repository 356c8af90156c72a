//! Sync cursor and delta projections.
//!
//! The sync order is the lexicographic pair `(modified_at asc, id asc)`. A
//! cursor names the last item a client has seen; pages contain items strictly
//! after it. Projections carry only plaintext structure, never encrypted
//! payloads or object keys.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sealdrive_core::{EntityId, ServiceError};

use crate::types::{CollectionState, FileState};

/// Position in the `(modified_at, id)` total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// `modified_at` of the last item returned.
    #[serde(rename = "m")]
    pub modified_at: DateTime<Utc>,
    /// Id of the last item returned, the tie-break within one instant.
    #[serde(rename = "i")]
    pub id: EntityId,
}

impl SyncCursor {
    /// Whether an item at `(modified_at, id)` sorts strictly after this
    /// cursor.
    #[must_use]
    pub fn precedes(&self, modified_at: DateTime<Utc>, id: EntityId) -> bool {
        (modified_at, id) > (self.modified_at, self.id)
    }

    /// Encode to the opaque wire form (URL-safe base64 of the JSON pair).
    #[must_use]
    pub fn encode(&self) -> String {
        // Serialization of a two-field struct cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode the opaque wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] on malformed input.
    pub fn decode(token: &str) -> Result<Self, ServiceError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| bad_cursor("not base64"))?;
        serde_json::from_slice(&bytes).map_err(|_| bad_cursor("malformed payload"))
    }
}

fn bad_cursor(message: &str) -> ServiceError {
    ServiceError::BadRequest {
        field: "cursor".to_owned(),
        message: message.to_owned(),
    }
}

/// One collection delta, including `deleted` tombstones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSyncItem {
    /// Collection identifier.
    pub id: EntityId,
    /// Version at scan time; clients deduplicate on `(id, version)`.
    pub version: u64,
    /// Last mutation instant.
    pub modified_at: DateTime<Utc>,
    /// Lifecycle state, `deleted` included so clients can tombstone.
    pub state: CollectionState,
    /// Parent collection, absent for roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
}

/// One file delta. Pending files are included so clients observe completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSyncItem {
    /// File identifier.
    pub id: EntityId,
    /// The collection the file lives in.
    pub collection_id: EntityId,
    /// Version at scan time; clients deduplicate on `(id, version)`.
    pub version: u64,
    /// Last mutation instant.
    pub modified_at: DateTime<Utc>,
    /// Lifecycle state.
    pub state: FileState,
}

/// One page of a cursor scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPage<T> {
    /// Items strictly after the request cursor, in `(modified_at, id)` order.
    pub items: Vec<T>,
    /// Whether more items remain past this page.
    pub has_more: bool,
    /// Cursor at the last returned item; present iff `has_more`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}
