//! Opaque identifier types shared across services.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::ServiceError;

/// Number of raw bytes in an identifier (96 bits).
const ID_LEN: usize = 12;

/// Length of the canonical lowercase-hex rendering.
const ID_HEX_LEN: usize = ID_LEN * 2;

/// Opaque 96-bit entity identifier.
///
/// Identifies collections and files. The canonical textual form is 24
/// lowercase hex characters; ordering is the byte order of the raw id, which
/// the sync engine relies on as a total-order tie-break.
///
/// # Examples
///
/// ```
/// use sealdrive_core::EntityId;
///
/// let id = EntityId::generate();
/// let parsed: EntityId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId([u8; ID_LEN]);

impl EntityId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create an identifier from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw identifier bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// The canonical 24-character lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.to_hex())
    }
}

impl FromStr for EntityId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_id_hex(s)?;
        Ok(Self(bytes))
    }
}

impl serde::Serialize for EntityId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for EntityId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque 96-bit user identifier.
///
/// Same shape as [`EntityId`] but a distinct type so owners, recipients, and
/// entities cannot be mixed up at API boundaries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId([u8; ID_LEN]);

impl UserId {
    /// Generate a fresh random user identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create a user identifier from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// The canonical 24-character lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.to_hex())
    }
}

impl FromStr for UserId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_id_hex(s)?;
        Ok(Self(bytes))
    }
}

impl serde::Serialize for UserId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for UserId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Decode a 24-character lowercase hex id into raw bytes.
fn decode_id_hex(s: &str) -> Result<[u8; ID_LEN], ServiceError> {
    if s.len() != ID_HEX_LEN {
        return Err(ServiceError::BadRequest {
            field: "id".to_owned(),
            message: format!("identifier must be {ID_HEX_LEN} hex characters, got {}", s.len()),
        });
    }
    let decoded = hex::decode(s).map_err(|_| ServiceError::BadRequest {
        field: "id".to_owned(),
        message: "identifier must be lowercase hex".to_owned(),
    })?;
    let mut bytes = [0u8; ID_LEN];
    bytes.copy_from_slice(&decoded);
    Ok(bytes)
}
