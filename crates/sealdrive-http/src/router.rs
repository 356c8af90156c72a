//! Path and method routing for the `/api/v1` surface.
//!
//! The router maps `(method, path)` to an [`ApiRoute`], parsing embedded
//! entity ids as it goes. Unknown paths and malformed ids surface as
//! `NotFound` / `BadRequest` before any handler runs.

use http::Method;

use sealdrive_core::{EntityId, ServiceError, ServiceResult, UserId};

/// Which collection listing the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionQuery {
    /// `?parent={id}`: direct children of a collection.
    Parent(EntityId),
    /// `?root=1`: the caller's root collections.
    Roots,
    /// `?shared=1`: collections shared with the caller.
    Shared,
}

/// A routed API operation with its path captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRoute {
    /// `GET /api/v1/version` (unauthenticated).
    Version,
    /// `POST /api/v1/collections`.
    CreateCollection,
    /// `GET /api/v1/collections?...`.
    ListCollections(CollectionQuery),
    /// `GET /api/v1/collections/{id}`.
    GetCollection(EntityId),
    /// `PATCH /api/v1/collections/{id}`.
    UpdateCollection(EntityId),
    /// `DELETE /api/v1/collections/{id}`.
    SoftDeleteCollection(EntityId),
    /// `POST /api/v1/collections/{id}/move`.
    MoveCollection(EntityId),
    /// `POST /api/v1/collections/{id}/archive`.
    ArchiveCollection(EntityId),
    /// `POST /api/v1/collections/{id}/restore`.
    RestoreCollection(EntityId),
    /// `GET /api/v1/collections/{id}/hierarchy`.
    GetHierarchy(EntityId),
    /// `POST /api/v1/collections/{id}/members`.
    ShareCollection(EntityId),
    /// `PATCH /api/v1/collections/{id}/members/{user}`.
    UpdateMemberPermission(EntityId, UserId),
    /// `DELETE /api/v1/collections/{id}/members/{user}`.
    UnshareCollection(EntityId, UserId),
    /// `POST /api/v1/files/pending`.
    CreatePendingFile,
    /// `POST /api/v1/files/delete-many`.
    DeleteManyFiles,
    /// `GET /api/v1/files?collection={id}`.
    ListFilesByCollection(EntityId),
    /// `GET /api/v1/files/{id}`.
    GetFile(EntityId),
    /// `PATCH /api/v1/files/{id}`.
    UpdateFile(EntityId),
    /// `DELETE /api/v1/files/{id}`.
    SoftDeleteFile(EntityId),
    /// `POST /api/v1/files/{id}/complete`.
    CompleteUpload(EntityId),
    /// `GET /api/v1/files/{id}/download`.
    DownloadFile(EntityId),
    /// `POST /api/v1/files/{id}/archive`.
    ArchiveFile(EntityId),
    /// `POST /api/v1/files/{id}/restore`.
    RestoreFile(EntityId),
    /// `GET /api/v1/sync/collections`.
    SyncCollections,
    /// `GET /api/v1/sync/files`.
    SyncFiles,
}

impl ApiRoute {
    /// Whether this route is served without a bearer token.
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Version)
    }
}

/// A routed request: the operation plus the parsed query string.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// The identified operation.
    pub route: ApiRoute,
    /// Query parameters in request order.
    pub query_params: Vec<(String, String)>,
}

impl RoutingContext {
    /// First value of a query parameter, if present.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Resolve `(method, path, query)` to a [`RoutingContext`].
///
/// # Errors
///
/// - [`ServiceError::NotFound`] for unknown paths or methods.
/// - [`ServiceError::BadRequest`] for malformed embedded ids.
pub fn resolve(method: &Method, path: &str, query: Option<&str>) -> ServiceResult<RoutingContext> {
    let query_params = parse_query_params(query.unwrap_or(""));
    let segments: Vec<&str> = path
        .strip_prefix("/api/v1/")
        .map(|rest| rest.split('/').filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let route = match (method, segments.as_slice()) {
        (&Method::GET, ["version"]) => ApiRoute::Version,

        (&Method::POST, ["collections"]) => ApiRoute::CreateCollection,
        (&Method::GET, ["collections"]) => {
            ApiRoute::ListCollections(collection_query(&query_params)?)
        }
        (&Method::GET, ["collections", id]) => ApiRoute::GetCollection(entity_id(id)?),
        (&Method::PATCH, ["collections", id]) => ApiRoute::UpdateCollection(entity_id(id)?),
        (&Method::DELETE, ["collections", id]) => ApiRoute::SoftDeleteCollection(entity_id(id)?),
        (&Method::POST, ["collections", id, "move"]) => ApiRoute::MoveCollection(entity_id(id)?),
        (&Method::POST, ["collections", id, "archive"]) => {
            ApiRoute::ArchiveCollection(entity_id(id)?)
        }
        (&Method::POST, ["collections", id, "restore"]) => {
            ApiRoute::RestoreCollection(entity_id(id)?)
        }
        (&Method::GET, ["collections", id, "hierarchy"]) => {
            ApiRoute::GetHierarchy(entity_id(id)?)
        }
        (&Method::POST, ["collections", id, "members"]) => {
            ApiRoute::ShareCollection(entity_id(id)?)
        }
        (&Method::PATCH, ["collections", id, "members", user]) => {
            ApiRoute::UpdateMemberPermission(entity_id(id)?, user_id(user)?)
        }
        (&Method::DELETE, ["collections", id, "members", user]) => {
            ApiRoute::UnshareCollection(entity_id(id)?, user_id(user)?)
        }

        (&Method::POST, ["files", "pending"]) => ApiRoute::CreatePendingFile,
        (&Method::POST, ["files", "delete-many"]) => ApiRoute::DeleteManyFiles,
        (&Method::GET, ["files"]) => {
            let collection = query_params
                .iter()
                .find(|(n, _)| n == "collection")
                .map(|(_, v)| v.as_str())
                .ok_or_else(|| ServiceError::BadRequest {
                    field: "collection".to_owned(),
                    message: "required query parameter".to_owned(),
                })?;
            ApiRoute::ListFilesByCollection(entity_id(collection)?)
        }
        (&Method::GET, ["files", id]) => ApiRoute::GetFile(entity_id(id)?),
        (&Method::PATCH, ["files", id]) => ApiRoute::UpdateFile(entity_id(id)?),
        (&Method::DELETE, ["files", id]) => ApiRoute::SoftDeleteFile(entity_id(id)?),
        (&Method::POST, ["files", id, "complete"]) => ApiRoute::CompleteUpload(entity_id(id)?),
        (&Method::GET, ["files", id, "download"]) => ApiRoute::DownloadFile(entity_id(id)?),
        (&Method::POST, ["files", id, "archive"]) => ApiRoute::ArchiveFile(entity_id(id)?),
        (&Method::POST, ["files", id, "restore"]) => ApiRoute::RestoreFile(entity_id(id)?),

        (&Method::GET, ["sync", "collections"]) => ApiRoute::SyncCollections,
        (&Method::GET, ["sync", "files"]) => ApiRoute::SyncFiles,

        _ => {
            return Err(ServiceError::NotFound {
                entity: "route".to_owned(),
                id: format!("{method} {path}"),
            });
        }
    };

    Ok(RoutingContext {
        route,
        query_params,
    })
}

/// Decide which collection listing `?parent=` / `?root=1` / `?shared=1`
/// selects.
fn collection_query(params: &[(String, String)]) -> ServiceResult<CollectionQuery> {
    for (name, value) in params {
        match name.as_str() {
            "parent" => return Ok(CollectionQuery::Parent(entity_id(value)?)),
            "root" if value == "1" => return Ok(CollectionQuery::Roots),
            "shared" if value == "1" => return Ok(CollectionQuery::Shared),
            _ => {}
        }
    }
    Err(ServiceError::BadRequest {
        field: "query".to_owned(),
        message: "expected one of parent={id}, root=1, shared=1".to_owned(),
    })
}

fn entity_id(raw: &str) -> ServiceResult<EntityId> {
    raw.parse()
}

fn user_id(raw: &str) -> ServiceResult<UserId> {
    raw.parse()
}

/// Parse a raw query string into ordered pairs. Values are not
/// percent-decoded beyond what ids and cursors need (both are URL-safe).
fn parse_query_params(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (name.to_owned(), value.to_owned()),
            None => (pair.to_owned(), String::new()),
        })
        .collect()
}
