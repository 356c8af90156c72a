//! Dispatch: routed operation → engine call → JSON response.

use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use sealdrive_core::{ServiceError, ServiceResult, UserId};
use sealdrive_engine::SealDrive;
use sealdrive_model::{
    CreateCollectionInput, CreatePendingFileInput, DeleteManyInput, FileResponse,
    MoveCollectionInput, ShareInput, UpdateCollectionInput, UpdateFileInput,
    UpdateMemberPermissionInput,
};

use crate::body::ApiResponseBody;
use crate::response::{json_response, no_content};
use crate::router::{ApiRoute, CollectionQuery, RoutingContext};
use crate::service::version_response;

/// Execute a routed, authenticated request against the engine.
///
/// # Errors
///
/// Propagates every [`ServiceError`] from the engine; the service layer
/// renders it.
pub async fn dispatch(
    drive: &SealDrive,
    user: UserId,
    ctx: RoutingContext,
    body: Bytes,
) -> ServiceResult<http::Response<ApiResponseBody>> {
    debug!(route = ?ctx.route, user = %user, "dispatching operation");

    let route = ctx.route.clone();
    match route {
        ApiRoute::Version => Ok(version_response()),

        ApiRoute::CreateCollection => {
            let input: CreateCollectionInput = decode(&body)?;
            let collection = drive.create_collection(user, input)?;
            Ok(json_response(StatusCode::CREATED, &collection))
        }
        ApiRoute::ListCollections(query) => {
            let collections = match query {
                CollectionQuery::Parent(parent) => drive.find_by_parent(user, &parent)?,
                CollectionQuery::Roots => drive.find_root_collections(user),
                CollectionQuery::Shared => drive.find_shared_with(user),
            };
            Ok(json_response(StatusCode::OK, &collections))
        }
        ApiRoute::GetCollection(id) => {
            let collection = drive.get_collection(user, &id)?;
            Ok(json_response(StatusCode::OK, &collection))
        }
        ApiRoute::UpdateCollection(id) => {
            let input: UpdateCollectionInput = decode(&body)?;
            let collection = drive.update_collection(user, &id, input)?;
            Ok(json_response(StatusCode::OK, &collection))
        }
        ApiRoute::SoftDeleteCollection(id) => {
            drive.soft_delete_collection(user, &id).await?;
            Ok(no_content())
        }
        ApiRoute::MoveCollection(id) => {
            let input: MoveCollectionInput = decode(&body)?;
            let collection = drive.move_collection(user, &id, input).await?;
            Ok(json_response(StatusCode::OK, &collection))
        }
        ApiRoute::ArchiveCollection(id) => {
            let collection = drive.archive_collection(user, &id)?;
            Ok(json_response(StatusCode::OK, &collection))
        }
        ApiRoute::RestoreCollection(id) => {
            let collection = drive.restore_collection(user, &id)?;
            Ok(json_response(StatusCode::OK, &collection))
        }
        ApiRoute::GetHierarchy(id) => {
            let hierarchy = drive.get_full_hierarchy(user, &id)?;
            Ok(json_response(StatusCode::OK, &hierarchy))
        }
        ApiRoute::ShareCollection(id) => {
            let input: ShareInput = decode(&body)?;
            let collection = drive.add_member_to_hierarchy(user, &id, input).await?;
            Ok(json_response(StatusCode::OK, &collection))
        }
        ApiRoute::UpdateMemberPermission(id, recipient) => {
            let input: UpdateMemberPermissionInput = decode(&body)?;
            let collection = drive
                .update_member_permission(user, &id, &recipient, input)
                .await?;
            Ok(json_response(StatusCode::OK, &collection))
        }
        ApiRoute::UnshareCollection(id, recipient) => {
            drive.remove_member_from_hierarchy(user, &id, &recipient).await?;
            Ok(no_content())
        }

        ApiRoute::CreatePendingFile => {
            let input: CreatePendingFileInput = decode(&body)?;
            let output = drive.create_pending_file(user, input)?;
            Ok(json_response(StatusCode::CREATED, &output))
        }
        ApiRoute::CompleteUpload(id) => {
            let file = drive.complete_upload(user, &id).await?;
            Ok(json_response(StatusCode::OK, &FileResponse::from(&file)))
        }
        ApiRoute::ListFilesByCollection(collection) => {
            let files = drive.list_files_by_collection(user, &collection, None)?;
            let responses: Vec<FileResponse> = files.iter().map(FileResponse::from).collect();
            Ok(json_response(StatusCode::OK, &responses))
        }
        ApiRoute::GetFile(id) => {
            let file = drive.get_file(user, &id)?;
            Ok(json_response(StatusCode::OK, &FileResponse::from(&file)))
        }
        ApiRoute::UpdateFile(id) => {
            let input: UpdateFileInput = decode(&body)?;
            let file = drive.update_file(user, &id, input)?;
            Ok(json_response(StatusCode::OK, &FileResponse::from(&file)))
        }
        ApiRoute::SoftDeleteFile(id) => {
            drive.soft_delete_file(user, &id)?;
            Ok(no_content())
        }
        ApiRoute::DownloadFile(id) => {
            let output = drive.presigned_download(user, &id)?;
            Ok(json_response(StatusCode::OK, &output))
        }
        ApiRoute::ArchiveFile(id) => {
            let file = drive.archive_file(user, &id)?;
            Ok(json_response(StatusCode::OK, &FileResponse::from(&file)))
        }
        ApiRoute::RestoreFile(id) => {
            let file = drive.restore_file(user, &id)?;
            Ok(json_response(StatusCode::OK, &FileResponse::from(&file)))
        }
        ApiRoute::DeleteManyFiles => {
            let input: DeleteManyInput = decode(&body)?;
            let output = drive.delete_many_files(user, input);
            Ok(json_response(StatusCode::OK, &output))
        }

        ApiRoute::SyncCollections => {
            let page = drive.sync_collections(user, ctx.query("cursor"), limit(&ctx)?)?;
            Ok(json_response(StatusCode::OK, &page))
        }
        ApiRoute::SyncFiles => {
            let page = drive.sync_files(user, ctx.query("cursor"), limit(&ctx)?)?;
            Ok(json_response(StatusCode::OK, &page))
        }
    }
}

/// Decode a JSON request body.
fn decode<T: DeserializeOwned>(body: &Bytes) -> ServiceResult<T> {
    serde_json::from_slice(body).map_err(|e| ServiceError::BadRequest {
        field: "body".to_owned(),
        message: e.to_string(),
    })
}

/// Parse the optional `limit` query parameter.
fn limit(ctx: &RoutingContext) -> ServiceResult<Option<usize>> {
    ctx.query("limit")
        .map(|raw| {
            raw.parse::<usize>().map_err(|_| ServiceError::BadRequest {
                field: "limit".to_owned(),
                message: "must be a positive integer".to_owned(),
            })
        })
        .transpose()
}
