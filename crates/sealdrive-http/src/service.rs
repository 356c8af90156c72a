//! The hyper `Service` tying routing, authentication, and dispatch together.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, warn};
use uuid::Uuid;

use sealdrive_auth::{TokenAuthority, parse_authorization_header};
use sealdrive_core::{ServiceError, UserId};
use sealdrive_engine::SealDrive;

use crate::body::ApiResponseBody;
use crate::dispatch::dispatch;
use crate::response::{error_to_response, json_response};
use crate::router;

/// Server version reported by the version endpoint.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The SealDrive HTTP service.
///
/// Clones share the engine and token authority; hyper clones the service per
/// connection.
#[derive(Debug, Clone)]
pub struct ApiHttpService {
    drive: SealDrive,
    tokens: Arc<TokenAuthority>,
}

impl ApiHttpService {
    /// Create a service over the given engine and token authority.
    #[must_use]
    pub fn new(drive: SealDrive, tokens: TokenAuthority) -> Self {
        Self {
            drive,
            tokens: Arc::new(tokens),
        }
    }
}

impl Service<http::Request<Incoming>> for ApiHttpService {
    type Response = http::Response<ApiResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let drive = self.drive.clone();
        let tokens = Arc::clone(&self.tokens);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response = process_request(req, &drive, &tokens, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Process one request: route, authenticate, collect body, dispatch.
async fn process_request(
    req: http::Request<Incoming>,
    drive: &SealDrive,
    tokens: &TokenAuthority,
    request_id: &str,
) -> http::Response<ApiResponseBody> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing request");

    let ctx = match router::resolve(&method, uri.path(), uri.query()) {
        Ok(ctx) => ctx,
        Err(err) => {
            debug!(%method, %uri, error = %err, request_id, "failed to route request");
            return error_to_response(&err);
        }
    };

    if ctx.route.is_public() {
        return version_response();
    }

    let user = match authenticate(req.headers(), tokens) {
        Ok(user) => user,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "authentication failed");
            return error_to_response(&err);
        }
    };

    let (_parts, incoming) = req.into_parts();
    let body = match collect_body(incoming).await {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, request_id, "failed to collect request body");
            return error_to_response(&ServiceError::BadRequest {
                field: "body".to_owned(),
                message: "failed to read request body".to_owned(),
            });
        }
    };

    match dispatch(drive, user, ctx, body).await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, request_id, "operation returned error");
            error_to_response(&err)
        }
    }
}

/// Resolve the caller's user id from the `Authorization: JWT <token>` header.
fn authenticate(
    headers: &http::HeaderMap,
    tokens: &TokenAuthority,
) -> Result<UserId, ServiceError> {
    let header = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized {
            reason: "missing Authorization header".to_owned(),
        })?;

    let token = parse_authorization_header(header).map_err(unauthorized)?;
    let claims = tokens.verify(token).map_err(unauthorized)?;
    claims
        .sub
        .parse::<UserId>()
        .map_err(|_| ServiceError::Unauthorized {
            reason: "token subject is not a user id".to_owned(),
        })
}

fn unauthorized(err: sealdrive_auth::AuthError) -> ServiceError {
    ServiceError::Unauthorized {
        reason: err.to_string(),
    }
}

/// Collect the full body from a hyper `Incoming` stream into `Bytes`.
async fn collect_body(incoming: Incoming) -> Result<Bytes, hyper::Error> {
    let collected = incoming.collect().await?;
    Ok(collected.to_bytes())
}

/// The unauthenticated version probe body.
pub(crate) fn version_response() -> http::Response<ApiResponseBody> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({ "service": "sealdrive", "version": VERSION }),
    )
}

/// Add request-id and server headers to every response.
fn add_common_headers(
    mut response: http::Response<ApiResponseBody>,
    request_id: &str,
) -> http::Response<ApiResponseBody> {
    let headers = response.headers_mut();
    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", hv);
    }
    headers.insert(
        http::header::SERVER,
        http::header::HeaderValue::from_static("SealDrive"),
    );
    response
}
