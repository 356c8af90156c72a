//! HTTP surface for SealDrive.
//!
//! The pipeline per request: route the path to an [`ApiRoute`], authenticate
//! the bearer token (everything but the version endpoint), collect the body,
//! dispatch to the engine, and serialize the result (or a
//! [`sealdrive_core::ServiceError`]) as JSON.

pub mod body;
pub mod dispatch;
pub mod response;
pub mod router;
pub mod service;

pub use body::ApiResponseBody;
pub use router::{ApiRoute, CollectionQuery, RoutingContext};
pub use service::ApiHttpService;
