//! Error types for bearer-token authentication.

/// Errors that can occur while verifying a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header is not of the form `JWT <token>`.
    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    /// The token is not three dot-separated base64url segments.
    #[error("Malformed token")]
    MalformedToken,

    /// The token's `alg` is not HS256.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The computed signature does not match the token's signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The token's `exp` claim is in the past.
    #[error("Token has expired")]
    TokenExpired,

    /// The claims payload is missing a required field or is not valid JSON.
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),
}
