//! HS256 JWT minting and verification.
//!
//! The wire form is the standard three-segment JWT:
//! `base64url(header).base64url(claims).base64url(signature)` with
//! `{"alg":"HS256","typ":"JWT"}` as the header and an HMAC-SHA256 signature
//! over the first two segments. Signatures are compared in constant time.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, KeyInit, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// The authorization scheme prefix expected on the `Authorization` header.
const SCHEME: &str = "JWT";

/// The only algorithm this implementation accepts.
const SUPPORTED_ALGORITHM: &str = "HS256";

/// JWT header, fixed to HS256.
#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Registered claims carried by SealDrive tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user id (24-char hex).
    pub sub: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Extract the raw token from an `Authorization: JWT <token>` header value.
///
/// # Errors
///
/// Returns [`AuthError::InvalidAuthHeader`] when the scheme is not `JWT` or
/// the token is empty.
pub fn parse_authorization_header(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    if scheme != SCHEME || token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Mints and verifies HS256 tokens with a shared secret.
///
/// # Examples
///
/// ```
/// use sealdrive_auth::TokenAuthority;
///
/// let authority = TokenAuthority::new("secret");
/// let token = authority.mint("00112233445566778899aabb", 3600);
/// let claims = authority.verify(&token).unwrap();
/// assert_eq!(claims.sub, "00112233445566778899aabb");
/// ```
#[derive(Clone)]
pub struct TokenAuthority {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        f.debug_struct("TokenAuthority").finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Create an authority over the given shared secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Mint a token for `sub` valid for `ttl_secs` seconds.
    #[must_use]
    pub fn mint(&self, sub: &str, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_owned(),
            iat: now,
            exp: now + ttl_secs,
        };
        let header = Header {
            alg: SUPPORTED_ALGORITHM.to_owned(),
            typ: SCHEME.to_owned(),
        };

        // Serialization of these two flat structs cannot fail.
        let header_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap_or_default());
        let claims_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default());

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = self.sign(signing_input.as_bytes());
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when the token is malformed, signed with an
    /// unsupported algorithm, carries a bad signature, or has expired.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::MalformedToken);
        };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| AuthError::MalformedToken)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| AuthError::MalformedToken)?;
        if header.alg != SUPPORTED_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        let provided = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::MalformedToken)?;
        let expected = self.sign(format!("{header_b64}.{claims_b64}").as_bytes());

        if !bool::from(provided.ct_eq(&expected)) {
            debug!("token signature mismatch");
            return Err(AuthError::SignatureDoesNotMatch);
        }

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| AuthError::MalformedToken)?;
        let claims: Claims = serde_json::from_slice(&claims_bytes)
            .map_err(|e| AuthError::InvalidClaims(e.to_string()))?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    /// HMAC-SHA256 over `data` with the shared secret.
    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can accept keys of any length");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}
