//! HMAC-signed, time-limited object URLs.
//!
//! A presigned URL authorizes exactly one method on exactly one object key
//! until an expiry instant, without the client ever seeing the key-signing
//! secret or being proxied through the server. The query string carries:
//!
//! - `method` - `PUT` (upload) or `GET` (download)
//! - `expires` - expiry as seconds since the Unix epoch
//! - `signature` - hex HMAC-SHA256 over `method\nkey\nexpires`
//!
//! Verification recomputes the signature and compares in constant time, then
//! checks the expiry.

use chrono::Utc;
use hmac::{Hmac, KeyInit, Mac};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use sealdrive_core::{ServiceError, ServiceResult};

type HmacSha256 = Hmac<Sha256>;

/// Characters escaped in the key path; `/` stays a path separator.
const KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// The authenticated parts of a presigned request, as parsed from its query
/// string by the serving edge.
#[derive(Debug, Clone)]
pub struct PresignedRequest {
    /// The HTTP method the URL authorizes.
    pub method: String,
    /// The object key the URL authorizes.
    pub key: String,
    /// Expiry, seconds since the Unix epoch.
    pub expires_at: i64,
    /// The hex-encoded signature from the query string.
    pub signature: String,
}

/// Issues and verifies presigned object URLs.
///
/// # Examples
///
/// ```
/// use sealdrive_store::UrlSigner;
///
/// let signer = UrlSigner::new("secret", "http://localhost:8080/objects");
/// let url = signer.presign("PUT", "files/ab/cd", chrono::Duration::minutes(15));
/// assert!(url.starts_with("http://localhost:8080/objects/files/ab/cd?"));
/// ```
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    base_url: String,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    /// Create a signer over the given secret, issuing URLs under `base_url`.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            secret: secret.into(),
            base_url,
        }
    }

    /// Issue a presigned URL authorizing `method` on `key` for `ttl`.
    #[must_use]
    pub fn presign(&self, method: &str, key: &str, ttl: chrono::Duration) -> String {
        let expires_at = (Utc::now() + ttl).timestamp();
        let signature = self.signature(method, key, expires_at);
        let encoded_key = utf8_percent_encode(key, KEY_ENCODE_SET);
        format!(
            "{}/{encoded_key}?method={method}&expires={expires_at}&signature={signature}",
            self.base_url
        )
    }

    /// Verify a presigned request.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthorized`] when the signature does not
    /// match or the URL has expired.
    pub fn verify(&self, request: &PresignedRequest) -> ServiceResult<()> {
        let expected = self.signature(&request.method, &request.key, request.expires_at);
        if !bool::from(expected.as_bytes().ct_eq(request.signature.as_bytes())) {
            debug!(key = %request.key, "presigned signature mismatch");
            return Err(ServiceError::Unauthorized {
                reason: "presigned signature mismatch".to_owned(),
            });
        }
        if request.expires_at <= Utc::now().timestamp() {
            return Err(ServiceError::Unauthorized {
                reason: "presigned URL expired".to_owned(),
            });
        }
        Ok(())
    }

    /// Hex HMAC-SHA256 over `method\nkey\nexpires`.
    fn signature(&self, method: &str, key: &str, expires_at: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can accept keys of any length");
        mac.update(format!("{method}\n{key}\n{expires_at}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
