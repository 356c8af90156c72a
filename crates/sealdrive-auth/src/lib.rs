//! Bearer-token authentication for the SealDrive HTTP boundary.
//!
//! Tokens are HS256 JWTs carried as `Authorization: JWT <token>`. The
//! middleware resolves the caller's user id from the `sub` claim; everything
//! downstream of the HTTP layer works with that id only.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenAuthority, parse_authorization_header};
