//! Middleware for the web API.

pub mod auth;
pub mod cors;

pub use auth::{jwt_auth, AuthOwner, JwtState, OwnerClaims};
pub use cors::{create_cors_layer, ARCHIVE_SKIPPED_HEADER};
