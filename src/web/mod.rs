//! Web API module for filelock.
//!
//! A JSON REST API over the folder tree, the lock and the chunked upload
//! pipeline. Downloads and archives are streamed.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::JwtState;
pub use router::{create_health_router, create_router};
pub use server::WebServer;
