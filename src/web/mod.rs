//! HTTP API of the archive.
//!
//! Routes are mounted under `/api`; `/health` and `/api-docs/openapi.json`
//! sit at the root. Every `/api` route needs a bearer token.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::{ApiError, ErrorCode};
pub use handlers::AppState;
pub use middleware::{AuthUser, JwtClaims, JwtState};
pub use router::{create_health_router, create_openapi_router, create_router, ApiDoc};
pub use server::WebServer;
