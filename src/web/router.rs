//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers::{self, AppState};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Multipart framing on top of the configured batch size.
const UPLOAD_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::explorer::get_root,
        handlers::explorer::get_node,
        handlers::explorer::get_breadcrumbs,
        handlers::file::get_file,
        handlers::file::download_file,
        handlers::file::upload_files,
        handlers::admin::assign_course,
        handlers::admin::rebuild_folders,
        handlers::admin::reconcile_storage,
        handlers::admin::get_deletion_info,
        handlers::admin::delete_user,
        handlers::admin::delete_department,
    ),
    modifiers(&SecurityAddon),
    servers((url = "/api")),
    tags(
        (name = "file-explorer", description = "Role-filtered folder tree"),
        (name = "files", description = "File metadata, download and upload"),
        (name = "admin", description = "Provisioning, reconciliation and deletion")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let upload_limit = usize::try_from(app_state.limits.max_total_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(UPLOAD_OVERHEAD_BYTES);

    let explorer_routes = Router::new()
        .route("/root", get(handlers::get_root))
        .route("/node", get(handlers::get_node))
        .route("/breadcrumbs", get(handlers::get_breadcrumbs))
        .route("/files/:id", get(handlers::get_file))
        .route("/files/:id/download", get(handlers::download_file));

    let file_routes = Router::new().route(
        "/upload",
        post(handlers::upload_files).layer(DefaultBodyLimit::max(upload_limit)),
    );

    let admin_routes = Router::new()
        .route("/course-assignments", post(handlers::assign_course))
        .route("/folders/rebuild", post(handlers::rebuild_folders))
        .route("/storage/reconcile", post(handlers::reconcile_storage))
        .route("/users/:id/deletion-info", get(handlers::get_deletion_info))
        .route("/users/:id", delete(handlers::delete_user))
        .route("/departments/:id", delete(handlers::delete_department));

    let api_routes = Router::new()
        .nest("/file-explorer", explorer_routes)
        .nest("/files", file_routes)
        .nest("/admin", admin_routes);

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Serve the OpenAPI document.
pub fn create_openapi_router() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
