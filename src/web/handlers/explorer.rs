//! File explorer handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use utoipa;

use crate::file::{Breadcrumb, TreeBuilder, TreeNode};
use crate::web::dto::{ApiResponse, PathQuery, RootQuery};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/file-explorer/root - Semester node with visible professors.
#[utoipa::path(
    get,
    path = "/file-explorer/root",
    tag = "file-explorer",
    params(
        ("academicYearId" = i64, Query, description = "Academic year ID"),
        ("semesterId" = i64, Query, description = "Semester ID")
    ),
    responses(
        (status = 200, description = "Root node of the semester"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Year or semester not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_root(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(query): Query<RootQuery>,
) -> Result<Json<ApiResponse<TreeNode>>, ApiError> {
    let node = TreeBuilder::new(state.db.pool())
        .get_root_node(query.academic_year_id, query.semester_id, &principal)
        .await?;
    Ok(Json(ApiResponse::new(node)))
}

/// GET /api/file-explorer/node - Folder node with its children.
#[utoipa::path(
    get,
    path = "/file-explorer/node",
    tag = "file-explorer",
    params(
        ("path" = String, Query, description = "Folder path")
    ),
    responses(
        (status = 200, description = "Folder node"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Folder not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<TreeNode>>, ApiError> {
    let node = TreeBuilder::new(state.db.pool())
        .get_node(&query.path, &principal)
        .await?;
    Ok(Json(ApiResponse::new(node)))
}

/// GET /api/file-explorer/breadcrumbs - Breadcrumb trail of a path.
#[utoipa::path(
    get,
    path = "/file-explorer/breadcrumbs",
    tag = "file-explorer",
    params(
        ("path" = String, Query, description = "Folder path")
    ),
    responses(
        (status = 200, description = "Ordered breadcrumbs"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_breadcrumbs(
    AuthUser(_principal): AuthUser,
    Query(query): Query<PathQuery>,
) -> Json<ApiResponse<Vec<Breadcrumb>>> {
    Json(ApiResponse::new(TreeBuilder::generate_breadcrumbs(&query.path)))
}
