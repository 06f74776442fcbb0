//! Admin handlers for Web API.
//!
//! All endpoints require the Admin or Deanship role.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use utoipa;

use crate::academic::{AcademicService, AssignmentResult};
use crate::file::{
    CascadeDeleter, DeletionInfo, DeletionReport, FolderProvisioner, Principal, RebuildReport,
    ReconcileReport, StorageReconciler,
};
use crate::web::dto::{ApiResponse, AssignCourseRequest};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Reject callers without archive-wide access.
fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    if principal.role.is_global() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin access required"))
    }
}

/// POST /api/admin/course-assignments - Assign a course and provision its folders.
#[utoipa::path(
    post,
    path = "/admin/course-assignments",
    tag = "admin",
    responses(
        (status = 201, description = "Assignment with its folders"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Professor, course or semester not found"),
        (status = 422, description = "Professor cannot own folders")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn assign_course(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(req): Json<AssignCourseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AssignmentResult>>), ApiError> {
    require_admin(&principal)?;

    let result = AcademicService::new(state.db.pool(), &state.storage)
        .assign_course(req.professor_id, req.course_id, req.semester_id)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(result))))
}

/// POST /api/admin/folders/rebuild - Provision folders for every assignment.
#[utoipa::path(
    post,
    path = "/admin/folders/rebuild",
    tag = "admin",
    responses(
        (status = 200, description = "Rebuild report"),
        (status = 403, description = "Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rebuild_folders(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ApiResponse<RebuildReport>>, ApiError> {
    require_admin(&principal)?;

    let report = FolderProvisioner::new(state.db.pool(), &state.storage)
        .rebuild_course_folders()
        .await?;

    tracing::info!(
        admin_id = principal.user_id,
        processed = report.assignments_processed,
        failures = report.failures.len(),
        "Folder rebuild requested"
    );
    Ok(Json(ApiResponse::new(report)))
}

/// POST /api/admin/storage/reconcile - Repair the disk against the metadata store.
#[utoipa::path(
    post,
    path = "/admin/storage/reconcile",
    tag = "admin",
    responses(
        (status = 200, description = "Reconciliation report"),
        (status = 403, description = "Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reconcile_storage(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ApiResponse<ReconcileReport>>, ApiError> {
    require_admin(&principal)?;

    let report = StorageReconciler::new(state.db.pool(), &state.storage)
        .reconcile()
        .await?;
    Ok(Json(ApiResponse::new(report)))
}

/// GET /api/admin/users/:id/deletion-info - What deleting a user would remove.
#[utoipa::path(
    get,
    path = "/admin/users/{id}/deletion-info",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Deletion preview"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_deletion_info(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<DeletionInfo>>, ApiError> {
    require_admin(&principal)?;

    let info = CascadeDeleter::new(state.db.pool(), &state.storage)
        .deletion_info(user_id)
        .await?;
    Ok(Json(ApiResponse::new(info)))
}

/// DELETE /api/admin/users/:id - Delete a user with all owned folders and files.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Deletion report"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<DeletionReport>>, ApiError> {
    require_admin(&principal)?;

    if user_id == principal.user_id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }

    let report = CascadeDeleter::new(state.db.pool(), &state.storage)
        .delete_user(user_id)
        .await?;

    tracing::info!(admin_id = principal.user_id, user_id, "User deleted");
    Ok(Json(ApiResponse::new(report)))
}

/// DELETE /api/admin/departments/:id - Delete a department and everything under it.
#[utoipa::path(
    delete,
    path = "/admin/departments/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Deletion report"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Department not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(department_id): Path<i64>,
) -> Result<Json<ApiResponse<DeletionReport>>, ApiError> {
    require_admin(&principal)?;

    let report = CascadeDeleter::new(state.db.pool(), &state.storage)
        .delete_department(department_id)
        .await?;

    tracing::info!(
        admin_id = principal.user_id,
        department_id,
        users = report.users_deleted,
        "Department deleted"
    );
    Ok(Json(ApiResponse::new(report)))
}
