//! File handlers: metadata, download and upload.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use utoipa;

use crate::file::{FileUploadService, FolderRef, IncomingFile, UploadRequest, UploadedFile};
use crate::web::dto::ApiResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped and quotes or backslashes replaced in the
/// plain `filename`; non-ASCII names also get an RFC 5987 `filename*`.
pub fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback: String = sanitized
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(&sanitized)
    )
}

/// GET /api/file-explorer/files/:id - File metadata.
#[utoipa::path(
    get,
    path = "/file-explorer/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File metadata"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<UploadedFile>>, ApiError> {
    let file = FileUploadService::new(state.db.pool(), &state.storage, &state.limits)
        .get_file(file_id, &principal)
        .await?;
    Ok(Json(ApiResponse::new(file)))
}

/// GET /api/file-explorer/files/:id/download - Download a file.
#[utoipa::path(
    get,
    path = "/file-explorer/files/{id}/download",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found"),
        (status = 503, description = "File bytes unavailable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Response<Body>, ApiError> {
    let download = FileUploadService::new(state.db.pool(), &state.storage, &state.limits)
        .download(file_id, &principal)
        .await?;

    Response::builder()
        .header(header::CONTENT_TYPE, download.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&download.metadata.original_filename),
        )
        .header(header::CONTENT_LENGTH, download.content.len())
        .body(Body::from(download.content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// POST /api/files/upload - Upload a batch of files into a document folder.
///
/// Multipart fields: `files` (repeatable, also accepted as `files[]`),
/// `folderId` or `folderPath`, and optional `notes`.
#[utoipa::path(
    post,
    path = "/files/upload",
    tag = "files",
    responses(
        (status = 201, description = "Stored files"),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No write access"),
        (status = 404, description = "Folder not found"),
        (status = 422, description = "Batch rejected"),
        (status = 503, description = "Storage failure")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<UploadedFile>>>), ApiError> {
    let request = read_upload_form(multipart).await?;

    let stored = FileUploadService::new(state.db.pool(), &state.storage, &state.limits)
        .upload_files(&request, &principal)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(stored))))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadRequest, ApiError> {
    let mut files = Vec::new();
    let mut folder_id: Option<i64> = None;
    let mut folder_path: Option<String> = None;
    let mut notes: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!("Invalid multipart body: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "files" | "files[]" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read file data"))?;
                files.push(IncomingFile::new(filename, content.to_vec()));
            }
            "folderId" => {
                let text = read_text(field).await?;
                folder_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| ApiError::bad_request("folderId must be a number"))?,
                );
            }
            "folderPath" => folder_path = Some(read_text(field).await?),
            "notes" => {
                let text = read_text(field).await?;
                if !text.trim().is_empty() {
                    notes = Some(text);
                }
            }
            _ => {}
        }
    }

    let target = match (folder_id, folder_path) {
        (Some(id), _) => FolderRef::Id(id),
        (None, Some(p)) if !p.trim().is_empty() => FolderRef::Path(p),
        _ => return Err(ApiError::bad_request("folderId or folderPath is required")),
    };

    let mut request = UploadRequest::new(target, files);
    if let Some(n) = notes {
        request = request.with_notes(n);
    }
    Ok(request)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|_| ApiError::bad_request("Invalid form field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("syllabus.pdf"),
            "attachment; filename=\"syllabus.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition_header("résumé.pdf");
        assert!(value.starts_with("attachment; filename=\"r_sum_.pdf\""));
        assert!(value.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
    }

    #[test]
    fn test_content_disposition_strips_header_injection() {
        let value = content_disposition_header("a\r\nX-Evil: 1\".pdf");
        assert!(!value.contains('\r'));
        assert!(!value.contains('\n'));
        assert!(value.contains("filename=\"aX-Evil: 1_.pdf\""));
    }
}
