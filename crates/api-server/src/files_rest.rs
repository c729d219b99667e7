//! Spreadsheet upload, header listing, and download endpoints.

use crate::rest::{ApiError, AppState, ErrorResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use bulksms_sources::sanitize_filename;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

/// Multipart body of `POST /upload`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Name the file was stored under; use it in later requests.
    pub filename: String,
    pub sheets: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ColumnsRequest {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub sheet: String,
}

#[derive(Serialize, ToSchema)]
pub struct ColumnsResponse {
    pub columns: Vec<String>,
}

/// POST /upload: Store a spreadsheet and list its sheets.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "No file in the request", body = ErrorResponse),
        (status = 500, description = "File is not a readable workbook", body = ErrorResponse),
    )
)]
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(ApiError::invalid("No file selected"));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::invalid(e.body_text()))?;

        let filename = state.sources.save_upload(&original, bytes.to_vec()).await?;
        let sheets = state.sources.list_sheets(&filename).await?;
        info!(file = %filename, sheets = sheets.len(), "Spreadsheet uploaded");
        return Ok(Json(UploadResponse { filename, sheets }));
    }
    Err(ApiError::invalid("No file uploaded"))
}

/// POST /columns: Header row of a sheet.
#[utoipa::path(
    post,
    path = "/columns",
    tag = "Files",
    request_body = ColumnsRequest,
    responses(
        (status = 200, description = "Header names in column order", body = ColumnsResponse),
        (status = 404, description = "Unknown file or sheet", body = ErrorResponse),
    )
)]
pub async fn handle_columns(
    State(state): State<AppState>,
    payload: Result<Json<ColumnsRequest>, JsonRejection>,
) -> Result<Json<ColumnsResponse>, ApiError> {
    let Json(request) = payload?;
    if request.filename.is_empty() || request.sheet.is_empty() {
        return Err(ApiError::invalid("filename and sheet are required."));
    }
    let columns = state
        .sources
        .list_columns(&request.filename, &request.sheet)
        .await?;
    Ok(Json(ColumnsResponse { columns }))
}

/// GET /download/{filename}: Download a stored upload.
#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "Files",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse),
    )
)]
pub async fn handle_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.sources.read_file(&filename).await?;
    let stored = sanitize_filename(&filename).unwrap_or_default();
    let disposition = format!("attachment; filename=\"{stored}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
