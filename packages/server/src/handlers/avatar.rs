use std::io;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use axum::{Json, body::Body};
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::instrument;

use crate::avatar::AvatarUpload;
use crate::error::{AppError, ErrorBody};
use crate::models::avatar::{AvatarListQuery, AvatarListResponse};
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn avatar_upload_body_limit(max_avatar_size: u64) -> DefaultBodyLimit {
    let max = usize::try_from(max_avatar_size).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(max.saturating_add(MULTIPART_OVERHEAD))
}

#[utoipa::path(
    post,
    path = "/api/v1/students/{id}/avatar",
    tag = "Avatars",
    operation_id = "uploadAvatar",
    summary = "Upload a student's avatar",
    description = "Stores the `file` multipart field (also accepted as `avatar`) as the student's \
        avatar, replacing any previous one. The part's `Content-Type` is stored as the media type; \
        the file name only determines the stored extension.",
    params(("id" = i32, Path, description = "Student ID")),
    request_body(content_type = "multipart/form-data", description = "Avatar image"),
    responses(
        (status = 200, description = "Avatar stored"),
        (status = 400, description = "Malformed or aborted upload (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "Avatar too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<StatusCode, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if !matches!(field.name(), Some("file" | "avatar")) {
            continue;
        }

        let upload = AvatarUpload {
            student_id,
            file_name: field.file_name().map(str::to_string),
            media_type: field.content_type().map(str::to_string),
            declared_size: declared_part_size(field.headers()),
        };

        let reader = StreamReader::new(field.map_err(multipart_io_error));
        tokio::pin!(reader);

        state.avatars.upload_avatar(upload, &mut reader).await?;
        return Ok(StatusCode::OK);
    }

    Err(AppError::Validation("Missing 'file' field".into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/students/{id}/avatar/preview",
    tag = "Avatars",
    operation_id = "previewAvatar",
    summary = "Get the cached copy of a student's avatar",
    description = "Returns the copy stored alongside the avatar record. Does not read the file on disk.",
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Avatar bytes"),
        (status = 404, description = "No avatar for this student (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn preview_avatar(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
) -> Result<Response, AppError> {
    let preview = state.avatars.get_preview(student_id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, preview.media_type)
        .header(header::CONTENT_LENGTH, preview.bytes.len().to_string())
        .body(Body::from(preview.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/api/v1/students/{id}/avatar",
    tag = "Avatars",
    operation_id = "downloadAvatar",
    summary = "Download a student's full-resolution avatar",
    description = "Streams the avatar file from disk. Fails with a server error if the record \
        exists but the file is missing or does not match the record.",
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Avatar file"),
        (status = 404, description = "No avatar for this student (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "File missing or inconsistent (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_avatar(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
) -> Result<Response, AppError> {
    let download = state.avatars.get_full_download(student_id).await?;
    let body = Body::from_stream(ReaderStream::new(download.reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, download.media_type)
        .header(header::CONTENT_LENGTH, download.length.to_string())
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/api/v1/avatars",
    tag = "Avatars",
    operation_id = "listAvatars",
    summary = "List avatar metadata",
    description = "Returns one page of avatar records without their image bytes, in insertion order.",
    params(AvatarListQuery),
    responses(
        (status = 200, description = "Avatar page", body = AvatarListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_avatars(
    State(state): State<AppState>,
    Query(query): Query<AvatarListQuery>,
) -> Result<Json<AvatarListResponse>, AppError> {
    let (page, size) = query.normalized();
    let page = state.avatars.list_avatars(page, size).await?;
    Ok(Json(AvatarListResponse::from(page)))
}

fn declared_part_size(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Multipart error: {e}"))
    }
}

fn multipart_io_error(e: MultipartError) -> io::Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        io::Error::new(io::ErrorKind::FileTooLarge, e)
    } else {
        io::Error::other(e)
    }
}
