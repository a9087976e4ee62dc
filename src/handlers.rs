use crate::{
    error::AppError,
    models::{AppState, LoginRequest, LoginResponse, MessageResponse, UploadedFile},
    store::Collection,
};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::{Json, Redirect},
};
use bytes::BytesMut;
use multer::Multipart;
use serde_json::Value;
use std::{sync::Arc, time::Instant};
use tracing::{error, info, warn};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
pub const LOGIN_PAGE: &str = "/static/login.html";
const FILE_FIELD: &str = "file";
const DEFAULT_FILE_NAME: &str = "video.mp4";

pub async fn root_handler() -> Redirect {
    Redirect::temporary(LOGIN_PAGE)
}

/// Check a username/password pair. Always 200; failure is in the body.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Json<LoginResponse> {
    let response = state.gate.check_login(&request.username, &request.password);
    info!(
        "[POST /login] user {:?} -> {:?} {:?}",
        request.username, response.status, response.role
    );
    Json(response)
}

/// Upload video file
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Result<Json<MessageResponse>, AppError> {
    let start_time = Instant::now();
    let admin_key = admin_key(request.headers());
    require_admin_key(&state, admin_key.as_deref(), "/upload")?;

    let file = read_file_field(request, state.config.max_file_size).await?;
    info!(
        "[POST /upload] 📁 File: {} ({:.2} MB)",
        file.file_name,
        file.data.len() as f64 / 1024.0 / 1024.0
    );

    let record = state
        .orchestrator
        .upload_video(admin_key.as_deref(), file)
        .await
        .map_err(|e| {
            error!("[POST /upload] ❌ {} after {:.2}s", e, start_time.elapsed().as_secs_f64());
            e
        })?;

    info!(
        "[POST /upload] ✅ SUCCESS - {} in {:.2}s",
        record.url,
        start_time.elapsed().as_secs_f64()
    );

    Ok(Json(MessageResponse {
        message: "Video Uploaded".to_string(),
    }))
}

/// Upload an ad. Same flow as videos, stored as a bare URL.
pub async fn upload_ad_handler(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Result<Json<MessageResponse>, AppError> {
    let start_time = Instant::now();
    let admin_key = admin_key(request.headers());
    require_admin_key(&state, admin_key.as_deref(), "/upload_ad")?;

    let file = read_file_field(request, state.config.max_file_size).await?;
    info!(
        "[POST /upload_ad] 📁 File: {} ({:.2} MB)",
        file.file_name,
        file.data.len() as f64 / 1024.0 / 1024.0
    );

    let url = state
        .orchestrator
        .upload_ad(admin_key.as_deref(), file)
        .await
        .map_err(|e| {
            error!("[POST /upload_ad] ❌ {} after {:.2}s", e, start_time.elapsed().as_secs_f64());
            e
        })?;

    info!(
        "[POST /upload_ad] ✅ SUCCESS - {} in {:.2}s",
        url,
        start_time.elapsed().as_secs_f64()
    );

    Ok(Json(MessageResponse {
        message: "Ad Uploaded".to_string(),
    }))
}

pub async fn videos_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(state.store.load(Collection::Videos).await?))
}

pub async fn ads_handler(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(state.store.load(Collection::Ads).await?))
}

fn admin_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Reject before the body is read, so an unauthorized caller never gets
/// its upload parsed or buffered.
fn require_admin_key(state: &AppState, admin_key: Option<&str>, route: &str) -> Result<(), AppError> {
    if state.gate.check_admin_key(admin_key) {
        return Ok(());
    }
    warn!(
        "[POST {}] rejected: {} admin key",
        route,
        if admin_key.is_some() { "wrong" } else { "missing" }
    );
    Err(AppError::Unauthorized)
}

fn multipart_error(e: multer::Error) -> AppError {
    match e {
        multer::Error::StreamSizeExceeded { limit } | multer::Error::FieldSizeExceeded { limit, .. } => {
            AppError::PayloadTooLarge(format!(
                "File too large. Maximum file size is {}MB.",
                limit / 1024 / 1024
            ))
        }
        other => AppError::BadRequest(format!("Error parsing multipart request: {}", other)),
    }
}

/// Pull the `file` field out of a multipart body, draining anything else.
async fn read_file_field(request: Request<Body>, max_file_size: u64) -> Result<UploadedFile, AppError> {
    let boundary = {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::BadRequest("Missing Content-Type header".to_string()))?;

        multer::parse_boundary(content_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid multipart request: {}", e)))?
    };

    let mut multipart = Multipart::with_constraints(
        request.into_body().into_data_stream(),
        boundary,
        multer::Constraints::new()
            .size_limit(multer::SizeLimit::new().whole_stream(max_file_size)),
    );

    let mut file = None;
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(FILE_FIELD) {
            let file_name = field.file_name().unwrap_or(DEFAULT_FILE_NAME).to_string();

            let mut data = BytesMut::new();
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                data.extend_from_slice(&chunk);
            }

            file = Some(UploadedFile {
                file_name,
                data: data.freeze(),
            });
        } else {
            while field.chunk().await.map_err(multipart_error)?.is_some() {
                // Drain the field
            }
        }
    }

    file.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))
}
