use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::ApiError;
use crate::range::parse_range;

/// Shared handler state: the canonical root directory.
#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub root: Arc<PathBuf>,
}

/// Resolve a request path under `root`, refusing anything that could leave it.
async fn resolve(root: &Path, rel: &str) -> Result<(PathBuf, std::fs::Metadata), ApiError> {
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        return Err(ApiError::BadRequest("file path cannot be empty"));
    }
    let rel = Path::new(rel);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(ApiError::Forbidden);
    }

    let full = root.join(rel);
    let meta = match tokio::fs::metadata(&full).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ApiError::NotFound),
        Err(e) => return Err(ApiError::Io(e)),
    };
    // Symlinks may still point outside the root.
    let canonical = tokio::fs::canonicalize(&full).await?;
    if !canonical.starts_with(root) {
        return Err(ApiError::Forbidden);
    }
    Ok((canonical, meta))
}

fn http_date(t: SystemTime) -> String {
    DateTime::<Utc>::from(t)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn set(headers: &mut HeaderMap, name: header::HeaderName, value: String) {
    if let Ok(v) = HeaderValue::from_str(&value) {
        headers.insert(name, v);
    }
}

/// `GET|HEAD /download/{*path}`: whole file or one byte range.
pub(crate) async fn download(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    request_headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (full, meta) = resolve(&state.root, &path).await?;
    if meta.is_dir() {
        return Err(ApiError::BadRequest("cannot download directory"));
    }
    let size = meta.len();
    let mut file = tokio::fs::File::open(&full).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    set(
        &mut headers,
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", file_name(&full)),
    );
    if let Ok(modified) = meta.modified() {
        set(&mut headers, header::LAST_MODIFIED, http_date(modified));
    }

    let range = request_headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default().to_string());
    let Some(range) = range else {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
        let body = Body::from_stream(ReaderStream::new(file));
        return Ok((StatusCode::OK, headers, body).into_response());
    };

    let ranges = parse_range(&range, size).map_err(|e| {
        tracing::debug!(range = %range, "rejecting range: {}", e);
        ApiError::RangeNotSatisfiable { size }
    })?;
    let [r] = ranges.as_slice() else {
        return Err(ApiError::RangeNotSatisfiable { size });
    };

    file.seek(std::io::SeekFrom::Start(r.start)).await?;
    set(&mut headers, header::CONTENT_RANGE, r.content_range(size));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(r.len()));
    let body = Body::from_stream(ReaderStream::new(file.take(r.len())));
    Ok((StatusCode::PARTIAL_CONTENT, headers, body).into_response())
}

#[derive(Debug, Serialize)]
pub(crate) struct FileInfo {
    pub name: String,
    pub size: u64,
    pub modified: String,
}

/// `GET /info/{*path}`
pub(crate) async fn info(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
) -> Result<Json<FileInfo>, ApiError> {
    let (full, meta) = resolve(&state.root, &path).await?;
    if meta.is_dir() {
        return Err(ApiError::BadRequest("cannot get directory info"));
    }
    let modified = meta
        .modified()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
        .unwrap_or_default();
    Ok(Json(FileInfo {
        name: file_name(&full),
        size: meta.len(),
        modified,
    }))
}

/// Routes hit with no path after the prefix.
pub(crate) async fn empty_path() -> ApiError {
    ApiError::BadRequest("file path cannot be empty")
}

#[derive(Debug, Serialize)]
pub(crate) struct Health {
    pub status: &'static str,
    pub timestamp: String,
}

/// `GET /health`
pub(crate) async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}
