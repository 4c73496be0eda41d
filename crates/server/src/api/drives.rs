//! 驱动 API 路由。
//!
//! 所有按地址的操作都通过查询参数 `url` 指定目标，由驱动中心完成解析。

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use drive_hub::{DriveId, DriveInfo, HubError, ListingOptions, PlaybackHandle};
use remote_drive_api_types::{
    ErrorResponse, HealthCheckResponse, ListQuery, MutationResponse, SearchRequest,
    SharesResponse, UrlQuery,
};
use remote_drive_core::{FileObject, Predicate, SortType};
use tracing::warn;

use super::state::AppState;

/// 创建驱动 API 路由。
pub fn create_drive_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        // 已注册驱动
        .route("/api/drives", get(list_drives))
        .route("/api/drives/{id}", delete(unregister_drive))
        // 浏览
        .route("/api/shares", get(list_shares))
        .route("/api/list", get(list_directory))
        .route("/api/search", post(search))
        // 读取与播放
        .route("/api/read", get(read_bytes))
        .route("/api/play", get(playback_handle))
        // 写操作
        .route("/api/mkdir", post(mkdir))
        .route("/api/entry", delete(remove_entry))
}

async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::ok())
}

async fn list_drives(State(state): State<Arc<AppState>>) -> Json<Vec<DriveInfo>> {
    Json(state.hub.drives().await)
}

/// 显式移除一个驱动，下次访问会重新发现。
async fn unregister_drive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DriveInfo>, ApiError> {
    let id = DriveId::from_str(&id).map_err(|err| ApiError {
        message: format!("无效的驱动 ID: {err}"),
        code: "INVALID_DRIVE_ID".to_string(),
        status: StatusCode::BAD_REQUEST,
    })?;
    Ok(Json(state.hub.unregister(&id).await?))
}

async fn list_shares(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<SharesResponse>, ApiError> {
    let shares = state.hub.list_shares(&query.url).await?;
    Ok(Json(SharesResponse {
        url: query.url,
        shares,
    }))
}

/// 列出目录内容，未指定的选项取配置中的默认值。
async fn list_directory(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FileObject>>, ApiError> {
    let options = listing_options(state.listing, &query)?;
    Ok(Json(state.hub.list_directory(&query.url, options).await?))
}

/// 按谓词筛选目录条目。
async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<FileObject>>, ApiError> {
    let predicate: Predicate = serde_json::from_value(request.predicate).map_err(HubError::from)?;
    let mut options = state.listing;
    if let Some(show_hidden) = request.show_hidden {
        options.show_hidden = show_hidden;
    }
    Ok(Json(state.hub.search(&request.url, &predicate, options).await?))
}

async fn read_bytes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<Response, ApiError> {
    let bytes = state.hub.read_bytes(&query.url).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}

async fn playback_handle(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<PlaybackHandle>, ApiError> {
    state
        .hub
        .playback_handle(&query.url)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError {
            message: format!("条目无法播放: {}", query.url),
            code: "NOT_PLAYABLE".to_string(),
            status: StatusCode::NOT_FOUND,
        })
}

async fn mkdir(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    state.hub.mkdir(&query.url).await?;
    Ok((StatusCode::CREATED, Json(MutationResponse::done(query.url))))
}

async fn remove_entry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<MutationResponse>, ApiError> {
    state.hub.remove(&query.url).await?;
    Ok(Json(MutationResponse::done(query.url)))
}

fn listing_options(defaults: ListingOptions, query: &ListQuery) -> Result<ListingOptions, ApiError> {
    let mut options = defaults;
    if let Some(sort) = &query.sort {
        options.sort = SortType::from_str(sort).map_err(HubError::from)?;
    }
    if let Some(ascending) = query.ascending {
        options.ascending = ascending;
    }
    if let Some(directories_first) = query.directories_first {
        options.directories_first = directories_first;
    }
    if let Some(show_hidden) = query.show_hidden {
        options.show_hidden = show_hidden;
    }
    Ok(options)
}

/// API 错误类型。
#[derive(Debug)]
struct ApiError {
    message: String,
    code: String,
    status: StatusCode,
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        let (status, code) = match &err {
            HubError::Domain(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            HubError::Json(_) => (StatusCode::BAD_REQUEST, "INVALID_PREDICATE"),
            HubError::ShareNotFound(_) => (StatusCode::NOT_FOUND, "SHARE_NOT_FOUND"),
            HubError::NotFound(_) => (StatusCode::NOT_FOUND, "PATH_NOT_FOUND"),
            HubError::DriveNotFound(_) => (StatusCode::NOT_FOUND, "DRIVE_NOT_FOUND"),
            HubError::NotADirectory(_) => (StatusCode::BAD_REQUEST, "NOT_A_DIRECTORY"),
            HubError::AuthenticationFailed(_) => {
                (StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILED")
            }
            HubError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            HubError::Unsupported(_) => (StatusCode::NOT_IMPLEMENTED, "UNSUPPORTED"),
            HubError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            HubError::HttpStatus { .. } | HubError::Http(_) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            HubError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            HubError::Config(_) | HubError::Other(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        if status.is_server_error() {
            warn!(error = %err, code, "request failed");
        }

        ApiError {
            message: err.to_string(),
            code: code.to_string(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            code: self.code,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}
