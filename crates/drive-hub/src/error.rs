use std::time::Duration;

use remote_drive_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("领域错误: {0}")]
    Domain(#[from] DomainError),

    #[error("共享不存在: {0}")]
    ShareNotFound(String),

    #[error("认证失败: {0}")]
    AuthenticationFailed(String),

    #[error("路径不存在: {0}")]
    NotFound(String),

    #[error("路径不是目录: {0}")]
    NotADirectory(String),

    #[error("权限不足: {0}")]
    PermissionDenied(String),

    #[error("协议不支持该操作: {0}")]
    Unsupported(&'static str),

    #[error("驱动未找到: {0}")]
    DriveNotFound(String),

    #[error("操作超时: {0:?}")]
    Timeout(Duration),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("HTTP 状态异常: {status} {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP 错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, HubError>;
