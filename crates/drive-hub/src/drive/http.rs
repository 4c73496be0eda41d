//! HTTP 传输上的请求/响应式字节获取，以及只读的 `http`/`https` 驱动。

use std::sync::{Arc, OnceLock, RwLock};

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use remote_drive_core::{FileObject, base_address};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use super::{Drive, DriveProvider, PlaybackHandle};
use crate::config::HttpConfig;
use crate::error::{HubError, Result};

static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// `Drive::read_bytes` 默认实现使用的共享客户端。
pub fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(Client::new)
}

/// GET `url` 并返回完整响应体。
///
/// 地址中的用户名/密码会转为 Basic 认证，不随请求行发送。
pub async fn fetch_bytes(client: &Client, url: &Url) -> Result<Vec<u8>> {
    let (url, credentials) = split_credentials(url);
    debug!(url = %url, "fetching bytes");

    let mut request = client.get(url.clone());
    if let Some((user, password)) = credentials {
        request = request.basic_auth(user, password);
    }

    let response = request.send().await?;
    let status = response.status();
    match status {
        StatusCode::NOT_FOUND => Err(HubError::NotFound(url.path().to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(HubError::AuthenticationFailed(url.to_string()))
        }
        status if !status.is_success() => Err(HubError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        }),
        _ => Ok(response.bytes().await?.to_vec()),
    }
}

/// 拆出地址中的用户信息。`Url` 保存的是百分号编码形式，需解码后才能用于认证。
fn split_credentials(url: &Url) -> (Url, Option<(String, Option<String>)>) {
    if url.username().is_empty() && url.password().is_none() {
        return (url.clone(), None);
    }

    let decode = |value: &str| percent_decode_str(value).decode_utf8_lossy().into_owned();
    let credentials = (decode(url.username()), url.password().map(decode));
    let mut stripped = url.clone();
    let _ = stripped.set_username("");
    let _ = stripped.set_password(None);
    (stripped, Some(credentials))
}

/// 静态文件服务器协议：无可枚举的共享，也不支持目录列表与写操作。
pub struct HttpProvider {
    user_agent: String,
}

impl HttpProvider {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
        }
    }
}

#[async_trait]
impl DriveProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn scheme(&self, secure: bool) -> &str {
        if secure { "https" } else { "http" }
    }

    async fn discover(&self, address: &Url) -> Option<Arc<dyn Drive>> {
        if !self.handles(address.scheme()) || address.host_str().is_none() {
            return None;
        }

        Some(Arc::new(HttpDrive {
            base_url: base_address(address),
            user_agent: self.user_agent.clone(),
            share: RwLock::new(None),
        }))
    }
}

pub struct HttpDrive {
    base_url: Url,
    user_agent: String,
    share: RwLock<Option<String>>,
}

#[async_trait]
impl Drive for HttpDrive {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn active_share(&self) -> Option<String> {
        self.share.read().ok().and_then(|share| share.clone())
    }

    async fn list_shares(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// 共享名只作为标签记录，HTTP 无法校验命名空间是否存在。
    async fn connect(&self, share: &str) -> Result<()> {
        let share = share.trim_matches('/');
        let mut current = self
            .share
            .write()
            .map_err(|_| anyhow::anyhow!("share lock poisoned"))?;
        *current = (!share.is_empty()).then(|| share.to_string());
        Ok(())
    }

    async fn list_directory(&self, _path: &str) -> Result<Vec<FileObject>> {
        Err(HubError::Unsupported("list_directory"))
    }

    async fn remove(&self, _path: &str) -> Result<()> {
        Err(HubError::Unsupported("remove"))
    }

    async fn mkdir(&self, _path: &str) -> Result<()> {
        Err(HubError::Unsupported("mkdir"))
    }

    async fn playback_handle(&self, path: &str) -> Option<PlaybackHandle> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return None;
        }

        Some(
            PlaybackHandle::new(self.entry_url(path))
                .with_header("User-Agent", self.user_agent.clone()),
        )
    }
}
