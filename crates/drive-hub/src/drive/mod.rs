//! 驱动能力抽象层。
//!
//! 每种远程文件共享协议（SMB、FTP、NFS、WebDAV 等）通过两个 trait 接入：
//! `DriveProvider` 负责协议级能力（scheme 映射与发现），`Drive` 表示一个
//! 已发现的服务器连接，最多绑定一个共享，并提供按路径的文件操作。
//! 注册表与解析器只依赖这两个 trait，不感知具体协议。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use remote_drive_core::{FileObject, build_url};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

pub mod http;
pub mod local;

pub use http::{HttpDrive, HttpProvider};
pub use local::{LocalDrive, LocalProvider};

/// 协议级能力：scheme 映射与服务器发现。
#[async_trait]
pub trait DriveProvider: Send + Sync {
    /// 返回协议名称，用于日志与诊断。
    fn name(&self) -> &str;

    /// 根据是否启用传输加密返回本协议的 scheme。
    fn scheme(&self, secure: bool) -> &str;

    /// 判断地址 scheme 是否由本协议处理。
    fn handles(&self, scheme: &str) -> bool {
        scheme == self.scheme(false) || scheme == self.scheme(true)
    }

    /// 使用本协议的 scheme 构造规范地址。
    fn build_url(
        &self,
        secure: bool,
        host: &str,
        port: Option<u16>,
        path: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Url> {
        Ok(build_url(self.scheme(secure), host, port, path, user, password)?)
    }

    /// 探测 `address` 指向的服务器。
    ///
    /// 只读操作，不得修改远端状态；可以不验证可达性（留给 `list_shares`/`connect`）。
    /// 地址无效或已知不可达时返回 `None`。
    async fn discover(&self, address: &Url) -> Option<Arc<dyn Drive>>;
}

/// 已发现的服务器连接。
#[async_trait]
pub trait Drive: Send + Sync {
    /// 规范化基础地址，即注册表键。
    fn base_url(&self) -> &Url;

    /// 当前绑定的共享；未绑定或绑定默认命名空间时为 `None`。
    fn active_share(&self) -> Option<String>;

    /// 列出服务器的顶层命名空间。
    async fn list_shares(&self) -> Result<Vec<String>>;

    /// 将后续路径操作绑定到 `share`。
    ///
    /// 已绑定同一共享时为幂等操作；空字符串表示默认命名空间，不得失败。
    async fn connect(&self, share: &str) -> Result<()>;

    async fn list_directory(&self, path: &str) -> Result<Vec<FileObject>>;

    /// 读取整个文件。
    ///
    /// 默认实现对条目地址发起一次请求/响应式的字节获取，适用于基于
    /// HTTP 一类传输的协议。
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.entry_url(path);
        http::fetch_bytes(http::shared_client(), &url).await
    }

    async fn remove(&self, path: &str) -> Result<()>;

    async fn mkdir(&self, path: &str) -> Result<()>;

    /// 返回可交给媒体引擎的播放句柄；协议无法提供时返回 `None`。
    async fn playback_handle(&self, path: &str) -> Option<PlaybackHandle>;

    /// 条目的完整地址。
    fn entry_url(&self, path: &str) -> Url {
        let mut url = self.base_url().clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{}", path.trim_start_matches('/')));
        url
    }
}

/// 交给外部媒体引擎的不透明播放句柄。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackHandle {
    /// 媒体源地址。
    pub source: Url,
    /// 打开媒体源时附带的请求头。
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// 媒体引擎选项。
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl PlaybackHandle {
    pub fn new(source: Url) -> Self {
        Self {
            source,
            headers: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}
