//! 同步桥：让无法挂起的调用方（例如媒体引擎的回调线程）通过异步解析器取得播放句柄。

use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, sync_channel};
use std::time::Duration;

use remote_drive_core::{DomainError, relative_path};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, warn};
use url::Url;

use crate::registry::redact;
use crate::{DriveResolver, HubError, PlaybackHandle, Result};

/// 阻塞式播放入口。
///
/// 解析任务提交到 `runtime` 上执行，调用线程只阻塞在一个单槽通道上等待结果，
/// 不占用执行 I/O 的工作线程。
pub struct SyncBridge {
    resolver: Arc<DriveResolver>,
    runtime: Handle,
    timeout: Duration,
}

impl SyncBridge {
    pub fn new(resolver: Arc<DriveResolver>, runtime: Handle, timeout: Duration) -> Self {
        Self {
            resolver,
            runtime,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 解析 `url` 并返回播放句柄。
    ///
    /// 该入口没有错误通道：任何失败都会记录日志并返回 `None`。
    pub fn play_by_url(&self, url: &str) -> Option<PlaybackHandle> {
        if let Ok(current) = Handle::try_current() {
            if current.runtime_flavor() == RuntimeFlavor::CurrentThread {
                error!(url = %redact(url), "sync bridge called from a current-thread runtime");
                return None;
            }
        }

        match self.wait_for_playback(url) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(url = %redact(url), error = %err, "sync bridge playback failed");
                None
            }
        }
    }

    fn wait_for_playback(&self, url: &str) -> Result<Option<PlaybackHandle>> {
        let (sender, receiver) = sync_channel(1);
        let resolver = Arc::clone(&self.resolver);
        let target = url.to_string();

        let task = self.runtime.spawn(async move {
            let _ = sender.send(playback_for(&resolver, &target).await);
        });

        let wait = || receiver.recv_timeout(self.timeout);
        let received = if Handle::try_current().is_ok() {
            tokio::task::block_in_place(wait)
        } else {
            wait()
        };

        match received {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                task.abort();
                Err(HubError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(anyhow::anyhow!("resolution task ended without a result").into())
            }
        }
    }
}

async fn playback_for(resolver: &DriveResolver, url: &str) -> Result<Option<PlaybackHandle>> {
    let parsed = Url::parse(url).map_err(|err| DomainError::InvalidAddress(err.to_string()))?;
    let Some(drive) = resolver.resolve(url, None).await? else {
        return Err(HubError::DriveNotFound(redact(url)));
    };

    let path = relative_path(drive.base_url(), &parsed);
    debug!(path = %path, "requesting playback handle");
    Ok(drive.playback_handle(&path).await)
}
