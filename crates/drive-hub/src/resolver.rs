//! 发现解析器：把任意地址解析为已注册或新发现的驱动，并选定活动共享。

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use remote_drive_core::{base_address, first_segment, strip_trailing_segment};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::registry::{DriveId, RegisteredDrive, redact};
use crate::{Drive, DriveProvider, DriveRegistry, EventBroadcaster, HubError, HubEvent, Result};

/// 驱动解析器。
///
/// 发现、共享枚举、连接与注册表写入都在 `confined` 锁内串行执行；
/// 拿到锁后会再次查询注册表，因此同一规范地址的并发首次解析只会产生一个驱动。
pub struct DriveResolver {
    providers: Vec<Arc<dyn DriveProvider>>,
    registry: Arc<DriveRegistry>,
    event_broadcaster: Arc<EventBroadcaster>,
    confined: Mutex<()>,
}

impl DriveResolver {
    /// 创建解析器。
    pub fn new(registry: Arc<DriveRegistry>, event_broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            providers: Vec::new(),
            registry,
            event_broadcaster,
            confined: Mutex::new(()),
        }
    }

    /// 追加一个协议实现。
    pub fn with_provider(mut self, provider: Arc<dyn DriveProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn registry(&self) -> &Arc<DriveRegistry> {
        &self.registry
    }

    /// 处理该 scheme 的第一个协议实现。
    pub fn provider_for(&self, scheme: &str) -> Option<&Arc<dyn DriveProvider>> {
        self.providers.iter().find(|provider| provider.handles(scheme))
    }

    /// 解析 `url` 对应的驱动。
    ///
    /// 发现失败（地址无效、无协议实现、服务器不可达）返回 `Ok(None)`；
    /// 共享枚举或连接失败作为错误返回。
    #[tracing::instrument(skip(self, url), fields(url = %redact(url)))]
    pub async fn resolve(&self, url: &str, share_hint: Option<&str>) -> Result<Option<Arc<dyn Drive>>> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "malformed drive address");
                self.emit_failure(url, &err.to_string());
                return Ok(None);
            }
        };

        if let Some(entry) = self.registry.lookup(&parsed).await {
            return Ok(Some(self.cached(url, entry)));
        }

        let _confined = self.confined.lock().await;
        if let Some(entry) = self.registry.lookup(&parsed).await {
            return Ok(Some(self.cached(url, entry)));
        }

        let Some(provider) = self.provider_for(parsed.scheme()).cloned() else {
            warn!(scheme = parsed.scheme(), "no provider handles scheme");
            self.emit_failure(url, &format!("unsupported scheme: {}", parsed.scheme()));
            return Ok(None);
        };

        let discovered = match share_hint {
            Some(share) => self.discover_with_share(provider.as_ref(), &parsed, share).await,
            None => self.discover_by_listing(provider.as_ref(), &parsed).await,
        };

        match discovered {
            Ok(Some(drive)) => {
                let (entry, inserted) = self.registry.insert(drive).await;
                if inserted {
                    self.event_broadcaster.emit(HubEvent::DriveRegistered {
                        drive_id: entry.id.clone(),
                        base_url: redact(&entry.key),
                        share: entry.drive.active_share(),
                    });
                }
                self.event_broadcaster.emit(HubEvent::DriveResolved {
                    url: redact(url),
                    drive_id: entry.id.clone(),
                    cached: false,
                });
                Ok(Some(entry.drive))
            }
            Ok(None) => {
                info!(provider = provider.name(), "drive discovery found nothing");
                self.emit_failure(url, "discovery failed");
                Ok(None)
            }
            Err(err) => {
                warn!(error = %err, "drive resolution failed");
                self.emit_failure(url, &err.to_string());
                Err(err)
            }
        }
    }

    /// 在受限域内移除一个驱动。
    pub async fn unregister(&self, id: &DriveId) -> Result<RegisteredDrive> {
        let _confined = self.confined.lock().await;
        let entry = self
            .registry
            .unregister(id)
            .await
            .ok_or_else(|| HubError::DriveNotFound(id.to_string()))?;

        info!(drive_id = %id, "drive unregistered");
        self.event_broadcaster
            .emit(HubEvent::DriveUnregistered { drive_id: id.clone() });
        Ok(entry)
    }

    async fn discover_with_share(
        &self,
        provider: &dyn DriveProvider,
        url: &Url,
        share: &str,
    ) -> Result<Option<Arc<dyn Drive>>> {
        let remainder = strip_trailing_segment(url, share);
        debug!(share, remainder = %redact(remainder.as_str()), "discovering with share hint");

        let Some(drive) = provider.discover(&remainder).await else {
            return Ok(None);
        };
        drive.connect(share).await?;
        Ok(Some(drive))
    }

    async fn discover_by_listing(
        &self,
        provider: &dyn DriveProvider,
        url: &Url,
    ) -> Result<Option<Arc<dyn Drive>>> {
        let base = base_address(url);
        let remaining = percent_decode_str(url.path()).decode_utf8_lossy().into_owned();

        let Some(drive) = provider.discover(&base).await else {
            return Ok(None);
        };

        let shares = drive.list_shares().await?;
        let share = select_share(&shares, &remaining);
        debug!(?shares, share = %share, "selected share");

        drive.connect(&share).await?;
        Ok(Some(drive))
    }

    fn cached(&self, url: &str, entry: RegisteredDrive) -> Arc<dyn Drive> {
        debug!(drive_id = %entry.id, "drive registry hit");
        self.event_broadcaster.emit(HubEvent::DriveResolved {
            url: redact(url),
            drive_id: entry.id,
            cached: true,
        });
        entry.drive
    }

    fn emit_failure(&self, url: &str, error: &str) {
        self.event_broadcaster.emit(HubEvent::ResolutionFailed {
            url: redact(url),
            error: error.to_string(),
        });
    }
}

/// 为 `path` 选择共享。
///
/// 依次尝试：第一个作为路径前缀（按路径段边界，兼容 `/export` 与 `share`
/// 两种命名）的共享；列表中的第一个共享；路径的第一段；空字符串（默认命名空间）。
pub fn select_share(shares: &[String], path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    shares
        .iter()
        .find(|share| path_starts_with_share(trimmed, share))
        .or_else(|| shares.first())
        .cloned()
        .unwrap_or_else(|| first_segment(path).to_string())
}

fn path_starts_with_share(path: &str, share: &str) -> bool {
    let share = share.trim_matches('/');
    !share.is_empty()
        && path
            .strip_prefix(share)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
