use std::collections::HashSet;
use std::sync::Arc;

use remote_drive_core::{DomainError, FileObject, Predicate, relative_path, sort_entries, translate};
use tokio::runtime::Handle;
use tracing::{debug, info};
use url::Url;

use crate::drive::{HttpProvider, LocalProvider};
use crate::registry::redact;
use crate::{
    Drive, DriveId, DriveInfo, DriveProvider, DriveRegistry, DriveResolver, EventBroadcaster,
    EventStream, HubConfig, HubError, ListingOptions, PlaybackHandle, Result, SyncBridge,
};

/// 驱动中心：应用根对象，持有注册表、解析器与事件广播器。
///
/// 所有按地址的操作都先经解析器取得驱动，再以相对于驱动基础地址的路径调用驱动。
pub struct DriveHub {
    config: Arc<HubConfig>,
    resolver: Arc<DriveResolver>,
    event_broadcaster: Arc<EventBroadcaster>,
}

impl DriveHub {
    /// 按配置创建驱动中心并装配内置协议。
    pub fn new(config: HubConfig) -> Result<Self> {
        validate_local_roots(&config)?;

        let mut providers: Vec<Arc<dyn DriveProvider>> = Vec::new();
        if !config.local_roots.is_empty() {
            providers.push(Arc::new(LocalProvider::new(&config.local_roots)));
        }
        if config.http.enabled {
            providers.push(Arc::new(HttpProvider::new(&config.http)));
        }

        Ok(Self::with_providers(config, providers))
    }

    /// 使用调用方提供的协议实现创建驱动中心。
    pub fn with_providers(config: HubConfig, providers: Vec<Arc<dyn DriveProvider>>) -> Self {
        info!(
            event_buffer_size = config.event_buffer_size,
            provider_count = providers.len(),
            local_root_count = config.local_roots.len(),
            "initializing drive hub"
        );

        let event_broadcaster = Arc::new(EventBroadcaster::new(config.event_buffer_size));
        let registry = Arc::new(DriveRegistry::new());
        let resolver = providers.into_iter().fold(
            DriveResolver::new(registry, event_broadcaster.clone()),
            DriveResolver::with_provider,
        );

        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            event_broadcaster,
        }
    }

    pub fn registry(&self) -> &Arc<DriveRegistry> {
        self.resolver.registry()
    }

    pub fn resolver(&self) -> &Arc<DriveResolver> {
        &self.resolver
    }

    /// 配置中的目录列表默认选项。
    pub fn listing_defaults(&self) -> ListingOptions {
        self.config.listing
    }

    pub async fn resolve(&self, url: &str, share_hint: Option<&str>) -> Result<Option<Arc<dyn Drive>>> {
        self.resolver.resolve(url, share_hint).await
    }

    pub async fn list_shares(&self, url: &str) -> Result<Vec<String>> {
        let (drive, _) = self.locate(url).await?;
        drive.list_shares().await
    }

    /// 列出目录，按选项过滤隐藏条目并排序。
    #[tracing::instrument(skip(self, url), fields(url = %redact(url)))]
    pub async fn list_directory(&self, url: &str, options: ListingOptions) -> Result<Vec<FileObject>> {
        let (drive, path) = self.locate(url).await?;
        let mut entries = drive.list_directory(&path).await?;
        if !options.show_hidden {
            entries.retain(|entry| !entry.is_hidden());
        }
        sort_entries(
            &mut entries,
            options.sort,
            options.ascending,
            options.directories_first,
        );
        debug!(path = %path, count = entries.len(), "directory listed");
        Ok(entries)
    }

    /// 在目录列表中筛选满足 `predicate` 的条目。
    ///
    /// `predicate` 使用平台元数据键，求值前转换为 `FileObject` 的属性键。
    #[tracing::instrument(skip(self, url, predicate), fields(url = %redact(url)))]
    pub async fn search(
        &self,
        url: &str,
        predicate: &Predicate,
        options: ListingOptions,
    ) -> Result<Vec<FileObject>> {
        let translated = translate(predicate)?;
        let entries = self.list_directory(url, options).await?;

        let mut matched = Vec::new();
        for entry in entries {
            if translated.evaluate(&entry.to_queryable_map())? {
                matched.push(entry);
            }
        }
        debug!(count = matched.len(), "search finished");
        Ok(matched)
    }

    pub async fn read_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let (drive, path) = self.locate(url).await?;
        drive.read_bytes(&path).await
    }

    pub async fn remove(&self, url: &str) -> Result<()> {
        let (drive, path) = self.locate(url).await?;
        info!(url = %redact(url), path = %path, "removing entry");
        drive.remove(&path).await
    }

    pub async fn mkdir(&self, url: &str) -> Result<()> {
        let (drive, path) = self.locate(url).await?;
        info!(url = %redact(url), path = %path, "creating directory");
        drive.mkdir(&path).await
    }

    pub async fn playback_handle(&self, url: &str) -> Result<Option<PlaybackHandle>> {
        let (drive, path) = self.locate(url).await?;
        Ok(drive.playback_handle(&path).await)
    }

    pub async fn drives(&self) -> Vec<DriveInfo> {
        self.registry().entries().await
    }

    pub async fn unregister(&self, id: &DriveId) -> Result<DriveInfo> {
        self.resolver.unregister(id).await.map(|entry| entry.info())
    }

    pub fn subscribe_events(&self) -> EventStream {
        self.event_broadcaster.subscribe()
    }

    /// 创建在 `runtime` 上执行解析的同步桥。
    pub fn sync_bridge(&self, runtime: Handle) -> SyncBridge {
        SyncBridge::new(self.resolver.clone(), runtime, self.config.bridge_timeout())
    }

    async fn locate(&self, url: &str) -> Result<(Arc<dyn Drive>, String)> {
        let parsed = Url::parse(url).map_err(|err| DomainError::InvalidAddress(err.to_string()))?;
        let drive = self
            .resolver
            .resolve(url, None)
            .await?
            .ok_or_else(|| HubError::DriveNotFound(redact(url)))?;
        let path = relative_path(drive.base_url(), &parsed);
        Ok((drive, path))
    }
}

fn validate_local_roots(config: &HubConfig) -> Result<()> {
    let mut names = HashSet::new();
    for root in &config.local_roots {
        let name = root.name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(HubError::Config("local root name must not be empty".to_string()));
        }
        if !names.insert(name) {
            return Err(HubError::Config(format!(
                "duplicate local root name: {}",
                root.name
            )));
        }
    }
    Ok(())
}
