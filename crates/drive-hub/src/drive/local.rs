//! 本地目录驱动。
//!
//! 通过 `local://<name>/...` 暴露配置中的根目录；根目录下的一级子目录即共享。

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use remote_drive_core::{FileObject, FileType, base_address};
use tracing::info;
use url::Url;

use super::{Drive, DriveProvider, PlaybackHandle};
use crate::config::LocalRootConfig;
use crate::error::{HubError, Result};

pub const LOCAL_SCHEME: &str = "local";

#[derive(Debug, Clone)]
struct LocalRoot {
    path: PathBuf,
    read_only: bool,
}

pub struct LocalProvider {
    roots: HashMap<String, LocalRoot>,
}

impl LocalProvider {
    pub fn new(roots: &[LocalRootConfig]) -> Self {
        let roots = roots
            .iter()
            .map(|root| {
                (
                    root.name.to_ascii_lowercase(),
                    LocalRoot {
                        path: root.path.clone(),
                        read_only: root.read_only,
                    },
                )
            })
            .collect();
        Self { roots }
    }
}

#[async_trait]
impl DriveProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn scheme(&self, _secure: bool) -> &str {
        LOCAL_SCHEME
    }

    async fn discover(&self, address: &Url) -> Option<Arc<dyn Drive>> {
        if address.scheme() != LOCAL_SCHEME {
            return None;
        }
        let root = self.roots.get(&address.host_str()?.to_ascii_lowercase())?;

        Some(Arc::new(LocalDrive {
            base_url: base_address(address),
            root: root.path.clone(),
            read_only: root.read_only,
            share: RwLock::new(None),
        }))
    }
}

pub struct LocalDrive {
    base_url: Url,
    root: PathBuf,
    read_only: bool,
    share: RwLock<Option<String>>,
}

impl LocalDrive {
    fn scope(&self) -> PathBuf {
        match self.active_share() {
            Some(share) => self.root.join(share),
            None => self.root.clone(),
        }
    }

    /// 将请求路径映射到磁盘路径。路径可以带或不带当前共享名前缀。
    ///
    /// 首个路径段等于当前共享名时总被视为共享前缀并去掉，因此共享内与共享同名的
    /// 子目录须写成 `/<share>/<share>/...` 才能访问。
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if let Some(share) = self.active_share() {
            if components.first() == Some(&share.as_str()) {
                components.remove(0);
            }
        }

        let relative: PathBuf = components.iter().collect();
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(HubError::PermissionDenied(path.to_string()));
        }

        Ok(self.scope().join(relative))
    }

    fn ensure_writable(&self, path: &str) -> Result<()> {
        if self.read_only {
            return Err(HubError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    async fn entry_for(&self, parent: &str, entry: &tokio::fs::DirEntry) -> Result<FileObject> {
        let name = entry.file_name().to_string_lossy().to_string();
        let path = format!("{}/{}", parent.trim_end_matches('/'), name);
        let link_metadata = tokio::fs::symlink_metadata(entry.path()).await?;
        let metadata = if link_metadata.file_type().is_symlink() {
            tokio::fs::metadata(entry.path()).await.unwrap_or(link_metadata.clone())
        } else {
            link_metadata.clone()
        };

        let file_type = if link_metadata.file_type().is_symlink() {
            FileType::SymbolicLink
        } else if metadata.is_dir() {
            FileType::Directory
        } else {
            FileType::Regular
        };

        let mut object = FileObject::new(Some(self.entry_url(&path)), name.clone(), path, file_type)
            .with_size(if metadata.is_file() { metadata.len() } else { 0 })
            .with_hidden(name.starts_with('.'))
            .with_read_only(self.read_only || metadata.permissions().readonly());
        if let Ok(modified) = metadata.modified() {
            object = object.with_modified_date(DateTime::<Utc>::from(modified));
        }
        if let Ok(created) = metadata.created() {
            object = object.with_creation_date(DateTime::<Utc>::from(created));
        }

        Ok(object)
    }
}

fn map_io(path: &str, err: std::io::Error) -> HubError {
    match err.kind() {
        ErrorKind::NotFound => HubError::NotFound(path.to_string()),
        ErrorKind::PermissionDenied => HubError::PermissionDenied(path.to_string()),
        _ => HubError::Io(err),
    }
}

#[async_trait]
impl Drive for LocalDrive {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn active_share(&self) -> Option<String> {
        self.share.read().ok().and_then(|share| share.clone())
    }

    async fn list_shares(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|err| map_io(&self.root.display().to_string(), err))?;

        let mut shares = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                shares.push(name);
            }
        }
        shares.sort();
        Ok(shares)
    }

    async fn connect(&self, share: &str) -> Result<()> {
        let share = share.trim_matches('/');
        if self.active_share().as_deref() == Some(share) {
            return Ok(());
        }

        let bound = if share.is_empty() {
            None
        } else {
            // 共享只能是根目录下的一级普通目录名，`..`、`.`、多级与绝对路径一律拒绝。
            let components: Vec<Component<'_>> = Path::new(share).components().collect();
            if !matches!(components.as_slice(), [Component::Normal(_)]) {
                return Err(HubError::ShareNotFound(share.to_string()));
            }

            let is_dir = tokio::fs::metadata(self.root.join(share))
                .await
                .map(|metadata| metadata.is_dir())
                .unwrap_or(false);
            if !is_dir {
                return Err(HubError::ShareNotFound(share.to_string()));
            }
            Some(share.to_string())
        };

        info!(base_url = %self.base_url, share = ?bound, "local drive connected");
        let mut current = self
            .share
            .write()
            .map_err(|_| anyhow::anyhow!("share lock poisoned"))?;
        *current = bound;
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<FileObject>> {
        let dir = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&dir).await.map_err(|err| map_io(path, err))?;
        if !metadata.is_dir() {
            return Err(HubError::NotADirectory(path.to_string()));
        }

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|err| map_io(path, err))?;
        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            objects.push(self.entry_for(path, &entry).await?);
        }
        Ok(objects)
    }

    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.resolve(path)?;
        tokio::fs::read(&file).await.map_err(|err| map_io(path, err))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.ensure_writable(path)?;
        let target = self.resolve(path)?;
        if target == self.scope() {
            return Err(HubError::PermissionDenied(path.to_string()));
        }

        let metadata = tokio::fs::symlink_metadata(&target)
            .await
            .map_err(|err| map_io(path, err))?;
        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_file(&target).await
        };
        removed.map_err(|err| map_io(path, err))
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        self.ensure_writable(path)?;
        let target = self.resolve(path)?;
        tokio::fs::create_dir(&target)
            .await
            .map_err(|err| map_io(path, err))
    }

    async fn playback_handle(&self, path: &str) -> Option<PlaybackHandle> {
        let file = self.resolve(path).ok()?;
        let metadata = tokio::fs::metadata(&file).await.ok()?;
        if !metadata.is_file() {
            return None;
        }
        let absolute = tokio::fs::canonicalize(&file).await.unwrap_or(file);
        Url::from_file_path(absolute).ok().map(PlaybackHandle::new)
    }
}
