use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use drive_hub::{Drive, DriveProvider, HubError, PlaybackHandle, Result};
use remote_drive_core::{FileObject, FileType};
use url::Url;

/// 记录调用次数的模拟协议。
#[derive(Clone)]
pub struct MockProvider {
    shares: Vec<String>,
    reachable: bool,
    delay: Duration,
    discover_calls: Arc<AtomicUsize>,
    connect_calls: Arc<AtomicUsize>,
    bound_shares: Arc<Mutex<Vec<String>>>,
    discovered_at: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    pub fn new(shares: &[&str]) -> Self {
        Self {
            shares: shares.iter().map(|share| share.to_string()).collect(),
            reachable: true,
            delay: Duration::ZERO,
            discover_calls: Arc::new(AtomicUsize::new(0)),
            connect_calls: Arc::new(AtomicUsize::new(0)),
            bound_shares: Arc::new(Mutex::new(Vec::new())),
            discovered_at: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new(&[])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// 每次成功 `connect` 绑定的共享名。
    pub fn bound_shares(&self) -> Vec<String> {
        self.bound_shares.lock().unwrap().clone()
    }

    /// 每次 `discover` 收到的地址。
    pub fn discovered_at(&self) -> Vec<String> {
        self.discovered_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl DriveProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn scheme(&self, secure: bool) -> &str {
        if secure { "mocks" } else { "mock" }
    }

    async fn discover(&self, address: &Url) -> Option<Arc<dyn Drive>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        self.discovered_at.lock().unwrap().push(address.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if !self.reachable {
            return None;
        }

        Some(Arc::new(MockDrive {
            base_url: address.clone(),
            shares: self.shares.clone(),
            share: Mutex::new(None),
            connect_calls: self.connect_calls.clone(),
            bound_shares: self.bound_shares.clone(),
        }))
    }
}

pub struct MockDrive {
    base_url: Url,
    shares: Vec<String>,
    share: Mutex<Option<String>>,
    connect_calls: Arc<AtomicUsize>,
    bound_shares: Arc<Mutex<Vec<String>>>,
}

fn entry(base: &Url, name: &str, file_type: FileType, size: u64, day: u32) -> FileObject {
    let path = format!("/{name}");
    let mut url = base.clone();
    url.set_path(&path);
    FileObject::new(Some(url), name, path, file_type)
        .with_size(size)
        .with_hidden(name.starts_with('.'))
        .with_modified_date(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap())
}

#[async_trait]
impl Drive for MockDrive {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn active_share(&self) -> Option<String> {
        self.share.lock().unwrap().clone()
    }

    async fn list_shares(&self) -> Result<Vec<String>> {
        Ok(self.shares.clone())
    }

    async fn connect(&self, share: &str) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let known = self.shares.is_empty() || self.shares.iter().any(|known| known == share);
        if !share.is_empty() && !known {
            return Err(HubError::ShareNotFound(share.to_string()));
        }

        self.bound_shares.lock().unwrap().push(share.to_string());
        *self.share.lock().unwrap() = (!share.is_empty()).then(|| share.to_string());
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<FileObject>> {
        if path.ends_with(".mp4") {
            return Err(HubError::NotADirectory(path.to_string()));
        }

        Ok(vec![
            entry(&self.base_url, "file10.mp4", FileType::Regular, 4096, 3),
            entry(&self.base_url, "dirA", FileType::Directory, 0, 1),
            entry(&self.base_url, "file2.mp4", FileType::Regular, 64, 2),
            entry(&self.base_url, ".thumbs", FileType::Directory, 0, 4),
        ])
    }

    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        Ok(path.as_bytes().to_vec())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        Err(HubError::PermissionDenied(path.to_string()))
    }

    async fn mkdir(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    async fn playback_handle(&self, path: &str) -> Option<PlaybackHandle> {
        path.ends_with(".mp4").then(|| {
            PlaybackHandle::new(self.entry_url(path)).with_option("relative_path", path)
        })
    }
}
