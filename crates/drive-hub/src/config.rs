use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use remote_drive_core::SortType;
use serde::Deserialize;
type Result<T> = anyhow::Result<T>;

#[derive(Debug, Deserialize, Clone)]
pub struct HubConfig {
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
    #[serde(default = "default_bridge_timeout_ms")]
    pub bridge_timeout_ms: u64,
    #[serde(default)]
    pub local_roots: Vec<LocalRootConfig>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub listing: ListingOptions,
}

impl HubConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("failed to deserialize hub config")
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge_timeout_ms)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: default_event_buffer_size(),
            bridge_timeout_ms: default_bridge_timeout_ms(),
            local_roots: Vec::new(),
            http: HttpConfig::default(),
            listing: ListingOptions::default(),
        }
    }
}

/// 以 `local://<name>/...` 暴露的本地目录。
#[derive(Debug, Deserialize, Clone)]
pub struct LocalRootConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            user_agent: default_user_agent(),
        }
    }
}

/// 目录列表的默认排序与过滤选项。
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ListingOptions {
    #[serde(default)]
    pub sort: SortType,
    #[serde(default = "default_enabled")]
    pub ascending: bool,
    #[serde(default = "default_enabled")]
    pub directories_first: bool,
    #[serde(default)]
    pub show_hidden: bool,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            sort: SortType::default(),
            ascending: true,
            directories_first: true,
            show_hidden: false,
        }
    }
}

fn default_event_buffer_size() -> usize {
    256
}

fn default_bridge_timeout_ms() -> u64 {
    30_000
}

fn default_enabled() -> bool {
    true
}

fn default_user_agent() -> String {
    concat!("drive-hub/", env!("CARGO_PKG_VERSION")).to_string()
}
