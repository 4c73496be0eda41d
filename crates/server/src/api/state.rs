//! 统一的应用状态。

use std::sync::Arc;

use drive_hub::{DriveHub, ListingOptions};

/// 统一的应用状态，包含所有路由共享的数据。
#[derive(Clone)]
pub struct AppState {
    /// 驱动中心。
    pub hub: Arc<DriveHub>,
    /// 目录列表默认选项。
    pub listing: ListingOptions,
}

impl AppState {
    /// 创建新的应用状态。
    pub fn new(hub: Arc<DriveHub>) -> Self {
        let listing = hub.listing_defaults();
        Self { hub, listing }
    }
}
