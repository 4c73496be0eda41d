use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::registry::DriveId;

/// 驱动中心对外广播的事件类型。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    /// 新驱动完成发现与连接并写入注册表。
    DriveRegistered {
        /// 驱动 ID。
        drive_id: DriveId,
        /// 注册表键（规范化基础地址）。
        base_url: String,
        /// 当前绑定的共享。
        share: Option<String>,
    },
    /// 地址解析到已有或新建的驱动。
    DriveResolved {
        /// 请求的地址。
        url: String,
        /// 驱动 ID。
        drive_id: DriveId,
        /// 是否命中注册表缓存。
        cached: bool,
    },
    /// 地址解析失败。
    ResolutionFailed {
        /// 请求的地址。
        url: String,
        /// 错误描述。
        error: String,
    },
    /// 驱动被显式移出注册表。
    DriveUnregistered {
        /// 驱动 ID。
        drive_id: DriveId,
    },
}

/// 基于 `tokio::broadcast` 的事件广播器。
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<HubEvent>,
}

impl EventBroadcaster {
    /// 创建事件广播器。
    ///
    /// `capacity` 表示内部广播队列容量。
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 广播一个事件。没有订阅者时事件被丢弃。
    pub fn emit(&self, event: HubEvent) {
        let _ = self.sender.send(event);
    }

    /// 订阅事件流。
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

/// 事件接收流包装器。
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<HubEvent>,
}

impl EventStream {
    /// 异步接收下一条事件。
    pub async fn recv(&mut self) -> Result<HubEvent> {
        Ok(self.receiver.recv().await?)
    }

    /// 非阻塞尝试接收一条事件。
    pub fn try_recv(&mut self) -> Result<HubEvent> {
        Ok(self.receiver.try_recv()?)
    }
}
