//! API 路由模块。
//!
//! 向播放客户端暴露驱动中心的解析、浏览与播放能力。

pub mod drives;
pub mod state;

pub use drives::create_drive_router;
pub use state::AppState;
