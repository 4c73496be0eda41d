pub mod bridge;
pub mod config;
pub mod drive;
pub mod error;
pub mod events;
pub mod hub;
pub mod registry;
pub mod resolver;

pub use bridge::SyncBridge;
pub use config::{HttpConfig, HubConfig, ListingOptions, LocalRootConfig};
pub use drive::{Drive, DriveProvider, PlaybackHandle};
pub use error::{HubError, Result};
pub use events::{EventBroadcaster, EventStream, HubEvent};
pub use hub::DriveHub;
pub use registry::{DriveId, DriveInfo, DriveRegistry, RegisteredDrive};
pub use resolver::{DriveResolver, select_share};
