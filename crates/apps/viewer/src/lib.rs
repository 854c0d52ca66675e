//! Skyline viewer core: selection store, API client, mesh loading, camera
//! fitting and failure notifications, driven one frame at a time.

pub mod api;
pub mod bridge;
pub mod config;
pub mod render_loop;
pub mod session;
pub mod store;

pub use api::{ApiError, ContributionsApi, HttpApi, ModelDownload};
pub use bridge::{ErrorBridge, Failure, Notification};
pub use config::{ConfigError, ViewerConfig};
pub use render_loop::{FrameView, RenderLoop};
pub use session::{Bootstrap, Export, ViewerSession};
pub use store::{ConfigurationStore, ModelTarget, ViewerSelection};
