//! Async command bridge for gphoto2-style camera libraries
//!
//! Lets a single-threaded async caller drive a blocking camera-protocol
//! library without blocking its own task.
//!
//! ## Features
//!
//! - Blocking device calls dispatched onto the worker pool, results
//!   resumed on the caller's task exactly once
//! - Per-device mutual exclusion: at most one native call in flight per
//!   physical camera, independent cameras fully concurrent
//! - Lazy open-on-demand native handles with idempotent close
//! - Recursive config-tree enumeration into a serializable typed tree
//! - Typed value marshalling (string passthrough, integer to choice/range,
//!   float to range) with choice read-back
//! - Structured error taxonomy; usage errors rejected before any work is
//!   scheduled
//! - Per-operation timeouts; scripted mock driver for hardware-free tests
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gphoto_bridge::{CameraRegistry, MockDriver};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), String> {
//! let registry = CameraRegistry::new(Arc::new(MockDriver::new()));
//! let cameras = registry.detect().await?;
//! let camera = registry.open_camera(&cameras[0].model, &cameras[0].port);
//!
//! camera.set_config_value("/main/capturesettings/iso", "800").await?;
//! let picture = camera.take_picture().await?;
//! assert!(!picture.is_empty());
//! # Ok(())
//! # }
//! ```

mod camera;
mod config;
mod device;
mod dispatch;
mod driver;
mod error;
mod mock;
mod ops;
mod registry;

pub use camera::Camera;
pub use config::{ConfigNode, ConfigValue, SetValue, WidgetKind};
pub use device::DeviceHandle;
pub use dispatch::{Dispatcher, Request};
pub use driver::{
    CameraDescriptor, CameraDriver, NativeFile, NativeHandle, RawValue, RawWidget, RawWidgetKind,
    StatusCode,
};
pub use error::{GpError, GpResult};
pub use mock::{CallRecord, MockDriver};
pub use ops::ImageBuffer;
pub use registry::CameraRegistry;

/// Timeout configuration for bridge operations
#[derive(Debug, Clone)]
pub struct BridgeTimeouts {
    /// Full capture timeout (default: 60 seconds)
    pub capture_timeout_secs: u64,
    /// Preview capture timeout (default: 10 seconds)
    pub preview_timeout_secs: u64,
    /// Config fetch/commit timeout (default: 30 seconds)
    pub config_timeout_secs: u64,
    /// Discovery lookup timeout (default: 30 seconds)
    pub detect_timeout_secs: u64,
    /// Explicit close timeout (default: 10 seconds)
    pub close_timeout_secs: u64,
}

impl Default for BridgeTimeouts {
    fn default() -> Self {
        Self {
            capture_timeout_secs: 60,
            preview_timeout_secs: 10,
            config_timeout_secs: 30,
            detect_timeout_secs: 30,
            close_timeout_secs: 10,
        }
    }
}

impl BridgeTimeouts {
    /// Get the full-capture timeout as a Duration
    pub fn capture_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.capture_timeout_secs)
    }

    /// Get the preview timeout as a Duration
    pub fn preview_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.preview_timeout_secs)
    }

    /// Get the config timeout as a Duration
    pub fn config_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config_timeout_secs)
    }

    /// Get the discovery timeout as a Duration
    pub fn detect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.detect_timeout_secs)
    }

    /// Get the close timeout as a Duration
    pub fn close_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.close_timeout_secs)
    }
}
