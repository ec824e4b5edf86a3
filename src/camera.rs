//! Logical camera object
//!
//! Caller-facing async surface over one physical device. Every method
//! builds a request object, hands it to the dispatcher, and resumes the
//! caller's task with the result; the blocking native call never runs on
//! the caller's context, and calls against the same device are serialized
//! by the device handle's lock.

use std::sync::{Arc, Weak};

use crate::config::{validate_key, ConfigNode, SetValue};
use crate::device::DeviceHandle;
use crate::dispatch::Dispatcher;
use crate::driver::CameraDriver;
use crate::error::GpResult;
use crate::ops::{
    CloseRequest, GetConfigRequest, GetPreviewRequest, ImageBuffer, SetConfigRequest,
    TakePictureRequest,
};
use crate::registry::CameraRegistry;

/// One logical camera, created by [`CameraRegistry::open_camera`].
///
/// The native handle is opened lazily by the first operation that needs
/// it. Dropping the camera releases the native handle first, then notifies
/// the owning registry through a non-owning back-reference.
pub struct Camera {
    id: u64,
    driver: Arc<dyn CameraDriver>,
    handle: Arc<DeviceHandle>,
    dispatcher: Dispatcher,
    registry: Weak<CameraRegistry>,
}

impl Camera {
    pub(crate) fn new(
        id: u64,
        driver: Arc<dyn CameraDriver>,
        handle: Arc<DeviceHandle>,
        dispatcher: Dispatcher,
        registry: Weak<CameraRegistry>,
    ) -> Self {
        Self {
            id,
            driver,
            handle,
            dispatcher,
            registry,
        }
    }

    pub fn model(&self) -> &str {
        self.handle.model()
    }

    pub fn port(&self) -> &str {
        self.handle.port()
    }

    /// Whether the native handle is currently open
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Capture a full image into a caller-owned buffer
    pub async fn take_picture(&self) -> GpResult<ImageBuffer> {
        self.dispatcher
            .submit(TakePictureRequest {
                driver: self.driver.clone(),
                handle: self.handle.clone(),
            })
            .await
    }

    /// Capture a live-preview frame into a caller-owned buffer
    pub async fn get_preview(&self) -> GpResult<ImageBuffer> {
        self.dispatcher
            .submit(GetPreviewRequest {
                driver: self.driver.clone(),
                handle: self.handle.clone(),
            })
            .await
    }

    /// Fetch the device's configuration tree.
    ///
    /// The tree is rebuilt from scratch on every call; nodes are never
    /// shared across calls.
    pub async fn get_config(&self) -> GpResult<ConfigNode> {
        self.dispatcher
            .submit(GetConfigRequest {
                driver: self.driver.clone(),
                handle: self.handle.clone(),
            })
            .await
    }

    /// Write one config value addressed by a slash-delimited key
    /// (`/main/capturesettings/iso`). Accepts strings, integers and floats;
    /// the value's type selects the marshalling branch.
    ///
    /// Malformed arguments are rejected before any work is scheduled; the
    /// device is not touched in that case.
    pub async fn set_config_value(
        &self,
        key: &str,
        value: impl Into<SetValue>,
    ) -> GpResult<()> {
        let value = value.into();
        validate_key(key, &value)?;
        self.dispatcher
            .submit(SetConfigRequest {
                driver: self.driver.clone(),
                handle: self.handle.clone(),
                key: key.to_string(),
                value,
            })
            .await
    }

    /// Explicitly release the native handle. Idempotent; any native close
    /// error is reported here rather than swallowed.
    pub async fn close(&self) -> GpResult<()> {
        self.dispatcher
            .submit(CloseRequest {
                driver: self.driver.clone(),
                handle: self.handle.clone(),
            })
            .await
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        // Native handle goes first; the registry back-reference must never
        // extend this camera's lifetime, so it is only upgraded to notify.
        self.handle.close_quietly(self.driver.as_ref());
        if let Some(registry) = self.registry.upgrade() {
            registry.release(self.id);
        }
    }
}
