//! Request objects, one per camera operation
//!
//! Each request binds a device handle reference, the driver, and
//! operation-specific inputs; its `execute` body runs on the worker context
//! and performs the native call sequence under the device lock. Requests
//! are built on call entry, consumed by the dispatcher, and dropped after
//! their single resolution.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{enumerate, marshal, resolve, ConfigNode, SetValue};
use crate::device::DeviceHandle;
use crate::dispatch::Request;
use crate::driver::{CameraDescriptor, CameraDriver, NativeFile, StatusCode};
use crate::error::{GpError, GpResult};
use crate::BridgeTimeouts;

/// Caller-owned captured image bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pub data: Vec<u8>,
}

impl ImageBuffer {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for ImageBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

fn io(operation: &'static str) -> impl Fn(StatusCode) -> GpError {
    move |status| GpError::Io { operation, status }
}

/// Frees the intermediate native file object on every exit path. The
/// original implementation freed it only on success; here the free is
/// unconditional.
struct FileGuard<'a> {
    driver: &'a dyn CameraDriver,
    file: NativeFile,
}

impl Drop for FileGuard<'_> {
    fn drop(&mut self) {
        self.driver.free_file(self.file);
    }
}

/// Full capture into a caller-owned buffer
pub struct TakePictureRequest {
    pub driver: Arc<dyn CameraDriver>,
    pub handle: Arc<DeviceHandle>,
}

impl Request for TakePictureRequest {
    type Output = ImageBuffer;

    fn operation(&self) -> &'static str {
        "take_picture"
    }

    fn timeout(&self, timeouts: &BridgeTimeouts) -> Duration {
        timeouts.capture_timeout()
    }

    fn execute(self) -> GpResult<ImageBuffer> {
        self.handle.with_lock(self.driver.as_ref(), |driver, native| {
            let data = driver
                .capture_to_memory(native)
                .map_err(io("capture_to_memory"))?;
            tracing::debug!("Captured {} bytes", data.len());
            Ok(ImageBuffer { data })
        })
    }
}

/// Live-preview capture through the intermediate native file object
pub struct GetPreviewRequest {
    pub driver: Arc<dyn CameraDriver>,
    pub handle: Arc<DeviceHandle>,
}

impl Request for GetPreviewRequest {
    type Output = ImageBuffer;

    fn operation(&self) -> &'static str {
        "get_preview"
    }

    fn timeout(&self, timeouts: &BridgeTimeouts) -> Duration {
        timeouts.preview_timeout()
    }

    fn execute(self) -> GpResult<ImageBuffer> {
        self.handle.with_lock(self.driver.as_ref(), |driver, native| {
            let file = driver.new_file().map_err(io("new_file"))?;
            let _guard = FileGuard { driver, file };
            driver
                .capture_preview(native, file)
                .map_err(io("capture_preview"))?;
            let data = driver.file_data(file).map_err(io("file_data"))?;
            Ok(ImageBuffer { data })
        })
    }
}

/// Fetch and enumerate the config tree
pub struct GetConfigRequest {
    pub driver: Arc<dyn CameraDriver>,
    pub handle: Arc<DeviceHandle>,
}

impl Request for GetConfigRequest {
    type Output = ConfigNode;

    fn operation(&self) -> &'static str {
        "get_config"
    }

    fn timeout(&self, timeouts: &BridgeTimeouts) -> Duration {
        timeouts.config_timeout()
    }

    fn execute(self) -> GpResult<ConfigNode> {
        // Only the native fetch needs the lock; enumeration reads the
        // owned copy after release.
        let raw = self
            .handle
            .with_lock(self.driver.as_ref(), |driver, native| {
                driver.get_config(native).map_err(io("get_config"))
            })?;
        Ok(enumerate(&raw))
    }
}

/// Resolve a key in a fresh tree, marshal the typed value, write it back
/// and commit
pub struct SetConfigRequest {
    pub driver: Arc<dyn CameraDriver>,
    pub handle: Arc<DeviceHandle>,
    pub key: String,
    pub value: SetValue,
}

impl Request for SetConfigRequest {
    type Output = ();

    fn operation(&self) -> &'static str {
        "set_config_value"
    }

    fn timeout(&self, timeouts: &BridgeTimeouts) -> Duration {
        timeouts.config_timeout()
    }

    fn execute(self) -> GpResult<()> {
        let Self {
            driver,
            handle,
            key,
            value,
        } = self;
        handle.with_lock(driver.as_ref(), |driver, native| {
            let tree = driver.get_config(native).map_err(io("get_config"))?;
            let widget = resolve(&tree, &key).ok_or_else(|| GpError::ConfigLookup {
                key: key.clone(),
            })?;
            let raw = marshal(&key, widget, value)?;
            driver
                .set_widget_value(native, &key, &raw)
                .map_err(io("set_widget_value"))?;
            driver.commit_config(native).map_err(io("commit_config"))?;
            tracing::debug!("Committed {} = {:?}", key, raw);
            Ok(())
        })
    }
}

/// Explicit close of the native handle
pub struct CloseRequest {
    pub driver: Arc<dyn CameraDriver>,
    pub handle: Arc<DeviceHandle>,
}

impl Request for CloseRequest {
    type Output = ();

    fn operation(&self) -> &'static str {
        "close"
    }

    fn timeout(&self, timeouts: &BridgeTimeouts) -> Duration {
        timeouts.close_timeout()
    }

    fn execute(self) -> GpResult<()> {
        self.handle.close(self.driver.as_ref())
    }
}

/// Port-info/abilities lookup behind the discovery black box
pub struct DetectRequest {
    pub driver: Arc<dyn CameraDriver>,
}

impl Request for DetectRequest {
    type Output = Vec<CameraDescriptor>;

    fn operation(&self) -> &'static str {
        "detect"
    }

    fn timeout(&self, timeouts: &BridgeTimeouts) -> Duration {
        timeouts.detect_timeout()
    }

    fn execute(self) -> GpResult<Vec<CameraDescriptor>> {
        self.driver.detect().map_err(io("detect"))
    }
}
