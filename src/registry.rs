//! Camera registry
//!
//! One explicit factory object per process: owns the driver, the dispatch
//! timeouts, and the bookkeeping of logical cameras created from it. This
//! replaces the original design's process-global constructor state with a
//! value whose lifetime is tied to process start and teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::camera::Camera;
use crate::device::DeviceHandle;
use crate::dispatch::Dispatcher;
use crate::driver::{CameraDescriptor, CameraDriver};
use crate::error::GpResult;
use crate::ops::DetectRequest;
use crate::BridgeTimeouts;

/// Factory and bookkeeper for logical cameras
pub struct CameraRegistry {
    driver: Arc<dyn CameraDriver>,
    dispatcher: Dispatcher,
    next_id: AtomicU64,
    /// id -> "model@port", entries removed when the camera is dropped
    open: Mutex<HashMap<u64, String>>,
}

impl CameraRegistry {
    pub fn new(driver: Arc<dyn CameraDriver>) -> Arc<Self> {
        Self::with_timeouts(driver, BridgeTimeouts::default())
    }

    pub fn with_timeouts(driver: Arc<dyn CameraDriver>, timeouts: BridgeTimeouts) -> Arc<Self> {
        Arc::new(Self {
            driver,
            dispatcher: Dispatcher::new(timeouts),
            next_id: AtomicU64::new(1),
            open: Mutex::new(HashMap::new()),
        })
    }

    /// List attached cameras via the discovery collaborator. Dispatched off
    /// the caller's task like any other blocking call.
    pub async fn detect(&self) -> GpResult<Vec<CameraDescriptor>> {
        self.dispatcher
            .submit(DetectRequest {
                driver: self.driver.clone(),
            })
            .await
    }

    /// Create a logical camera for a model + port pair. Lazy: no native
    /// handle is opened until the first operation needs one.
    pub fn open_camera(self: &Arc<Self>, model: &str, port: &str) -> Camera {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut open) = self.open.lock() {
            open.insert(id, format!("{}@{}", model, port));
        }
        tracing::debug!("Created camera #{} for '{}' on {}", id, model, port);
        Camera::new(
            id,
            self.driver.clone(),
            Arc::new(DeviceHandle::new(model, port)),
            self.dispatcher.clone(),
            Arc::downgrade(self),
        )
    }

    /// Number of live logical cameras created from this registry
    pub fn open_count(&self) -> usize {
        self.open.lock().map(|open| open.len()).unwrap_or(0)
    }

    /// Called from `Camera::drop` through the weak back-reference
    pub(crate) fn release(&self, id: u64) {
        if let Ok(mut open) = self.open.lock() {
            if open.remove(&id).is_some() {
                tracing::debug!("Released camera #{}", id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;

    #[tokio::test]
    async fn test_detect_lists_attached_cameras() {
        let registry = CameraRegistry::new(Arc::new(MockDriver::new()));
        let cameras = registry.detect().await.unwrap();
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].model, "Fujifilm X100");
        assert_eq!(cameras[0].port, "usb:001,007");
    }

    #[tokio::test]
    async fn test_drop_closes_handle_and_releases_entry() {
        let driver = Arc::new(MockDriver::new());
        let registry = CameraRegistry::new(driver.clone());

        let camera = registry.open_camera("Fujifilm X100", "usb:001,007");
        assert_eq!(registry.open_count(), 1);
        camera.take_picture().await.unwrap();
        assert_eq!(driver.open_handles(), 1);

        drop(camera);
        assert_eq!(registry.open_count(), 0);
        assert_eq!(driver.open_handles(), 0);
        assert_eq!(driver.native_closes(), 1);
    }

    #[tokio::test]
    async fn test_drop_of_never_opened_camera_skips_native_close() {
        let driver = Arc::new(MockDriver::new());
        let registry = CameraRegistry::new(driver.clone());
        let camera = registry.open_camera("Fujifilm X100", "usb:001,007");
        drop(camera);
        assert_eq!(driver.native_closes(), 0);
        assert_eq!(registry.open_count(), 0);
    }

    #[test]
    fn test_camera_outlives_registry_without_keeping_it_alive() {
        let driver = Arc::new(MockDriver::new());
        let registry = CameraRegistry::new(driver.clone());
        let camera = registry.open_camera("Fujifilm X100", "usb:001,007");

        drop(registry);
        // The weak back-reference did not extend the registry's lifetime;
        // dropping the camera afterwards must not panic.
        drop(camera);
        assert_eq!(driver.open_handles(), 0);
    }
}
