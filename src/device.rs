//! Per-device handle and locking discipline
//!
//! A [`DeviceHandle`] exclusively owns the opaque native handle for one
//! physical camera. The native handle is opened on demand by the first
//! operation that needs it, and every native call goes through
//! [`DeviceHandle::with_lock`] so at most one call is in flight per device
//! at any instant.

use std::sync::Mutex;

use crate::driver::{CameraDriver, NativeHandle};
use crate::error::{GpError, GpResult};

/// Exclusive owner of one native device handle
pub struct DeviceHandle {
    model: String,
    port: String,
    /// `None` while closed; the mutex is the per-device lock
    state: Mutex<Option<NativeHandle>>,
}

impl DeviceHandle {
    /// New handle in the closed state; no native open happens here
    pub fn new(model: &str, port: &str) -> Self {
        Self {
            model: model.to_string(),
            port: port.to_string(),
            state: Mutex::new(None),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Whether the native handle is currently open
    pub fn is_open(&self) -> bool {
        self.state.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Run `f` with the device lock held, opening the native handle first if
    /// needed. The lock is released on every exit path, including failures
    /// inside `f` and open failures.
    ///
    /// Blocking: must be called from the dispatcher's worker context.
    pub fn with_lock<T>(
        &self,
        driver: &dyn CameraDriver,
        f: impl FnOnce(&dyn CameraDriver, NativeHandle) -> GpResult<T>,
    ) -> GpResult<T> {
        let mut state = self.state.lock().map_err(|e| {
            GpError::WorkerGone(format!("device lock poisoned: {}", e))
        })?;
        let handle = match *state {
            Some(handle) => handle,
            None => {
                tracing::debug!("Opening camera '{}' on {}", self.model, self.port);
                let handle = driver.open_camera(&self.model, &self.port).map_err(|status| {
                    GpError::DeviceOpen {
                        model: self.model.clone(),
                        port: self.port.clone(),
                        status,
                    }
                })?;
                *state = Some(handle);
                handle
            }
        };
        f(driver, handle)
    }

    /// Idempotent close. The native close runs at most once across repeated
    /// calls; close errors are reported but the handle is considered closed
    /// either way.
    ///
    /// Blocking: must be called from the dispatcher's worker context (or a
    /// destructor, see [`close_quietly`](Self::close_quietly)).
    pub fn close(&self, driver: &dyn CameraDriver) -> GpResult<()> {
        let handle = match self.state.lock() {
            Ok(mut state) => state.take(),
            Err(e) => {
                return Err(GpError::WorkerGone(format!(
                    "device lock poisoned: {}",
                    e
                )))
            }
        };
        match handle {
            Some(handle) => {
                tracing::debug!("Closing camera '{}' on {}", self.model, self.port);
                driver.close_camera(handle).map_err(|status| GpError::Io {
                    operation: "close_camera",
                    status,
                })
            }
            None => Ok(()),
        }
    }

    /// Destructor-path close: never fails, any native close error is logged
    pub fn close_quietly(&self, driver: &dyn CameraDriver) {
        if let Err(e) = self.close(driver) {
            tracing::warn!(
                "Error closing camera '{}' on {}: {}",
                self.model,
                self.port,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::StatusCode;
    use crate::mock::MockDriver;

    #[test]
    fn test_open_on_demand() {
        let driver = MockDriver::new();
        let handle = DeviceHandle::new("Fujifilm X100", "usb:001,007");
        assert!(!handle.is_open());

        handle
            .with_lock(&driver, |_, native| {
                assert_eq!(native, NativeHandle(1));
                Ok(())
            })
            .unwrap();
        assert!(handle.is_open());

        // Second operation reuses the existing native handle
        handle.with_lock(&driver, |_, _| Ok(())).unwrap();
        assert_eq!(driver.calls("open_camera"), 1);
    }

    #[test]
    fn test_open_failure_surfaces_device_open() {
        let driver = MockDriver::new();
        let handle = DeviceHandle::new("No Such Camera", "usb:000,000");
        let err = handle.with_lock(&driver, |_, _| Ok(())).unwrap_err();
        match err {
            GpError::DeviceOpen { model, status, .. } => {
                assert_eq!(model, "No Such Camera");
                assert_eq!(status, StatusCode::MODEL_NOT_FOUND);
            }
            other => panic!("expected DeviceOpen, got {:?}", other),
        }
        assert!(!handle.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let driver = MockDriver::new();
        let handle = DeviceHandle::new("Fujifilm X100", "usb:001,007");
        handle.with_lock(&driver, |_, _| Ok(())).unwrap();

        assert!(handle.close(&driver).is_ok());
        assert!(handle.close(&driver).is_ok());
        assert_eq!(driver.native_closes(), 1);
        assert!(!handle.is_open());
    }

    #[test]
    fn test_close_before_open_is_a_no_op() {
        let driver = MockDriver::new();
        let handle = DeviceHandle::new("Fujifilm X100", "usb:001,007");
        assert!(handle.close(&driver).is_ok());
        assert_eq!(driver.native_closes(), 0);
    }

    #[test]
    fn test_lock_released_after_failure() {
        let driver = MockDriver::new();
        let handle = DeviceHandle::new("Fujifilm X100", "usb:001,007");
        let err: GpResult<()> = handle.with_lock(&driver, |_, _| {
            Err(GpError::Io {
                operation: "capture_to_memory",
                status: StatusCode::IO,
            })
        });
        assert!(err.is_err());
        // A failed operation must not wedge the device
        handle.with_lock(&driver, |_, _| Ok(())).unwrap();
    }
}
