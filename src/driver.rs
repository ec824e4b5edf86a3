//! Native camera-protocol seam
//!
//! The vendor library (libgphoto2-style) is opaque to the bridge: blocking
//! primitives behind the [`CameraDriver`] trait, raw handles as newtypes, and
//! the vendor's widget tree mirrored into an owned [`RawWidget`] so nothing
//! above this seam touches native memory.
//!
//! Every trait method is blocking and must only be called from the worker
//! context while the owning [`DeviceHandle`](crate::device::DeviceHandle)
//! lock is held.

use std::fmt;

/// Raw vendor status code. Negative codes are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("native status {0}")]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0);
    /// Generic failure
    pub const GENERIC: StatusCode = StatusCode(-1);
    /// Bad parameters passed to the native call
    pub const BAD_PARAMETERS: StatusCode = StatusCode(-2);
    /// Transport-level I/O failure
    pub const IO: StatusCode = StatusCode(-7);
    /// Native-side timeout
    pub const TIMEOUT: StatusCode = StatusCode(-10);
    /// Model could not be resolved from the abilities list
    pub const MODEL_NOT_FOUND: StatusCode = StatusCode(-105);
    /// Device answered busy
    pub const CAMERA_BUSY: StatusCode = StatusCode(-110);

    /// Whether this status signals success
    pub fn is_ok(self) -> bool {
        self.0 >= 0
    }
}

/// Opaque native device handle, exclusively owned by a
/// [`DeviceHandle`](crate::device::DeviceHandle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u64);

/// Opaque native file object used as the intermediate buffer for previews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeFile(pub u64);

/// A camera resolved by the discovery collaborator (model + port pair)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDescriptor {
    pub model: String,
    pub port: String,
}

impl fmt::Display for CameraDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.model, self.port)
    }
}

/// Vendor widget kinds, as reported by the native config tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawWidgetKind {
    /// Top-level container
    Window,
    /// Nested container
    Section,
    Text,
    Range,
    Toggle,
    /// Exclusive choice list
    Radio,
    Menu,
    Button,
    Date,
}

impl RawWidgetKind {
    /// Container widgets group children and carry no scalar value
    pub fn is_container(self) -> bool {
        matches!(self, RawWidgetKind::Window | RawWidgetKind::Section)
    }

    /// Choice widgets expose an ordered list of allowed values
    pub fn has_choices(self) -> bool {
        matches!(self, RawWidgetKind::Radio | RawWidgetKind::Menu)
    }
}

/// A widget value in the vendor's native representation
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Int(i64),
    Float(f64),
    Toggle(bool),
}

/// One node of the vendor config tree, copied out of native memory.
///
/// The native tree itself is freed by the driver before `get_config`
/// returns; enumeration above this seam reads only this owned copy.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWidget {
    pub name: String,
    pub kind: RawWidgetKind,
    pub value: Option<RawValue>,
    /// Allowed values, populated only for choice kinds
    pub choices: Vec<String>,
    /// (min, max, step), populated only for Range widgets
    pub range: Option<(f64, f64, f64)>,
    pub readonly: bool,
    /// Children in native order
    pub children: Vec<RawWidget>,
}

impl RawWidget {
    /// Leaf widget with no value (Button-like)
    pub fn new(name: &str, kind: RawWidgetKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value: None,
            choices: Vec::new(),
            range: None,
            readonly: false,
            children: Vec::new(),
        }
    }
}

/// Blocking primitives of the native camera-protocol library.
///
/// Implementations wrap the real vendor library or a scripted stand-in
/// ([`MockDriver`](crate::mock::MockDriver)). All methods are called from the
/// dispatcher's worker context, never from the caller's task, and always
/// under the per-device lock.
pub trait CameraDriver: Send + Sync + 'static {
    /// Resolve attached cameras via the port-info and abilities lists
    fn detect(&self) -> Result<Vec<CameraDescriptor>, StatusCode>;

    /// Open a native handle for a model + port pair
    fn open_camera(&self, model: &str, port: &str) -> Result<NativeHandle, StatusCode>;

    /// Release a native handle
    fn close_camera(&self, handle: NativeHandle) -> Result<(), StatusCode>;

    /// Full capture straight into a byte buffer
    fn capture_to_memory(&self, handle: NativeHandle) -> Result<Vec<u8>, StatusCode>;

    /// Allocate the intermediate file object used by preview capture
    fn new_file(&self) -> Result<NativeFile, StatusCode>;

    /// Live-preview capture into a previously allocated file object
    fn capture_preview(&self, handle: NativeHandle, file: NativeFile) -> Result<(), StatusCode>;

    /// Copy the file object's contents out of native memory
    fn file_data(&self, file: NativeFile) -> Result<Vec<u8>, StatusCode>;

    /// Free the intermediate file object
    fn free_file(&self, file: NativeFile);

    /// Fetch the config tree; the native tree is freed before returning
    fn get_config(&self, handle: NativeHandle) -> Result<RawWidget, StatusCode>;

    /// Stage a value into the vendor tree for the widget at `key`
    fn set_widget_value(
        &self,
        handle: NativeHandle,
        key: &str,
        value: &RawValue,
    ) -> Result<(), StatusCode>;

    /// Commit staged config changes to the device
    fn commit_config(&self, handle: NativeHandle) -> Result<(), StatusCode>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_polarity() {
        assert!(StatusCode::OK.is_ok());
        assert!(StatusCode(3).is_ok());
        assert!(!StatusCode::GENERIC.is_ok());
        assert!(!StatusCode::CAMERA_BUSY.is_ok());
    }

    #[test]
    fn test_widget_kind_classification() {
        assert!(RawWidgetKind::Window.is_container());
        assert!(RawWidgetKind::Section.is_container());
        assert!(!RawWidgetKind::Text.is_container());

        assert!(RawWidgetKind::Radio.has_choices());
        assert!(RawWidgetKind::Menu.has_choices());
        assert!(!RawWidgetKind::Toggle.has_choices());
    }

    #[test]
    fn test_descriptor_display() {
        let desc = CameraDescriptor {
            model: "Canon EOS 550D".to_string(),
            port: "usb:002,004".to_string(),
        };
        assert_eq!(desc.to_string(), "Canon EOS 550D (usb:002,004)");
    }
}
