//! Scripted driver for testing without hardware.
//!
//! `MockDriver` stands in for the native protocol library: it serves a
//! configurable widget tree, canned capture payloads, optional per-call
//! delays, and per-primitive failure injection. Every native call is
//! journaled with enter/exit timestamps so tests can assert the bridge's
//! mutual-exclusion guarantees.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::driver::{
    CameraDescriptor, CameraDriver, NativeFile, NativeHandle, RawValue, RawWidget, RawWidgetKind,
    StatusCode,
};

/// One journaled native call
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub op: &'static str,
    pub start: Instant,
    pub end: Instant,
}

impl CallRecord {
    /// Whether two calls overlapped in time
    pub fn overlaps(&self, other: &CallRecord) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Default)]
struct MockState {
    next_handle: u64,
    next_file: u64,
    open_handles: HashSet<u64>,
    live_files: HashSet<u64>,
    freed_files: usize,
    native_closes: usize,
    commits: usize,
    journal: Vec<CallRecord>,
    fail_always: Vec<(&'static str, StatusCode)>,
    fail_once: Vec<(&'static str, StatusCode)>,
}

/// Mock camera-protocol driver
pub struct MockDriver {
    descriptors: Vec<CameraDescriptor>,
    picture: Vec<u8>,
    preview: Vec<u8>,
    capture_delay: Duration,
    tree: Mutex<RawWidget>,
    state: Mutex<MockState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Mock driver with a single attached camera and a representative tree
    pub fn new() -> Self {
        Self {
            descriptors: vec![CameraDescriptor {
                model: "Fujifilm X100".to_string(),
                port: "usb:001,007".to_string(),
            }],
            picture: b"JPEGDATA-full".to_vec(),
            preview: b"JPEGDATA-preview".to_vec(),
            capture_delay: Duration::ZERO,
            tree: Mutex::new(default_tree()),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Replace the scripted config tree
    pub fn with_tree(self, tree: RawWidget) -> Self {
        *self.tree.lock().unwrap() = tree;
        self
    }

    /// Replace the full-capture payload
    pub fn with_picture(mut self, bytes: &[u8]) -> Self {
        self.picture = bytes.to_vec();
        self
    }

    /// Replace the preview payload
    pub fn with_preview(mut self, bytes: &[u8]) -> Self {
        self.preview = bytes.to_vec();
        self
    }

    /// Sleep this long inside each capture primitive
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Fail every future call to `op` with `status`
    pub fn fail_with(&self, op: &'static str, status: StatusCode) {
        self.state.lock().unwrap().fail_always.push((op, status));
    }

    /// Fail only the next call to `op` with `status`
    pub fn fail_once(&self, op: &'static str, status: StatusCode) {
        self.state.lock().unwrap().fail_once.push((op, status));
    }

    /// Snapshot of the call journal
    pub fn journal(&self) -> Vec<CallRecord> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Number of journaled calls to `op`
    pub fn calls(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .journal
            .iter()
            .filter(|r| r.op == op)
            .count()
    }

    /// Native file objects allocated but not yet freed
    pub fn live_files(&self) -> usize {
        self.state.lock().unwrap().live_files.len()
    }

    /// Native file objects freed so far
    pub fn freed_files(&self) -> usize {
        self.state.lock().unwrap().freed_files
    }

    /// Native handles currently open
    pub fn open_handles(&self) -> usize {
        self.state.lock().unwrap().open_handles.len()
    }

    /// Native close calls performed so far
    pub fn native_closes(&self) -> usize {
        self.state.lock().unwrap().native_closes
    }

    /// Config commits performed so far
    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    fn injected_failure(&self, op: &'static str) -> Option<StatusCode> {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.fail_once.iter().position(|(o, _)| *o == op) {
            return Some(state.fail_once.remove(pos).1);
        }
        state
            .fail_always
            .iter()
            .find(|(o, _)| *o == op)
            .map(|(_, s)| *s)
    }

    /// Journal a call, applying injected failures and the capture delay
    fn record<T>(
        &self,
        op: &'static str,
        delay: Duration,
        body: impl FnOnce(&mut MockState) -> Result<T, StatusCode>,
    ) -> Result<T, StatusCode> {
        let start = Instant::now();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let result = match self.injected_failure(op) {
            Some(status) => Err(status),
            None => {
                let mut state = self.state.lock().unwrap();
                body(&mut state)
            }
        };
        let record = CallRecord {
            op,
            start,
            end: Instant::now(),
        };
        self.state.lock().unwrap().journal.push(record);
        result
    }
}

impl CameraDriver for MockDriver {
    fn detect(&self) -> Result<Vec<CameraDescriptor>, StatusCode> {
        self.record("detect", Duration::ZERO, |_| Ok(self.descriptors.clone()))
    }

    fn open_camera(&self, model: &str, _port: &str) -> Result<NativeHandle, StatusCode> {
        let known = self.descriptors.iter().any(|d| d.model == model);
        self.record("open_camera", Duration::ZERO, |state| {
            if !known {
                return Err(StatusCode::MODEL_NOT_FOUND);
            }
            state.next_handle += 1;
            let id = state.next_handle;
            state.open_handles.insert(id);
            Ok(NativeHandle(id))
        })
    }

    fn close_camera(&self, handle: NativeHandle) -> Result<(), StatusCode> {
        self.record("close_camera", Duration::ZERO, |state| {
            state.native_closes += 1;
            if state.open_handles.remove(&handle.0) {
                Ok(())
            } else {
                Err(StatusCode::BAD_PARAMETERS)
            }
        })
    }

    fn capture_to_memory(&self, handle: NativeHandle) -> Result<Vec<u8>, StatusCode> {
        self.record("capture_to_memory", self.capture_delay, |state| {
            if !state.open_handles.contains(&handle.0) {
                return Err(StatusCode::BAD_PARAMETERS);
            }
            Ok(self.picture.clone())
        })
    }

    fn new_file(&self) -> Result<NativeFile, StatusCode> {
        self.record("new_file", Duration::ZERO, |state| {
            state.next_file += 1;
            let id = state.next_file;
            state.live_files.insert(id);
            Ok(NativeFile(id))
        })
    }

    fn capture_preview(&self, handle: NativeHandle, file: NativeFile) -> Result<(), StatusCode> {
        self.record("capture_preview", self.capture_delay, |state| {
            if !state.open_handles.contains(&handle.0) || !state.live_files.contains(&file.0) {
                return Err(StatusCode::BAD_PARAMETERS);
            }
            Ok(())
        })
    }

    fn file_data(&self, file: NativeFile) -> Result<Vec<u8>, StatusCode> {
        self.record("file_data", Duration::ZERO, |state| {
            if !state.live_files.contains(&file.0) {
                return Err(StatusCode::BAD_PARAMETERS);
            }
            Ok(self.preview.clone())
        })
    }

    fn free_file(&self, file: NativeFile) {
        let _ = self.record("free_file", Duration::ZERO, |state| {
            if state.live_files.remove(&file.0) {
                state.freed_files += 1;
            }
            Ok(())
        });
    }

    fn get_config(&self, handle: NativeHandle) -> Result<RawWidget, StatusCode> {
        self.record("get_config", Duration::ZERO, |state| {
            if !state.open_handles.contains(&handle.0) {
                return Err(StatusCode::BAD_PARAMETERS);
            }
            Ok(self.tree.lock().unwrap().clone())
        })
    }

    fn set_widget_value(
        &self,
        handle: NativeHandle,
        key: &str,
        value: &RawValue,
    ) -> Result<(), StatusCode> {
        self.record("set_widget_value", Duration::ZERO, |state| {
            if !state.open_handles.contains(&handle.0) {
                return Err(StatusCode::BAD_PARAMETERS);
            }
            let mut tree = self.tree.lock().unwrap();
            match resolve_mut(&mut tree, key) {
                Some(widget) => {
                    widget.value = Some(value.clone());
                    Ok(())
                }
                None => Err(StatusCode::BAD_PARAMETERS),
            }
        })
    }

    fn commit_config(&self, handle: NativeHandle) -> Result<(), StatusCode> {
        self.record("commit_config", Duration::ZERO, |state| {
            if !state.open_handles.contains(&handle.0) {
                return Err(StatusCode::BAD_PARAMETERS);
            }
            state.commits += 1;
            Ok(())
        })
    }
}

fn resolve_mut<'a>(root: &'a mut RawWidget, key: &str) -> Option<&'a mut RawWidget> {
    let mut parts = key.split('/').filter(|p| !p.is_empty());
    if parts.next()? != root.name {
        return None;
    }
    let mut current = root;
    for part in parts {
        current = current.children.iter_mut().find(|c| c.name == part)?;
    }
    Some(current)
}

/// Representative gphoto2-style tree: /main with status and capturesettings
/// sections, one widget of each leaf kind in use.
pub fn default_tree() -> RawWidget {
    let mut model = RawWidget::new("model", RawWidgetKind::Text);
    model.value = Some(RawValue::Text("X100".to_string()));
    model.readonly = true;

    let mut battery = RawWidget::new("batterylevel", RawWidgetKind::Text);
    battery.value = Some(RawValue::Text("100%".to_string()));
    battery.readonly = true;

    let mut status = RawWidget::new("status", RawWidgetKind::Section);
    status.children = vec![model, battery];

    let mut iso = RawWidget::new("iso", RawWidgetKind::Radio);
    iso.choices = vec![
        "100".to_string(),
        "200".to_string(),
        "400".to_string(),
        "800".to_string(),
    ];
    iso.value = Some(RawValue::Text("200".to_string()));

    let mut f_number = RawWidget::new("f-number", RawWidgetKind::Range);
    f_number.range = Some((2.8, 22.0, 0.1));
    f_number.value = Some(RawValue::Float(5.6));

    let mut bulb = RawWidget::new("bulb", RawWidgetKind::Toggle);
    bulb.value = Some(RawValue::Toggle(false));

    let mut datetime = RawWidget::new("datetime", RawWidgetKind::Date);
    datetime.value = Some(RawValue::Int(1_262_304_000));

    let mut capture = RawWidget::new("capturesettings", RawWidgetKind::Section);
    capture.children = vec![iso, f_number, bulb, datetime];

    let mut root = RawWidget::new("main", RawWidgetKind::Window);
    root.children = vec![status, capture];
    root
}
