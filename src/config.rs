//! Configuration tree enumeration and value marshalling
//!
//! Turns the vendor's hierarchical widget tree into a caller-consumable
//! typed tree, and converts caller-supplied values into the native
//! representation expected by the target widget.
//!
//! The enumerator is a plain recursive transform over the owned
//! [`RawWidget`] copy; it needs no device lock and the output tree is
//! rebuilt from scratch on every fetch.

use serde::{Deserialize, Serialize};

use crate::driver::{RawValue, RawWidget, RawWidgetKind};
use crate::error::{GpError, GpResult};

/// Widget kinds surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetKind {
    Window,
    Section,
    Text,
    Range,
    Toggle,
    Radio,
    Menu,
    Button,
    Date,
}

impl From<RawWidgetKind> for WidgetKind {
    fn from(kind: RawWidgetKind) -> Self {
        match kind {
            RawWidgetKind::Window => WidgetKind::Window,
            RawWidgetKind::Section => WidgetKind::Section,
            RawWidgetKind::Text => WidgetKind::Text,
            RawWidgetKind::Range => WidgetKind::Range,
            RawWidgetKind::Toggle => WidgetKind::Toggle,
            RawWidgetKind::Radio => WidgetKind::Radio,
            RawWidgetKind::Menu => WidgetKind::Menu,
            RawWidgetKind::Button => WidgetKind::Button,
            RawWidgetKind::Date => WidgetKind::Date,
        }
    }
}

/// A typed scalar read from a leaf widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Toggle(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&RawValue> for ConfigValue {
    fn from(value: &RawValue) -> Self {
        match value {
            RawValue::Text(s) => ConfigValue::Text(s.clone()),
            RawValue::Int(i) => ConfigValue::Int(*i),
            RawValue::Float(x) => ConfigValue::Float(*x),
            RawValue::Toggle(b) => ConfigValue::Toggle(*b),
        }
    }
}

/// One node of the caller-facing config tree.
///
/// Containers carry `children: Some(..)` (possibly empty) and no scalar
/// value; leaves carry `children: None`, so a serialized leaf has no
/// `children` field at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub name: String,
    pub kind: WidgetKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ConfigValue>,
    /// Allowed values, present only for choice kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    pub readonly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ConfigNode>>,
}

impl ConfigNode {
    /// Find a direct child by name
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children
            .as_ref()
            .and_then(|c| c.iter().find(|n| n.name == name))
    }

    /// Resolve a slash-delimited path below this node, the root's own name
    /// being the first component (`/main/status/model`)
    pub fn lookup(&self, key: &str) -> Option<&ConfigNode> {
        let mut parts = key.split('/').filter(|p| !p.is_empty());
        if parts.next()? != self.name {
            return None;
        }
        let mut current = self;
        for part in parts {
            current = current.child(part)?;
        }
        Some(current)
    }
}

/// Depth-first pre-order transform of the vendor tree, preserving native
/// child order
pub fn enumerate(raw: &RawWidget) -> ConfigNode {
    let kind = WidgetKind::from(raw.kind);
    if raw.kind.is_container() {
        ConfigNode {
            name: raw.name.clone(),
            kind,
            value: None,
            choices: None,
            readonly: raw.readonly,
            children: Some(raw.children.iter().map(enumerate).collect()),
        }
    } else {
        ConfigNode {
            name: raw.name.clone(),
            kind,
            value: raw.value.as_ref().map(ConfigValue::from),
            choices: raw
                .kind
                .has_choices()
                .then(|| raw.choices.clone()),
            readonly: raw.readonly,
            children: None,
        }
    }
}

/// Resolve a slash-delimited key against the vendor tree
pub fn resolve<'a>(root: &'a RawWidget, key: &str) -> Option<&'a RawWidget> {
    let mut parts = key.split('/').filter(|p| !p.is_empty());
    if parts.next()? != root.name {
        return None;
    }
    let mut current = root;
    for part in parts {
        current = current.children.iter().find(|c| c.name == part)?;
    }
    Some(current)
}

/// A caller-supplied config value; the variant selects the marshalling
/// branch. No other input types exist at the API surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Text(String),
    Int(i32),
    Float(f64),
}

impl SetValue {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            SetValue::Text(_) => "string",
            SetValue::Int(_) => "integer",
            SetValue::Float(_) => "float",
        }
    }
}

impl From<&str> for SetValue {
    fn from(s: &str) -> Self {
        SetValue::Text(s.to_string())
    }
}

impl From<String> for SetValue {
    fn from(s: String) -> Self {
        SetValue::Text(s)
    }
}

impl From<i32> for SetValue {
    fn from(i: i32) -> Self {
        SetValue::Int(i)
    }
}

impl From<f64> for SetValue {
    fn from(x: f64) -> Self {
        SetValue::Float(x)
    }
}

/// Validate call arguments before any task is scheduled
pub(crate) fn validate_key(key: &str, value: &SetValue) -> GpResult<()> {
    if key.is_empty() {
        return Err(GpError::Usage("config key must not be empty".to_string()));
    }
    if !key.starts_with('/') {
        return Err(GpError::Usage(format!(
            "config key must be an absolute slash-delimited path, got '{}'",
            key
        )));
    }
    if key.split('/').all(|p| p.is_empty()) {
        return Err(GpError::Usage(format!(
            "config key has no components: '{}'",
            key
        )));
    }
    if let SetValue::Float(x) = value {
        if !x.is_finite() {
            return Err(GpError::Usage(format!(
                "config value must be finite, got {}",
                x
            )));
        }
    }
    Ok(())
}

/// Convert a typed caller value into the widget's native representation.
///
/// String passthrough for text and choice kinds (choice kinds validate
/// membership), integer mapped to the choice/range/toggle/date
/// representations, float mapped to the range representation. Everything
/// else is a type mismatch.
pub(crate) fn marshal(key: &str, widget: &RawWidget, value: SetValue) -> GpResult<RawValue> {
    let mismatch = |supplied: &'static str| GpError::TypeMismatch {
        key: key.to_string(),
        kind: WidgetKind::from(widget.kind),
        supplied,
    };
    let supplied = value.type_name();
    match value {
        SetValue::Text(s) => match widget.kind {
            RawWidgetKind::Text => Ok(RawValue::Text(s)),
            RawWidgetKind::Radio | RawWidgetKind::Menu => {
                if widget.choices.iter().any(|c| *c == s) {
                    Ok(RawValue::Text(s))
                } else {
                    Err(mismatch("unlisted choice"))
                }
            }
            _ => Err(mismatch(supplied)),
        },
        SetValue::Int(i) => match widget.kind {
            RawWidgetKind::Toggle => Ok(RawValue::Toggle(i != 0)),
            RawWidgetKind::Range => {
                let x = f64::from(i);
                if in_range(widget, x) {
                    Ok(RawValue::Float(x))
                } else {
                    Err(mismatch("out-of-range integer"))
                }
            }
            RawWidgetKind::Radio | RawWidgetKind::Menu => widget
                .choices
                .get(usize::try_from(i).map_err(|_| mismatch("negative choice index"))?)
                .map(|c| RawValue::Text(c.clone()))
                .ok_or_else(|| mismatch("out-of-range choice index")),
            RawWidgetKind::Date => Ok(RawValue::Int(i64::from(i))),
            _ => Err(mismatch(supplied)),
        },
        SetValue::Float(x) => match widget.kind {
            RawWidgetKind::Range => {
                if in_range(widget, x) {
                    Ok(RawValue::Float(x))
                } else {
                    Err(mismatch("out-of-range float"))
                }
            }
            _ => Err(mismatch(supplied)),
        },
    }
}

fn in_range(widget: &RawWidget, x: f64) -> bool {
    match widget.range {
        Some((min, max, _)) => x >= min && x <= max,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::default_tree;

    #[test]
    fn test_enumerate_leaf_shape() {
        let tree = default_tree();
        let node = enumerate(&tree);
        let model = node.lookup("/main/status/model").unwrap();
        assert_eq!(model.name, "model");
        assert_eq!(model.kind, WidgetKind::Text);
        assert_eq!(model.value, Some(ConfigValue::Text("X100".to_string())));
        assert!(model.children.is_none());
    }

    #[test]
    fn test_enumerate_container_preserves_order() {
        let node = enumerate(&default_tree());
        let status = node.lookup("/main/status").unwrap();
        let children = status.children.as_ref().unwrap();
        assert_eq!(children[0].name, "model");
        assert_eq!(children[1].name, "batterylevel");
        assert!(status.value.is_none());
    }

    #[test]
    fn test_empty_container_keeps_children_field() {
        let raw = RawWidget::new("other", RawWidgetKind::Section);
        let node = enumerate(&raw);
        assert_eq!(node.children, Some(Vec::new()));
    }

    #[test]
    fn test_serialized_leaf_has_no_children_field() {
        let node = enumerate(&default_tree());
        let model = node.lookup("/main/status/model").unwrap();
        let json = serde_json::to_value(model).unwrap();
        assert_eq!(json["name"], "model");
        assert_eq!(json["value"], "X100");
        assert!(json.get("children").is_none());

        let status = node.lookup("/main/status").unwrap();
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["children"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_choices_surfaced_for_choice_kinds_only() {
        let node = enumerate(&default_tree());
        let iso = node.lookup("/main/capturesettings/iso").unwrap();
        assert_eq!(
            iso.choices.as_deref(),
            Some(&["100", "200", "400", "800"].map(String::from)[..])
        );
        let model = node.lookup("/main/status/model").unwrap();
        assert!(model.choices.is_none());
    }

    #[test]
    fn test_resolve_paths() {
        let tree = default_tree();
        assert!(resolve(&tree, "/main").is_some());
        assert_eq!(
            resolve(&tree, "/main/capturesettings/f-number").unwrap().name,
            "f-number"
        );
        assert!(resolve(&tree, "/main/missing").is_none());
        assert!(resolve(&tree, "/other/status").is_none());
    }

    #[test]
    fn test_marshal_string_passthrough() {
        let tree = default_tree();
        let iso = resolve(&tree, "/main/capturesettings/iso").unwrap();
        let raw = marshal("/main/capturesettings/iso", iso, SetValue::Text("400".into())).unwrap();
        assert_eq!(raw, RawValue::Text("400".to_string()));

        let err =
            marshal("/main/capturesettings/iso", iso, SetValue::Text("gold200".into())).unwrap_err();
        assert!(matches!(err, GpError::TypeMismatch { .. }));
    }

    #[test]
    fn test_marshal_int_branches() {
        let tree = default_tree();
        let iso = resolve(&tree, "/main/capturesettings/iso").unwrap();
        // Choice index maps to the choice string
        assert_eq!(
            marshal("k", iso, SetValue::Int(2)).unwrap(),
            RawValue::Text("400".to_string())
        );
        assert!(marshal("k", iso, SetValue::Int(9)).is_err());
        assert!(marshal("k", iso, SetValue::Int(-1)).is_err());

        let bulb = resolve(&tree, "/main/capturesettings/bulb").unwrap();
        assert_eq!(marshal("k", bulb, SetValue::Int(1)).unwrap(), RawValue::Toggle(true));
        assert_eq!(marshal("k", bulb, SetValue::Int(0)).unwrap(), RawValue::Toggle(false));

        let f_number = resolve(&tree, "/main/capturesettings/f-number").unwrap();
        assert_eq!(marshal("k", f_number, SetValue::Int(8)).unwrap(), RawValue::Float(8.0));
        assert!(marshal("k", f_number, SetValue::Int(64)).is_err());
    }

    #[test]
    fn test_marshal_float_requires_range() {
        let tree = default_tree();
        let f_number = resolve(&tree, "/main/capturesettings/f-number").unwrap();
        assert_eq!(
            marshal("k", f_number, SetValue::Float(5.6)).unwrap(),
            RawValue::Float(5.6)
        );
        assert!(marshal("k", f_number, SetValue::Float(100.0)).is_err());

        let model = resolve(&tree, "/main/status/model").unwrap();
        assert!(marshal("k", model, SetValue::Float(1.0)).is_err());
    }

    #[test]
    fn test_validate_key_usage_errors() {
        let v = SetValue::Int(1);
        assert!(validate_key("/main/status/model", &v).is_ok());
        assert!(validate_key("", &v).is_err());
        assert!(validate_key("main/status", &v).is_err());
        assert!(validate_key("///", &v).is_err());
        assert!(validate_key("/main", &SetValue::Float(f64::NAN)).is_err());
    }
}
