//! Typed attribute storage for scene graph nodes.
//!
//! Every node carries an ordered [`Attrs`] map: string key → [`AttrValue`].
//! Definition order is preserved (the serializer walks attributes in the
//! order the host declared them), so the map is an `IndexMap`.
//!
//! Element-valued attributes never own their target. They hold the target's
//! `Uuid` and are resolved through the owning [`Graph`](super::graph::Graph),
//! which lets hosts describe parent back-references and other cycles.
//!
//! Scene files describe attributes as `{"name", "type", "value"}` entries;
//! see [`Attrs`]'s `TryFrom<Vec<AttrEntry>>` impl.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Attribute type tag, as spelled on the wire and in scene files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKind {
    String,
    Bool,
    Int,
    Float,
    Color,
    Vector2,
    Vector3,
    Vector4,
    #[serde(rename = "qangle")]
    QAngle,
    Quaternion,
    Element,
    ElementArray,
    ColorArray,
    Vector2Array,
    Vector3Array,
    Vector4Array,
    #[serde(rename = "qangle_array")]
    QAngleArray,
    QuaternionArray,
    StringArray,
    BoolArray,
    IntArray,
    FloatArray,
    Binary,
    BinaryArray,
    Time,
    TimeArray,
    Matrix,
    MatrixArray,
}

impl AttrKind {
    pub fn as_str(&self) -> &'static str {
        use AttrKind::*;
        match self {
            String => "string",
            Bool => "bool",
            Int => "int",
            Float => "float",
            Color => "color",
            Vector2 => "vector2",
            Vector3 => "vector3",
            Vector4 => "vector4",
            QAngle => "qangle",
            Quaternion => "quaternion",
            Element => "element",
            ElementArray => "element_array",
            ColorArray => "color_array",
            Vector2Array => "vector2_array",
            Vector3Array => "vector3_array",
            Vector4Array => "vector4_array",
            QAngleArray => "qangle_array",
            QuaternionArray => "quaternion_array",
            StringArray => "string_array",
            BoolArray => "bool_array",
            IntArray => "int_array",
            FloatArray => "float_array",
            Binary => "binary",
            BinaryArray => "binary_array",
            Time => "time",
            TimeArray => "time_array",
            Matrix => "matrix",
            MatrixArray => "matrix_array",
        }
    }

    /// Kinds the serializer knows how to turn into document values.
    /// Binary, time and matrix (plus their arrays) are not.
    pub fn is_supported(&self) -> bool {
        !matches!(
            self,
            AttrKind::Binary
                | AttrKind::BinaryArray
                | AttrKind::Time
                | AttrKind::TimeArray
                | AttrKind::Matrix
                | AttrKind::MatrixArray
        )
    }
}

impl std::fmt::Display for AttrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

/// Euler angles in degrees (pitch, yaw, roll stored as x, y, z).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QAngle {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Vector4 {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl QAngle {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Quaternion {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

type Matrix4 = [[f32; 4]; 4];

/// Generic attribute value.
///
/// Array entries are `Option` because hosts hand out arrays with null slots;
/// the serializer compacts them away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    #[serde(rename = "string")]
    Str(String),
    Bool(bool),
    Int(i32),
    Float(f32),
    Color(Color),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
    #[serde(rename = "qangle")]
    QAngle(QAngle),
    Quaternion(Quaternion),
    Element(Option<Uuid>),
    ElementArray(Vec<Option<Uuid>>),
    ColorArray(Vec<Option<Color>>),
    Vector2Array(Vec<Option<Vector2>>),
    Vector3Array(Vec<Option<Vector3>>),
    Vector4Array(Vec<Option<Vector4>>),
    #[serde(rename = "qangle_array")]
    QAngleArray(Vec<Option<QAngle>>),
    QuaternionArray(Vec<Option<Quaternion>>),
    StringArray(Vec<Option<String>>),
    BoolArray(Vec<Option<bool>>),
    IntArray(Vec<Option<i32>>),
    FloatArray(Vec<Option<f32>>),
    Binary(Vec<u8>),
    BinaryArray(Vec<Vec<u8>>),
    /// Seconds.
    Time(f64),
    TimeArray(Vec<f64>),
    Matrix(Matrix4),
    MatrixArray(Vec<Matrix4>),
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        use AttrValue::*;
        match self {
            Str(_) => AttrKind::String,
            Bool(_) => AttrKind::Bool,
            Int(_) => AttrKind::Int,
            Float(_) => AttrKind::Float,
            Color(_) => AttrKind::Color,
            Vector2(_) => AttrKind::Vector2,
            Vector3(_) => AttrKind::Vector3,
            Vector4(_) => AttrKind::Vector4,
            QAngle(_) => AttrKind::QAngle,
            Quaternion(_) => AttrKind::Quaternion,
            Element(_) => AttrKind::Element,
            ElementArray(_) => AttrKind::ElementArray,
            ColorArray(_) => AttrKind::ColorArray,
            Vector2Array(_) => AttrKind::Vector2Array,
            Vector3Array(_) => AttrKind::Vector3Array,
            Vector4Array(_) => AttrKind::Vector4Array,
            QAngleArray(_) => AttrKind::QAngleArray,
            QuaternionArray(_) => AttrKind::QuaternionArray,
            StringArray(_) => AttrKind::StringArray,
            BoolArray(_) => AttrKind::BoolArray,
            IntArray(_) => AttrKind::IntArray,
            FloatArray(_) => AttrKind::FloatArray,
            Binary(_) => AttrKind::Binary,
            BinaryArray(_) => AttrKind::BinaryArray,
            Time(_) => AttrKind::Time,
            TimeArray(_) => AttrKind::TimeArray,
            Matrix(_) => AttrKind::Matrix,
            MatrixArray(_) => AttrKind::MatrixArray,
        }
    }

    /// Entry count for array kinds (null slots included), `None` for scalars.
    pub fn count(&self) -> Option<usize> {
        use AttrValue::*;
        match self {
            ElementArray(v) => Some(v.len()),
            ColorArray(v) => Some(v.len()),
            Vector2Array(v) => Some(v.len()),
            Vector3Array(v) => Some(v.len()),
            Vector4Array(v) => Some(v.len()),
            QAngleArray(v) => Some(v.len()),
            QuaternionArray(v) => Some(v.len()),
            StringArray(v) => Some(v.len()),
            BoolArray(v) => Some(v.len()),
            IntArray(v) => Some(v.len()),
            FloatArray(v) => Some(v.len()),
            BinaryArray(v) => Some(v.len()),
            TimeArray(v) => Some(v.len()),
            MatrixArray(v) => Some(v.len()),
            _ => None,
        }
    }
}

/// Attribute container: string key → typed value, in definition order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<AttrEntry>")]
pub struct Attrs {
    map: IndexMap<String, AttrValue>,
}

impl Attrs {
    pub fn new() -> Self {
        Self {
            map: IndexMap::new(),
        }
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn set(&mut self, key: impl Into<String>, value: AttrValue) {
        self.map.insert(key.into(), value);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.map.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.map.get(key) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        match self.map.get(key) {
            Some(AttrValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.map.get(key) {
            Some(AttrValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.map.get(key) {
            Some(AttrValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Target of an element attribute (`None` if missing, null or not an element)
    pub fn get_element(&self, key: &str) -> Option<Uuid> {
        match self.map.get(key) {
            Some(AttrValue::Element(id)) => *id,
            _ => None,
        }
    }

    /// Array length of an attribute, `None` for scalars and missing keys
    pub fn count(&self, key: &str) -> Option<usize> {
        self.map.get(key).and_then(AttrValue::count)
    }

    /// Remove attribute by key, preserving the order of the rest
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.map.shift_remove(key)
    }

    /// Iterate over all attributes (key, value) in definition order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.map.iter()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// One attribute as written in a scene file.
#[derive(Debug, Clone, Deserialize)]
pub struct AttrEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttrKind,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl TryFrom<Vec<AttrEntry>> for Attrs {
    type Error = String;

    fn try_from(entries: Vec<AttrEntry>) -> Result<Self, Self::Error> {
        let mut attrs = Attrs::new();
        for entry in entries {
            if attrs.contains(&entry.name) {
                return Err(format!("duplicate attribute '{}'", entry.name));
            }
            // Reuse the tagged representation so kind and payload are checked together.
            let value: AttrValue =
                serde_json::from_value(json!({ "type": entry.kind, "value": entry.value }))
                    .map_err(|e| format!("attribute '{}' ({}): {}", entry.name, entry.kind, e))?;
            attrs.set(entry.name, value);
        }
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_wire_spelling() {
        for kind in [
            AttrKind::QAngle,
            AttrKind::QAngleArray,
            AttrKind::Vector2Array,
            AttrKind::ElementArray,
            AttrKind::String,
            AttrKind::MatrixArray,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::from(kind.as_str()));
        }
    }

    #[test]
    fn test_value_kind_agrees_with_tag() {
        let value = AttrValue::QAngleArray(vec![Some(QAngle::new(1.0, 2.0, 3.0))]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "qangle_array");
        assert_eq!(value.kind(), AttrKind::QAngleArray);
        assert_eq!(value.count(), Some(1));
        assert_eq!(AttrValue::Int(3).count(), None);
    }

    #[test]
    fn test_unsupported_kinds() {
        assert!(!AttrKind::Binary.is_supported());
        assert!(!AttrKind::TimeArray.is_supported());
        assert!(!AttrKind::Matrix.is_supported());
        assert!(AttrKind::QuaternionArray.is_supported());
        assert!(AttrKind::Element.is_supported());
    }

    #[test]
    fn test_attrs_keep_definition_order() {
        let mut attrs = Attrs::new()
            .with("zeta", AttrValue::Int(1))
            .with("alpha", AttrValue::Bool(true))
            .with("mid", AttrValue::Str("m".into()));
        attrs.set("zeta", AttrValue::Int(2));

        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(attrs.get_i32("zeta"), Some(2));

        attrs.remove("alpha");
        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "mid"]);
    }

    #[test]
    fn test_typed_getters() {
        let child = Uuid::new_v4();
        let attrs = Attrs::new()
            .with("name", AttrValue::Str("shot1".into()))
            .with("fps", AttrValue::Float(24.0))
            .with("visible", AttrValue::Bool(false))
            .with("camera", AttrValue::Element(Some(child)))
            .with("sets", AttrValue::ElementArray(vec![None, Some(child)]));

        assert_eq!(attrs.get_str("name"), Some("shot1"));
        assert_eq!(attrs.get_float("fps"), Some(24.0));
        assert_eq!(attrs.get_bool("visible"), Some(false));
        assert_eq!(attrs.get_element("camera"), Some(child));
        assert_eq!(attrs.get_element("name"), None);
        assert_eq!(attrs.count("sets"), Some(2));
        assert_eq!(attrs.count("missing"), None);
        assert_eq!(attrs.get_i32("name"), None);
    }

    #[test]
    fn test_attrs_from_scene_entries() {
        let raw = r#"[
            {"name": "name", "type": "string", "value": "clip"},
            {"name": "tint", "type": "color", "value": {"r": 10, "g": 20, "b": 30, "a": 255}},
            {"name": "offsets", "type": "float_array", "value": [1.5, null, 2.5]},
            {"name": "parent", "type": "element", "value": null},
            {"name": "blob", "type": "binary", "value": [1, 2, 3]}
        ]"#;
        let attrs: Attrs = serde_json::from_str(raw).unwrap();

        assert_eq!(attrs.len(), 5);
        assert_eq!(attrs.get("tint"), Some(&AttrValue::Color(Color::new(10, 20, 30, 255))));
        assert_eq!(
            attrs.get("offsets"),
            Some(&AttrValue::FloatArray(vec![Some(1.5), None, Some(2.5)]))
        );
        assert_eq!(attrs.get("parent"), Some(&AttrValue::Element(None)));
        assert_eq!(attrs.get("blob").map(AttrValue::kind), Some(AttrKind::Binary));
    }

    #[test]
    fn test_attrs_reject_mismatched_payload() {
        let raw = r#"[{"name": "pos", "type": "vector3", "value": "not a vector"}]"#;
        let err = serde_json::from_str::<Attrs>(raw).unwrap_err();
        assert!(err.to_string().contains("pos"));
    }

    #[test]
    fn test_attrs_reject_duplicates() {
        let raw = r#"[
            {"name": "a", "type": "int", "value": 1},
            {"name": "a", "type": "int", "value": 2}
        ]"#;
        let err = serde_json::from_str::<Attrs>(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate attribute 'a'"));
    }
}
