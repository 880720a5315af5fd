//! Scene graph to document serializer.
//!
//! # Purpose
//!
//! Turns a node and everything reachable from it into a plain JSON object
//! (`Document`) that a receiver can consume without knowing the host's
//! object model.
//!
//! # Dispatch
//!
//! Each attribute is handled by kind, in definition order:
//!
//! | Kind                               | Output                                   |
//! |------------------------------------|------------------------------------------|
//! | denylisted name                    | nothing                                  |
//! | `element`                          | nested document (null → nothing)         |
//! | `color`                            | `{r, g, b, a}`                           |
//! | `vector2`                          | `{x, y}`                                 |
//! | `vector3`, `qangle`                | `{x, y, z}`                              |
//! | `vector4`, `quaternion`            | `{x, y, z, w}`                           |
//! | `element_array`                    | list of nested documents                 |
//! | geometric arrays                   | list of component objects                |
//! | `string/bool/int/float` arrays     | list of scalars                          |
//! | `string/bool/int/float`            | the value                                |
//! | `binary`, `time`, `matrix` (+arrays) | nothing                                |
//!
//! Null array slots are dropped (the list is compacted, no placeholders).
//! Empty arrays produce no key.
//!
//! # Cycles
//!
//! Two guards keep the walk finite:
//! - the [`Denylist`], checked by attribute name before anything else;
//! - the ids of the nodes on the current path. An element pointing at one of
//!   its own ancestors is skipped and logged at debug level.
//!
//! Element children of the flex controller root are never followed either:
//! they point back into the model.
//!
//! Nodes shared between siblings (not ancestors) are serialized at every
//! place they appear.
//!
//! Nesting is bounded by `max_depth` (element levels below the root). A
//! deeper graph fails with [`SerializeError::TooDeep`].
//!
//! # Non-finite floats
//!
//! JSON has no NaN or infinity. A `float` that is not finite, or a geometric
//! value with a non-finite component, is dropped like a null: no key for a
//! scalar, no entry in an array.

use log::{debug, trace};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entities::attrs::{AttrValue, Color, QAngle, Quaternion, Vector2, Vector3, Vector4};
use crate::entities::graph::NodeRef;
use crate::entities::keys::A_GLOBAL_FLEX_CONTROLLERS;

use super::denylist::Denylist;
use super::error::SerializeError;

/// Serialized node: attribute name → value, in attribute order.
pub type Document = Map<String, Value>;

/// Default element nesting limit
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Whether a value can be written as JSON without turning into `null`.
trait Finite {
    fn is_finite(&self) -> bool {
        true
    }
}

impl Finite for String {}
impl Finite for bool {}
impl Finite for i32 {}
impl Finite for Color {}

impl Finite for f32 {
    fn is_finite(&self) -> bool {
        f32::is_finite(*self)
    }
}

impl Finite for Vector2 {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Finite for Vector3 {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Finite for QAngle {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Finite for Vector4 {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Finite for Quaternion {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

/// Geometric value → component object.
trait Components: Finite {
    fn components(&self) -> Document;
}

fn object<const N: usize>(fields: [(&str, Value); N]) -> Document {
    fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

impl Components for Color {
    fn components(&self) -> Document {
        object([
            ("r", self.r.into()),
            ("g", self.g.into()),
            ("b", self.b.into()),
            ("a", self.a.into()),
        ])
    }
}

impl Components for Vector2 {
    fn components(&self) -> Document {
        object([("x", self.x.into()), ("y", self.y.into())])
    }
}

impl Components for Vector3 {
    fn components(&self) -> Document {
        object([("x", self.x.into()), ("y", self.y.into()), ("z", self.z.into())])
    }
}

impl Components for QAngle {
    fn components(&self) -> Document {
        object([("x", self.x.into()), ("y", self.y.into()), ("z", self.z.into())])
    }
}

impl Components for Vector4 {
    fn components(&self) -> Document {
        object([
            ("x", self.x.into()),
            ("y", self.y.into()),
            ("z", self.z.into()),
            ("w", self.w.into()),
        ])
    }
}

impl Components for Quaternion {
    fn components(&self) -> Document {
        object([
            ("x", self.x.into()),
            ("y", self.y.into()),
            ("z", self.z.into()),
            ("w", self.w.into()),
        ])
    }
}

fn component_list<T: Components>(items: &[Option<T>]) -> Value {
    Value::Array(
        items
            .iter()
            .flatten()
            .filter(|c| c.is_finite())
            .map(|c| Value::Object(c.components()))
            .collect(),
    )
}

fn scalar_list<T: Finite + Clone + Into<Value>>(items: &[Option<T>]) -> Value {
    Value::Array(
        items
            .iter()
            .flatten()
            .filter(|v| v.is_finite())
            .cloned()
            .map(Into::into)
            .collect(),
    )
}

/// Graph → document converter.
#[derive(Debug, Clone)]
pub struct GraphSerializer {
    denylist: Denylist,
    flex_root: String,
    max_depth: usize,
}

impl Default for GraphSerializer {
    fn default() -> Self {
        Self::new(Denylist::default())
    }
}

impl GraphSerializer {
    pub fn new(denylist: Denylist) -> Self {
        Self {
            denylist,
            flex_root: A_GLOBAL_FLEX_CONTROLLERS.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the element nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Override the flex controller root attribute name.
    pub fn with_flex_root(mut self, name: impl Into<String>) -> Self {
        self.flex_root = name.into();
        self
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    pub fn flex_root(&self) -> &str {
        &self.flex_root
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Serialize `node` and everything reachable from it.
    ///
    /// `parent` is the name of the attribute `node` was reached through
    /// (`None` for a root).
    pub fn serialize(&self, node: NodeRef<'_>, parent: Option<&str>) -> Result<Document, SerializeError> {
        let mut path = Vec::new();
        self.serialize_node(node, parent, &mut path)
    }

    /// Handle one attribute of `owner`, writing into `out`.
    ///
    /// Returns whether the attribute was handled. `false` means nothing was
    /// written: the name is denylisted, the kind is unsupported, or the
    /// element sits under the flex controller root.
    pub fn parse_attribute(
        &self,
        name: &str,
        value: &AttrValue,
        out: &mut Document,
        owner: NodeRef<'_>,
        parent: Option<&str>,
    ) -> Result<bool, SerializeError> {
        let mut path = vec![owner.uuid()];
        self.parse(name, value, out, owner, parent, &mut path)
    }

    fn serialize_node(
        &self,
        node: NodeRef<'_>,
        parent: Option<&str>,
        path: &mut Vec<Uuid>,
    ) -> Result<Document, SerializeError> {
        path.push(node.uuid());
        let mut doc = Document::new();
        let result = node
            .attrs()
            .iter()
            .try_for_each(|(name, value)| self.parse(name, value, &mut doc, node, parent, path).map(drop));
        path.pop();
        result.map(|()| doc)
    }

    fn parse(
        &self,
        name: &str,
        value: &AttrValue,
        out: &mut Document,
        owner: NodeRef<'_>,
        parent: Option<&str>,
        path: &mut Vec<Uuid>,
    ) -> Result<bool, SerializeError> {
        if self.denylist.contains(name) {
            trace!("Skipping denylisted attribute '{}'", name);
            return Ok(false);
        }

        let parsed = match value {
            AttrValue::Element(target) => {
                if parent == Some(self.flex_root.as_str()) {
                    return Ok(false);
                }
                let Some(target) = target else {
                    return Ok(true);
                };
                match self.follow(owner, name, *target, path)? {
                    Some(child) => Value::Object(self.serialize_node(child, Some(name), path)?),
                    None => return Ok(true),
                }
            }

            // Dropped like nulls, JSON cannot carry them
            AttrValue::Float(f) if !f.is_finite() => return Ok(non_finite(name)),
            AttrValue::Vector2(v) if !v.is_finite() => return Ok(non_finite(name)),
            AttrValue::Vector3(v) if !v.is_finite() => return Ok(non_finite(name)),
            AttrValue::Vector4(v) if !v.is_finite() => return Ok(non_finite(name)),
            AttrValue::QAngle(v) if !v.is_finite() => return Ok(non_finite(name)),
            AttrValue::Quaternion(v) if !v.is_finite() => return Ok(non_finite(name)),

            AttrValue::Color(c) => Value::Object(c.components()),
            AttrValue::Vector2(v) => Value::Object(v.components()),
            AttrValue::Vector3(v) => Value::Object(v.components()),
            AttrValue::Vector4(v) => Value::Object(v.components()),
            AttrValue::QAngle(v) => Value::Object(v.components()),
            AttrValue::Quaternion(v) => Value::Object(v.components()),

            AttrValue::ElementArray(items) => {
                if items.is_empty() {
                    return Ok(true);
                }
                let mut list = Vec::with_capacity(items.len());
                for target in items.iter().flatten() {
                    if let Some(child) = self.follow(owner, name, *target, path)? {
                        list.push(Value::Object(self.serialize_node(child, Some(name), path)?));
                    }
                }
                Value::Array(list)
            }

            AttrValue::ColorArray(items) if !items.is_empty() => component_list(items),
            AttrValue::Vector2Array(items) if !items.is_empty() => component_list(items),
            AttrValue::Vector3Array(items) if !items.is_empty() => component_list(items),
            AttrValue::Vector4Array(items) if !items.is_empty() => component_list(items),
            AttrValue::QAngleArray(items) if !items.is_empty() => component_list(items),
            AttrValue::QuaternionArray(items) if !items.is_empty() => component_list(items),

            AttrValue::StringArray(items) if !items.is_empty() => scalar_list(items),
            AttrValue::BoolArray(items) if !items.is_empty() => scalar_list(items),
            AttrValue::IntArray(items) if !items.is_empty() => scalar_list(items),
            AttrValue::FloatArray(items) if !items.is_empty() => scalar_list(items),

            // Empty arrays: handled, no key
            AttrValue::ColorArray(_)
            | AttrValue::Vector2Array(_)
            | AttrValue::Vector3Array(_)
            | AttrValue::Vector4Array(_)
            | AttrValue::QAngleArray(_)
            | AttrValue::QuaternionArray(_)
            | AttrValue::StringArray(_)
            | AttrValue::BoolArray(_)
            | AttrValue::IntArray(_)
            | AttrValue::FloatArray(_) => return Ok(true),

            AttrValue::Str(s) => Value::from(s.as_str()),
            AttrValue::Bool(b) => Value::from(*b),
            AttrValue::Int(i) => Value::from(*i),
            AttrValue::Float(f) => Value::from(*f),

            AttrValue::Binary(_)
            | AttrValue::BinaryArray(_)
            | AttrValue::Time(_)
            | AttrValue::TimeArray(_)
            | AttrValue::Matrix(_)
            | AttrValue::MatrixArray(_) => {
                trace!("Unsupported attribute '{}' ({})", name, value.kind());
                return Ok(false);
            }
        };

        out.insert(name.to_string(), parsed);
        Ok(true)
    }

    /// Resolve an element target. `None` when following it would re-enter
    /// the current path.
    fn follow<'g>(
        &self,
        owner: NodeRef<'g>,
        name: &str,
        target: Uuid,
        path: &[Uuid],
    ) -> Result<Option<NodeRef<'g>>, SerializeError> {
        let child = owner.resolve(target).ok_or_else(|| SerializeError::MalformedGraph {
            attribute: name.to_string(),
            owner: owner.uuid(),
            target,
        })?;
        if path.contains(&target) {
            debug!(
                "Attribute '{}' of {} points at ancestor {}, not following",
                name,
                owner.uuid(),
                target
            );
            return Ok(None);
        }
        // The child would sit at depth path.len() below the root
        if path.len() > self.max_depth {
            return Err(SerializeError::TooDeep {
                attribute: name.to_string(),
                owner: owner.uuid(),
                max_depth: self.max_depth,
            });
        }
        Ok(Some(child))
    }
}

fn non_finite(name: &str) -> bool {
    debug!("Attribute '{}' is not finite, omitted", name);
    true
}
